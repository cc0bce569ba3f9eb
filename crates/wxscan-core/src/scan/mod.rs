//! Chunked pattern scanning over a module's address span.

use memchr::memmem;
use tracing::{debug, trace};

use crate::memory::{ModuleSpan, ReadMemory};

/// Scanner that walks a [`ModuleSpan`] in chunk-size strides, reusing one
/// read buffer across strides.
///
/// Unreadable strides are expected (virtual memory maps contain many
/// unreadable gaps) and are skipped without surfacing an error. Matches
/// that straddle a stride boundary are not detected; strides are fixed-size
/// and non-overlapping. The final stride reads a full chunk even when it
/// extends past the span end.
pub struct PatternScanner<'a, R: ReadMemory> {
    reader: &'a R,
    buffer: Vec<u8>,
}

impl<'a, R: ReadMemory> PatternScanner<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Scan `[span.base, span.end)` for every pattern in a single pass.
    ///
    /// Returns one address list per pattern, in the order given, each in
    /// ascending address order. A pattern with no occurrences yields an
    /// empty list.
    pub fn scan_all(&mut self, span: &ModuleSpan, patterns: &[&[u8]]) -> Vec<Vec<u64>> {
        let mut matches: Vec<Vec<u64>> = vec![Vec::new(); patterns.len()];
        if span.chunk == 0 || span.is_empty() {
            debug!("Refusing to scan degenerate span {:x?}", span);
            return matches;
        }

        let finders: Vec<memmem::Finder> =
            patterns.iter().map(|p| memmem::Finder::new(p)).collect();

        self.buffer.resize(span.chunk, 0);
        let mut address = span.base;

        while address < span.end {
            if self.reader.read_into(address, &mut self.buffer).is_err() {
                trace!("Skipping unreadable stride at {:#x}", address);
                address += span.chunk as u64;
                continue;
            }

            for (finder, found) in finders.iter().zip(matches.iter_mut()) {
                // Containment check first; only enumerate occurrences when
                // the stride contains the pattern at all.
                if finder.find(&self.buffer).is_some() {
                    found.extend(finder.find_iter(&self.buffer).map(|pos| address + pos as u64));
                }
            }

            address += span.chunk as u64;
        }

        matches
    }

    /// Scan `[span.base, span.end)` and return the address of the first
    /// occurrence of `pattern`, or `None` if the span is exhausted first.
    pub fn scan_first(&mut self, span: &ModuleSpan, pattern: &[u8]) -> Option<u64> {
        if span.chunk == 0 || span.is_empty() {
            debug!("Refusing to scan degenerate span {:x?}", span);
            return None;
        }

        let finder = memmem::Finder::new(pattern);
        self.buffer.resize(span.chunk, 0);
        let mut address = span.base;

        while address < span.end {
            if self.reader.read_into(address, &mut self.buffer).is_ok()
                && let Some(pos) = finder.find(&self.buffer)
            {
                return Some(address + pos as u64);
            }

            address += span.chunk as u64;
        }

        None
    }
}
