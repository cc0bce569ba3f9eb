//! Memory map records and module span resolution.

use tracing::debug;

/// One mapped segment of the target process, as reported by the OS memory
/// map enumeration. Segments are not coalesced: a module that is mapped in
/// several pieces produces several records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    /// Start address of the segment.
    pub start: u64,
    /// Resident size of the segment in bytes.
    pub size: u64,
    /// Backing file path, empty for anonymous mappings.
    pub path: String,
}

impl MemoryRegion {
    pub fn new(start: u64, size: u64, path: impl Into<String>) -> Self {
        Self {
            start,
            size,
            path: path.into(),
        }
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Address range covering every region of one module, plus the read
/// granularity used to walk it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSpan {
    /// Start of the first matching region.
    pub base: u64,
    /// End of the highest matching region.
    pub end: u64,
    /// Stride for chunked reads; the resident size of the first matching
    /// region. Always non-zero for a resolved span.
    pub chunk: usize,
}

impl ModuleSpan {
    /// Resolve the span of all regions whose backing path contains
    /// `module_name`, in map order.
    ///
    /// The first matching region supplies the base address and chunk size;
    /// every matching region extends the end address. Returns `None` when no
    /// region matches, or when the first match has a zero resident size (a
    /// zero chunk would make the scan stride no progress).
    pub fn resolve(regions: &[MemoryRegion], module_name: &str) -> Option<ModuleSpan> {
        let mut span: Option<ModuleSpan> = None;

        for region in regions.iter().filter(|r| r.path.contains(module_name)) {
            match span.as_mut() {
                None => {
                    span = Some(ModuleSpan {
                        base: region.start,
                        end: region.end(),
                        chunk: region.size as usize,
                    });
                }
                Some(span) => span.end = span.end.max(region.end()),
            }
        }

        match span {
            Some(span) if span.chunk > 0 => {
                debug!(
                    "Resolved module '{}': base={:#x} end={:#x} chunk={:#x}",
                    module_name, span.base, span.end, span.chunk
                );
                Some(span)
            }
            Some(_) => {
                debug!("Module '{}' first region has zero size", module_name);
                None
            }
            None => None,
        }
    }

    /// Span enclosing every region whose backing path contains `token`,
    /// from the lowest start to the highest end, walked with the given
    /// chunk size.
    ///
    /// Returns `None` when no region matches or `chunk` is zero, so a
    /// missing module can never produce an inverted or zero-stride range.
    pub fn enclosing(regions: &[MemoryRegion], token: &str, chunk: usize) -> Option<ModuleSpan> {
        let mut base = u64::MAX;
        let mut end = 0u64;

        for region in regions.iter().filter(|r| r.path.contains(token)) {
            base = base.min(region.start);
            end = end.max(region.end());
        }

        (base < end && chunk > 0).then_some(ModuleSpan { base, end, chunk })
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.base)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
