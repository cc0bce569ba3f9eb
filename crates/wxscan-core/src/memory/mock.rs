//! Synthetic process memory for tests.

use crate::error::{Error, Result};
use crate::memory::ReadMemory;

/// In-memory [`ReadMemory`] implementation built from explicit segments.
/// Reads that touch any byte outside a segment fail, which models the
/// unreadable gaps of a real virtual memory map.
#[derive(Debug, Default)]
pub struct MockMemoryReader {
    segments: Vec<(u64, Vec<u8>)>,
}

impl MockMemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a readable segment starting at `base`.
    pub fn with_segment(mut self, base: u64, data: Vec<u8>) -> Self {
        self.segments.push((base, data));
        self
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_into(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        for (base, data) in &self.segments {
            let end = base + data.len() as u64;
            if address >= *base && address + buf.len() as u64 <= end {
                let offset = (address - base) as usize;
                buf.copy_from_slice(&data[offset..offset + buf.len()]);
                return Ok(());
            }
        }

        Err(Error::MemoryReadFailed {
            address,
            message: "unmapped".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_within_segment() {
        let reader = MockMemoryReader::new().with_segment(0x1000, vec![1, 2, 3, 4]);
        assert_eq!(reader.read_bytes(0x1001, 2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_read_outside_segment_fails() {
        let reader = MockMemoryReader::new().with_segment(0x1000, vec![1, 2, 3, 4]);
        assert!(reader.read_bytes(0x1003, 2).is_err());
        assert!(reader.read_bytes(0x2000, 1).is_err());
    }
}
