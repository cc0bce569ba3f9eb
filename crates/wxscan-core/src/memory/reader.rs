use crate::error::Result;

/// Read access to a target process's address space.
///
/// The scanner and key locator are generic over this trait so they can be
/// exercised against synthetic memory in tests. The only real implementation
/// is [`ProcessMemoryReader`](super::ProcessMemoryReader) on Windows.
pub trait ReadMemory {
    /// Fill `buf` with the bytes at `address`.
    ///
    /// Implementations must either fill the whole buffer or fail; a short
    /// read is an error, never a silent partial success.
    fn read_into(&self, address: u64, buf: &mut [u8]) -> Result<()>;

    /// Read `len` bytes at `address` into a fresh buffer.
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(address, &mut buf)?;
        Ok(buf)
    }
}
