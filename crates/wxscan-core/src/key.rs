//! Two-phase key location.
//!
//! The key is not stored at a stable offset itself; what is stable is the
//! location of a pointer to the key buffer inside the primary module's data.
//! Phase 1 finds the literal key bytes anywhere in the broader module span,
//! phase 2 finds the 8-byte little-endian encoding of that address inside
//! the primary module span. The phase 2 address is what yields a reusable
//! offset across runs.

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{ModuleSpan, ReadMemory};
use crate::scan::PatternScanner;

/// Resolved key locations, both absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAddress {
    /// Where the literal key bytes live (phase 1, broad span).
    pub key_bytes: u64,
    /// Where the pointer to the key bytes lives (phase 2, primary span).
    pub pointer: u64,
}

/// Decode a hex-encoded key string into raw bytes.
///
/// Rejected input is fatal before any scanning starts. Every character must
/// be an ASCII hex digit; `from_str_radix` alone would let sign characters
/// through.
pub fn decode_key_hex(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim();
    if hex.is_empty()
        || !hex.len().is_multiple_of(2)
        || !hex.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(Error::InvalidKeyHex(hex.to_string()));
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| Error::InvalidKeyHex(hex.to_string()))
        })
        .collect()
}

/// Locate the key pointer via the two-phase search.
///
/// Both spans are walked with the same chunk size. Either phase coming up
/// empty is an error; no stale or fabricated address is ever returned.
pub fn locate_key<R: ReadMemory>(
    reader: &R,
    broad: &ModuleSpan,
    primary: &ModuleSpan,
    key: &[u8],
) -> Result<KeyAddress> {
    let mut scanner = PatternScanner::new(reader);

    let key_bytes = scanner
        .scan_first(broad, key)
        .ok_or(Error::KeyNotFound)?;
    debug!("Key bytes found at {:#x}", key_bytes);

    let encoded = key_bytes.to_le_bytes();
    let pointer = scanner
        .scan_first(primary, &encoded)
        .ok_or(Error::KeyPointerNotFound)?;
    debug!("Key pointer found at {:#x}", pointer);

    Ok(KeyAddress { key_bytes, pointer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryReader;

    #[test]
    fn test_decode_key_hex() {
        assert_eq!(decode_key_hex("aabbcc").unwrap(), vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(decode_key_hex("AABBCC").unwrap(), vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(decode_key_hex(" 00ff ").unwrap(), vec![0x00, 0xFF]);
    }

    #[test]
    fn test_decode_key_hex_rejects_malformed_input() {
        assert!(decode_key_hex("").is_err());
        assert!(decode_key_hex("abc").is_err());
        assert!(decode_key_hex("zz").is_err());
        assert!(decode_key_hex("ａａ").is_err());
    }

    #[test]
    fn test_decode_key_hex_rejects_sign_characters() {
        // from_str_radix tolerates a leading sign per pair; the decoder
        // must not.
        assert!(decode_key_hex("+1aa").is_err());
        assert!(decode_key_hex("-1aa").is_err());
        assert!(decode_key_hex("aa+1").is_err());
    }

    #[test]
    fn test_locate_key_round_trip() {
        // Key bytes at 0x1020 in the broad span; the little-endian encoding
        // of that address stored at 0x1050 in the primary span.
        let key = [0xAA, 0xBB, 0xCC];
        let mut data = vec![0u8; 0x100];
        data[0x20..0x23].copy_from_slice(&key);
        data[0x50..0x58].copy_from_slice(&0x1020u64.to_le_bytes());

        let reader = MockMemoryReader::new().with_segment(0x1000, data);
        let primary = ModuleSpan {
            base: 0x1000,
            end: 0x1100,
            chunk: 0x100,
        };

        let found = locate_key(&reader, &primary, &primary, &key).unwrap();
        assert_eq!(found.key_bytes, 0x1020);
        assert_eq!(found.pointer, 0x1050);
    }

    #[test]
    fn test_locate_key_missing_key_bytes() {
        let reader = MockMemoryReader::new().with_segment(0x1000, vec![0u8; 0x100]);
        let span = ModuleSpan {
            base: 0x1000,
            end: 0x1100,
            chunk: 0x100,
        };

        let err = locate_key(&reader, &span, &span, &[0xAA, 0xBB]).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound));
    }

    #[test]
    fn test_locate_key_missing_pointer() {
        // Key bytes present, but no encoded address anywhere.
        let key = [0xAA, 0xBB, 0xCC];
        let mut data = vec![0u8; 0x100];
        data[0x20..0x23].copy_from_slice(&key);

        let reader = MockMemoryReader::new().with_segment(0x1000, data);
        let span = ModuleSpan {
            base: 0x1000,
            end: 0x1100,
            chunk: 0x100,
        };

        let err = locate_key(&reader, &span, &span, &key).unwrap_err();
        assert!(matches!(err, Error::KeyPointerNotFound));
    }
}
