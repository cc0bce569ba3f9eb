//! Base-relative offset derivation from scan results.

use crate::key::KeyAddress;

/// Absolute match addresses per pattern, in scan order (ascending).
#[derive(Debug, Clone, Default)]
pub struct ScanMatches {
    pub mobile: Vec<u64>,
    pub name: Vec<u64>,
    pub account: Vec<u64>,
}

impl ScanMatches {
    pub fn is_empty(&self) -> bool {
        self.mobile.is_empty() && self.name.is_empty() && self.account.is_empty()
    }
}

/// Offset of an absolute address relative to the module base.
///
/// Exact inverse of adding the base: `relative_offset(base + k, base) == k`.
pub fn relative_offset(address: u64, base: u64) -> u64 {
    debug_assert!(address >= base);
    address - base
}

/// Base-relative offsets for one scanned module.
///
/// `None` means the pattern was not found (or, for account, found fewer
/// than twice); it is never conflated with a legitimate zero offset. The
/// zeros only appear in the persisted row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleOffsets {
    pub name: Option<u64>,
    pub account: Option<u64>,
    pub mobile: Option<u64>,
    pub key: Option<u64>,
}

impl ModuleOffsets {
    /// Derive offsets from match lists and the located key.
    ///
    /// Mobile and name take the first occurrence. Account takes the second:
    /// the first occurrence of the account string in memory belongs to a
    /// different field. The key offset is that of the pointer location, not
    /// of the key bytes themselves.
    pub fn from_scan(matches: &ScanMatches, key: Option<&KeyAddress>, base: u64) -> Self {
        Self {
            name: matches.name.first().map(|a| relative_offset(*a, base)),
            account: matches.account.get(1).map(|a| relative_offset(*a, base)),
            mobile: matches.mobile.first().map(|a| relative_offset(*a, base)),
            key: key.map(|k| relative_offset(k.pointer, base)),
        }
    }

    /// True when every pattern and the key resolved to an offset.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.account.is_some() && self.mobile.is_some() && self.key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_offset_inverts_base_addition() {
        let base = 0x7FF6_1000_0000u64;
        for k in [0u64, 1, 0x10, 0xFFFF, 0xFFFF_FFFF] {
            assert_eq!(relative_offset(base + k, base), k);
        }
    }

    #[test]
    fn test_first_occurrence_for_mobile_and_name() {
        let matches = ScanMatches {
            mobile: vec![0x1010, 0x1080],
            name: vec![0x1030],
            account: vec![0x1060, 0x1090, 0x10A0],
        };

        let offsets = ModuleOffsets::from_scan(&matches, None, 0x1000);
        assert_eq!(offsets.mobile, Some(0x10));
        assert_eq!(offsets.name, Some(0x30));
    }

    #[test]
    fn test_account_uses_second_occurrence() {
        let two = ScanMatches {
            account: vec![0x1060, 0x1090],
            ..Default::default()
        };
        assert_eq!(
            ModuleOffsets::from_scan(&two, None, 0x1000).account,
            Some(0x90)
        );

        let one = ScanMatches {
            account: vec![0x1060],
            ..Default::default()
        };
        assert_eq!(ModuleOffsets::from_scan(&one, None, 0x1000).account, None);

        let none = ScanMatches::default();
        assert_eq!(ModuleOffsets::from_scan(&none, None, 0x1000).account, None);
    }

    #[test]
    fn test_key_offset_is_pointer_location() {
        let key = KeyAddress {
            key_bytes: 0x1020,
            pointer: 0x1050,
        };
        let offsets = ModuleOffsets::from_scan(&ScanMatches::default(), Some(&key), 0x1000);
        assert_eq!(offsets.key, Some(0x50));
        assert!(!offsets.is_complete());
    }

    #[test]
    fn test_missing_patterns_stay_none() {
        let offsets = ModuleOffsets::from_scan(&ScanMatches::default(), None, 0x1000);
        assert_eq!(offsets, ModuleOffsets::default());
    }
}
