//! Persisted version-keyed offset table.
//!
//! The on-disk format is a JSON object mapping a dotted file-version string
//! to a 5-element offset row, so offsets for multiple application builds
//! coexist in one file. Later runs merge into the existing table instead of
//! replacing it (plain read-modify-write, not crash-safe).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ModuleOffsets;
use crate::error::Result;

/// Index of each field inside a persisted row. Slot 3 is reserved and
/// always zero.
pub const ROW_NAME: usize = 0;
pub const ROW_ACCOUNT: usize = 1;
pub const ROW_MOBILE: usize = 2;
pub const ROW_RESERVED: usize = 3;
pub const ROW_KEY: usize = 4;

/// One persisted row: `[name, account, mobile, 0, key]`.
///
/// A zero here can mean either "offset is zero" or "not found"; only the
/// in-memory [`ModuleOffsets`] and scan matches can tell those apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OffsetRow(pub [u64; 5]);

impl OffsetRow {
    pub fn name(&self) -> u64 {
        self.0[ROW_NAME]
    }

    pub fn account(&self) -> u64 {
        self.0[ROW_ACCOUNT]
    }

    pub fn mobile(&self) -> u64 {
        self.0[ROW_MOBILE]
    }

    pub fn key(&self) -> u64 {
        self.0[ROW_KEY]
    }
}

impl From<&ModuleOffsets> for OffsetRow {
    fn from(offsets: &ModuleOffsets) -> Self {
        OffsetRow([
            offsets.name.unwrap_or(0),
            offsets.account.unwrap_or(0),
            offsets.mobile.unwrap_or(0),
            0,
            offsets.key.unwrap_or(0),
        ])
    }
}

/// Version-keyed offset table, merged on disk across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OffsetTable {
    entries: BTreeMap<String, OffsetRow>,
}

impl OffsetTable {
    /// Load the table from `path`. A missing file is an empty table, not an
    /// error; a malformed file is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Offset table {} not found, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let table: OffsetTable = serde_json::from_str(&content)?;
        debug!(
            "Loaded offset table from {} ({} version(s))",
            path.display(),
            table.entries.len()
        );
        Ok(table)
    }

    /// Insert or replace the row for one version. Other versions' rows are
    /// untouched.
    pub fn insert(&mut self, version: impl Into<String>, row: OffsetRow) {
        self.entries.insert(version.into(), row);
    }

    pub fn get(&self, version: &str) -> Option<&OffsetRow> {
        self.entries.get(version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the full table back to `path` as pretty-printed JSON.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved offset table to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_row_from_offsets_fills_missing_with_zero() {
        let offsets = ModuleOffsets {
            name: Some(0x30),
            account: None,
            mobile: Some(0x10),
            key: Some(0x50),
        };

        let row = OffsetRow::from(&offsets);
        assert_eq!(row.0, [0x30, 0, 0x10, 0, 0x50]);
        assert_eq!(row.account(), 0);
        assert_eq!(row.key(), 0x50);
    }

    #[test]
    fn test_table_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        let mut table = OffsetTable::default();
        table.insert("3.9.12.17", OffsetRow([0x30, 0x90, 0x10, 0, 0x50]));
        table.save_to_path(&path).unwrap();

        let loaded = OffsetTable::load_from_path(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("3.9.12.17").unwrap().mobile(), 0x10);
    }

    #[test]
    fn test_table_merges_across_runs() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        let mut table = OffsetTable::default();
        table.insert("3.9.12.17", OffsetRow([1, 2, 3, 0, 4]));
        table.save_to_path(&path).unwrap();

        // Second run: load, add another version, write back.
        let mut table = OffsetTable::load_from_path(&path).unwrap();
        table.insert("3.9.12.51", OffsetRow([5, 6, 7, 0, 8]));
        table.save_to_path(&path).unwrap();

        let loaded = OffsetTable::load_from_path(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("3.9.12.17").unwrap().0, [1, 2, 3, 0, 4]);
        assert_eq!(loaded.get("3.9.12.51").unwrap().0, [5, 6, 7, 0, 8]);
    }

    #[test]
    fn test_missing_file_is_empty_table() {
        let table = OffsetTable::load_from_path("definitely-not-here.json").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_on_disk_shape_is_version_to_array() {
        let mut table = OffsetTable::default();
        table.insert("3.9.12.17", OffsetRow([0x30, 0x90, 0x10, 0, 0x50]));

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["3.9.12.17"][2], 0x10);
        assert_eq!(json["3.9.12.17"][3], 0);
    }
}
