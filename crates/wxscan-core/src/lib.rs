//! # wxscan-core
//!
//! Core library for the wxscan offset finder.
//!
//! This crate provides:
//! - Windows process and memory map enumeration
//! - Chunked pattern scanning over a module's address span
//! - Two-phase key pointer location
//! - Base-relative offset derivation and the persisted version-keyed table
//!
//! The scan pipeline is generic over [`ReadMemory`] so every stage can be
//! tested against synthetic memory; the Windows process backend is the only
//! real implementation.

pub mod error;
pub mod key;
pub mod memory;
pub mod offset;
pub mod recon;
pub mod scan;

#[cfg(target_os = "windows")]
pub mod version;

pub use error::{Error, Result};
pub use key::{KeyAddress, decode_key_hex, locate_key};
pub use memory::{MemoryRegion, ModuleSpan, ReadMemory};
pub use offset::{ModuleOffsets, OffsetRow, OffsetTable, ScanMatches, relative_offset};
pub use recon::{ModuleScanOutcome, ScanRequest, VersionReport, scan_module};
pub use scan::PatternScanner;

#[cfg(target_os = "windows")]
pub use memory::{ProcessHandle, ProcessInfo, ProcessMemoryReader, find_processes};
#[cfg(target_os = "windows")]
pub use version::file_version_string;
