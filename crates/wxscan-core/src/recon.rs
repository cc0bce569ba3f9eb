//! Per-process scan orchestration.
//!
//! One pass per matching process: resolve the module span, scan the three
//! account strings, locate the key pointer, derive base-relative offsets and
//! pair them with the executable's file-version string. All per-process
//! records are returned; the caller decides how to reduce them.

use tracing::warn;

use crate::error::{Error, Result};
use crate::key::{KeyAddress, locate_key};
use crate::memory::{MemoryRegion, ModuleSpan, ReadMemory};
use crate::offset::{ModuleOffsets, ScanMatches};
use crate::scan::PatternScanner;

/// Everything one scan needs: the target process/module names and the
/// values to look for. The key is already hex-decoded.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Substring matched against running process names.
    pub process_name: String,
    /// Substring matched against region backing paths for the primary span.
    pub module_name: String,
    /// Broader token for the key phase 1 span; matches more regions than
    /// `module_name`.
    pub module_token: String,
    pub mobile: String,
    pub name: String,
    pub account: String,
    pub key: Vec<u8>,
}

impl ScanRequest {
    /// Request with the WeChat defaults for process, module and token.
    pub fn new(
        mobile: impl Into<String>,
        name: impl Into<String>,
        account: impl Into<String>,
        key: Vec<u8>,
    ) -> Self {
        Self {
            process_name: "WeChat.exe".to_string(),
            module_name: "WeChatWin.dll".to_string(),
            module_token: "WeChat".to_string(),
            mobile: mobile.into(),
            name: name.into(),
            account: account.into(),
            key,
        }
    }

    pub fn with_process(mut self, process_name: impl Into<String>) -> Self {
        self.process_name = process_name.into();
        self
    }

    pub fn with_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = module_name.into();
        self
    }

    pub fn with_token(mut self, module_token: impl Into<String>) -> Self {
        self.module_token = module_token.into();
        self
    }
}

/// Result of scanning one process's module.
#[derive(Debug, Clone)]
pub struct ModuleScanOutcome {
    pub span: ModuleSpan,
    pub matches: ScanMatches,
    /// `None` when either key phase found nothing; the offsets then carry no
    /// key entry rather than a stale address.
    pub key: Option<KeyAddress>,
    pub offsets: ModuleOffsets,
}

/// One per-process record produced by [`run`].
#[derive(Debug, Clone)]
pub struct VersionReport {
    pub pid: u32,
    /// Dotted 4-component file version of the process executable.
    pub version: String,
    pub outcome: ModuleScanOutcome,
}

/// Scan one process's memory for all patterns and the key.
///
/// An unresolvable module span is fatal for this process. A missing key is
/// not: the scan result still carries the string matches, with the key
/// marked absent.
pub fn scan_module<R: ReadMemory>(
    reader: &R,
    regions: &[MemoryRegion],
    request: &ScanRequest,
) -> Result<ModuleScanOutcome> {
    let span = ModuleSpan::resolve(regions, &request.module_name)
        .ok_or_else(|| Error::ModuleNotFound(request.module_name.clone()))?;

    let mut scanner = PatternScanner::new(reader);
    let patterns: [&[u8]; 3] = [
        request.mobile.as_bytes(),
        request.name.as_bytes(),
        request.account.as_bytes(),
    ];
    let mut found = scanner.scan_all(&span, &patterns).into_iter();
    let matches = ScanMatches {
        mobile: found.next().unwrap_or_default(),
        name: found.next().unwrap_or_default(),
        account: found.next().unwrap_or_default(),
    };
    if matches.is_empty() {
        warn!(
            "No occurrences of any pattern in '{}' [{:#x}, {:#x})",
            request.module_name, span.base, span.end
        );
    }

    // Phase 1 walks the broader token span with the primary module's chunk.
    let key = match ModuleSpan::enclosing(regions, &request.module_token, span.chunk) {
        Some(broad) => match locate_key(reader, &broad, &span, &request.key) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Key location failed: {}", e);
                None
            }
        },
        None => {
            warn!("No regions match module token '{}'", request.module_token);
            None
        }
    };

    let offsets = ModuleOffsets::from_scan(&matches, key.as_ref(), span.base);

    Ok(ModuleScanOutcome {
        span,
        matches,
        key,
        offsets,
    })
}

/// Scan every running process matching the request and return one record
/// per process that scanned successfully.
///
/// A process that fails to open or scan is logged and skipped; the run as a
/// whole fails only when no matching process exists or none could be
/// scanned.
#[cfg(target_os = "windows")]
pub fn run(request: &ScanRequest) -> Result<Vec<VersionReport>> {
    use crate::memory::{ProcessHandle, ProcessMemoryReader, find_processes};
    use crate::version::file_version_string;
    use tracing::info;

    let processes = find_processes(&request.process_name)?;
    if processes.is_empty() {
        return Err(Error::ProcessNotFound(request.process_name.clone()));
    }

    let mut reports = Vec::new();
    let mut last_error = None;

    for process in processes {
        info!("Scanning process {} (pid {})", process.name, process.pid);

        let report = (|| -> Result<VersionReport> {
            // The handle closes on drop, so every error path releases it.
            let handle = ProcessHandle::open(process.pid)?;
            let version = file_version_string(&handle.exe_path()?)?;
            let regions = handle.memory_regions()?;
            let reader = ProcessMemoryReader::new(&handle);
            let outcome = scan_module(&reader, &regions, request)?;

            Ok(VersionReport {
                pid: process.pid,
                version,
                outcome,
            })
        })();

        match report {
            Ok(report) => reports.push(report),
            // Absent-value failures are routine across multiple matching
            // processes; only structural failures warrant a warning.
            Err(e) if e.is_not_found() => {
                info!("Skipping pid {}: {}", process.pid, e);
                last_error = Some(e);
            }
            Err(e) => {
                warn!("Skipping pid {}: {}", process.pid, e);
                last_error = Some(e);
            }
        }
    }

    if reports.is_empty() {
        return Err(
            last_error.unwrap_or_else(|| Error::ProcessNotFound(request.process_name.clone()))
        );
    }
    Ok(reports)
}
