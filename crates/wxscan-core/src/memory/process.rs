//! Windows process enumeration, handle ownership and raw memory reads.

use std::ffi::c_void;
use std::path::PathBuf;

use tracing::{debug, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE, MAX_PATH};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{MEM_COMMIT, MEMORY_BASIC_INFORMATION, VirtualQueryEx};
use windows::Win32::System::ProcessStatus::K32GetMappedFileNameW;
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
    QueryFullProcessImageNameW,
};
use windows::core::PWSTR;

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ReadMemory};

/// A running process matched during enumeration.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// Enumerate running processes whose executable name contains `name_substr`
/// (case-sensitive). No match is an empty list, not an error.
pub fn find_processes(name_substr: &str) -> Result<Vec<ProcessInfo>> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }.map_err(|e| {
        Error::ProcessOpenFailed {
            pid: 0,
            message: format!("process snapshot failed: {e}"),
        }
    })?;

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    let mut matches = Vec::new();
    if unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok() {
        loop {
            let len = entry
                .szExeFile
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(entry.szExeFile.len());
            let name = String::from_utf16_lossy(&entry.szExeFile[..len]);

            if name.contains(name_substr) {
                matches.push(ProcessInfo {
                    pid: entry.th32ProcessID,
                    name,
                });
            }

            if unsafe { Process32NextW(snapshot, &mut entry) }.is_err() {
                break;
            }
        }
    }

    let _ = unsafe { CloseHandle(snapshot) };

    debug!(
        "Found {} process(es) matching '{}'",
        matches.len(),
        name_substr
    );
    Ok(matches)
}

/// Owned handle to a target process, opened with the minimum rights needed
/// to query its memory map and read its memory. Closed on drop, so every
/// exit path releases it.
pub struct ProcessHandle {
    raw: HANDLE,
    pid: u32,
}

impl ProcessHandle {
    pub fn open(pid: u32) -> Result<Self> {
        let raw = unsafe { OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid) }
            .map_err(|e| Error::ProcessOpenFailed {
                pid,
                message: e.to_string(),
            })?;

        Ok(Self { raw, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Full path of the process executable.
    pub fn exe_path(&self) -> Result<PathBuf> {
        let mut buf = [0u16; MAX_PATH as usize];
        let mut len = buf.len() as u32;

        unsafe {
            QueryFullProcessImageNameW(
                self.raw,
                PROCESS_NAME_WIN32,
                PWSTR(buf.as_mut_ptr()),
                &mut len,
            )
        }
        .map_err(|e| Error::ProcessOpenFailed {
            pid: self.pid,
            message: format!("failed to query image name: {e}"),
        })?;

        Ok(PathBuf::from(String::from_utf16_lossy(&buf[..len as usize])))
    }

    /// Walk the process's virtual memory map and return one record per
    /// committed segment, in ascending address order, with the backing file
    /// path where one exists. Segments are not coalesced.
    ///
    /// Backing paths come back in NT device form
    /// (`\Device\HarddiskVolume3\...\WeChatWin.dll`); module-name containment
    /// matching works on those unchanged.
    pub fn memory_regions(&self) -> Result<Vec<MemoryRegion>> {
        let mut regions = Vec::new();
        let mut address = 0usize;
        let mut path_buf = [0u16; 1024];

        loop {
            let mut info = MEMORY_BASIC_INFORMATION::default();
            let written = unsafe {
                VirtualQueryEx(
                    self.raw,
                    Some(address as *const c_void),
                    &mut info,
                    std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if written == 0 {
                break;
            }

            if info.State == MEM_COMMIT {
                let len = unsafe {
                    K32GetMappedFileNameW(self.raw, info.BaseAddress as *const c_void, &mut path_buf)
                };
                let path = String::from_utf16_lossy(&path_buf[..len as usize]);

                regions.push(MemoryRegion::new(
                    info.BaseAddress as u64,
                    info.RegionSize as u64,
                    path,
                ));
            }

            let base = info.BaseAddress as usize;
            match base.checked_add(info.RegionSize) {
                Some(next) if next > address => address = next,
                _ => break,
            }
        }

        if regions.is_empty() {
            warn!("Process {} has no committed memory regions", self.pid);
        }
        Ok(regions)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        let _ = unsafe { CloseHandle(self.raw) };
    }
}

/// [`ReadMemory`] backed by `ReadProcessMemory` on an open process handle.
pub struct ProcessMemoryReader<'a> {
    process: &'a ProcessHandle,
}

impl<'a> ProcessMemoryReader<'a> {
    pub fn new(process: &'a ProcessHandle) -> Self {
        Self { process }
    }
}

impl ReadMemory for ProcessMemoryReader<'_> {
    fn read_into(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        let mut read = 0usize;

        unsafe {
            ReadProcessMemory(
                self.process.raw,
                address as *const c_void,
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
                Some(&mut read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;

        // A partial read must surface as a failure, never as silent success.
        if read != buf.len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("short read: {read} of {} bytes", buf.len()),
            });
        }

        Ok(())
    }
}
