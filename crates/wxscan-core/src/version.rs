//! Executable file-version extraction.

use std::ffi::c_void;
use std::path::Path;

use windows::Win32::Storage::FileSystem::{
    GetFileVersionInfoSizeW, GetFileVersionInfoW, VS_FIXEDFILEINFO, VerQueryValueW,
};
use windows::core::PCWSTR;

use crate::error::{Error, Result};

/// Read the dotted 4-component file version of an executable, e.g.
/// `"3.9.12.17"`. The components are the high and low 16-bit halves of the
/// two fixed-info version words.
pub fn file_version_string(path: &Path) -> Result<String> {
    let display = path.display().to_string();
    let fail = |message: String| Error::VersionInfoFailed {
        path: display.clone(),
        message,
    };

    let wide: Vec<u16> = path
        .as_os_str()
        .to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();

    let size = unsafe { GetFileVersionInfoSizeW(PCWSTR(wide.as_ptr()), None) };
    if size == 0 {
        return Err(fail("no version info resource".to_string()));
    }

    let mut data = vec![0u8; size as usize];
    unsafe { GetFileVersionInfoW(PCWSTR(wide.as_ptr()), 0, size, data.as_mut_ptr() as *mut c_void) }
        .map_err(|e| fail(e.to_string()))?;

    let root: Vec<u16> = "\\".encode_utf16().chain(std::iter::once(0)).collect();
    let mut info_ptr: *mut c_void = std::ptr::null_mut();
    let mut info_len = 0u32;

    let ok = unsafe {
        VerQueryValueW(
            data.as_ptr() as *const c_void,
            PCWSTR(root.as_ptr()),
            &mut info_ptr,
            &mut info_len,
        )
    };
    if !ok.as_bool()
        || info_ptr.is_null()
        || (info_len as usize) < std::mem::size_of::<VS_FIXEDFILEINFO>()
    {
        return Err(fail("fixed file info block missing".to_string()));
    }

    let info = unsafe { &*(info_ptr as *const VS_FIXEDFILEINFO) };
    Ok(format!(
        "{}.{}.{}.{}",
        info.dwFileVersionMS >> 16,
        info.dwFileVersionMS & 0xFFFF,
        info.dwFileVersionLS >> 16,
        info.dwFileVersionLS & 0xFFFF,
    ))
}
