//! Shared utility functions.

use std::path::PathBuf;

/// Encode a Rust string as a null-terminated wide (UTF-16) string.
pub fn encode_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Encode at most `limit - 1` UTF-16 units of `s`, stopping at an embedded
/// NUL, and terminate the result. A zero limit yields an empty buffer.
pub fn encode_wide_truncated(s: &str, limit: usize) -> Vec<u16> {
    if limit == 0 {
        return Vec::new();
    }
    s.encode_utf16()
        .take_while(|&u| u != 0)
        .take(limit - 1)
        .chain(std::iter::once(0))
        .collect()
}

/// Decode a wide buffer up to its first NUL.
pub fn decode_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&u| u == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

/// Directory of the loaded plugin module (the DLL, not the host exe).
#[cfg(windows)]
pub fn module_dir() -> Option<PathBuf> {
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::HMODULE;
    use windows::Win32::System::LibraryLoader::{
        GetModuleFileNameW, GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
        GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
    };

    let mut module = HMODULE::default();
    let anchor = module_dir as *const () as *const u16;
    unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            PCWSTR(anchor),
            &mut module,
        )
        .ok()?;
    }

    let mut buf = [0u16; 1024];
    let len = unsafe { GetModuleFileNameW(Some(module), &mut buf) } as usize;
    if len == 0 {
        return None;
    }
    let path = PathBuf::from(String::from_utf16_lossy(&buf[..len]));
    path.parent().map(|p| p.to_path_buf())
}

#[cfg(not(windows))]
pub fn module_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(|p| p.to_path_buf())
}
