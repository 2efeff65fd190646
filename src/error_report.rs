//! Turning OS and WinINet error codes into text for the host.
//!
//! Every report pushes exactly one string: the decoded description or the
//! fixed fallback.

use crate::stack::ParamStack;

pub const INTERNET_ERROR_BASE: u32 = 12000;
pub const INTERNET_ERROR_LAST: u32 = 12175;
pub const ERROR_INTERNET_EXTENDED_ERROR: u32 = 12003;

/// Pushed when no table knows the code ("Unknown error.").
pub const UNKNOWN_ERROR: &str = "Неизвестная ошибка.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The WinINet sentinel; detail lives in the last server response.
    InternetExtended,
    /// Any other code in the WinINet range.
    Internet,
    System,
}

pub fn classify(code: u32) -> ErrorClass {
    match code {
        ERROR_INTERNET_EXTENDED_ERROR => ErrorClass::InternetExtended,
        INTERNET_ERROR_BASE..=INTERNET_ERROR_LAST => ErrorClass::Internet,
        _ => ErrorClass::System,
    }
}

/// Where descriptions come from.
pub trait MessageSource {
    /// Text from the OS message table.
    fn system_message(&self, code: u32) -> Option<String>;
    /// Text from the networking library's own message table.
    fn internet_message(&self, code: u32) -> Option<String>;
    /// Detail text of the last networking response on this thread.
    fn last_response_info(&self) -> Option<String>;
}

/// Describe `code`, falling back to [`UNKNOWN_ERROR`].
pub fn describe(code: u32, source: &impl MessageSource) -> String {
    let decoded = match classify(code) {
        ErrorClass::InternetExtended => source.last_response_info(),
        ErrorClass::Internet => source.internet_message(code),
        ErrorClass::System => source.system_message(code),
    };

    decoded
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Push the description of `code` onto the stack.
pub fn report_error(stack: &mut impl ParamStack, code: u32, source: &impl MessageSource) {
    let text = describe(code, source);
    crate::debug_log!("Error {} ({:?}): {}", code, classify(code), text.trim_end());
    stack.push(&text);
}

#[cfg(windows)]
pub use win32::SystemMessages;

#[cfg(not(windows))]
pub use portable::SystemMessages;

#[cfg(windows)]
mod win32 {
    use std::ffi::c_void;

    use windows::core::{w, PWSTR};
    use windows::Win32::Foundation::{LocalFree, ERROR_INSUFFICIENT_BUFFER, HLOCAL};
    use windows::Win32::Networking::WinInet::InternetGetLastResponseInfoW;
    use windows::Win32::System::Diagnostics::Debug::{
        FormatMessageW, FORMAT_MESSAGE_ALLOCATE_BUFFER, FORMAT_MESSAGE_FROM_HMODULE,
        FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS, FORMAT_MESSAGE_OPTIONS,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;

    use super::MessageSource;
    use crate::error::win32_code;
    use crate::util::decode_wide;

    /// MAKELANGID(LANG_NEUTRAL, SUBLANG_DEFAULT)
    const LANG_NEUTRAL_DEFAULT: u32 = 0x0400;

    /// Buffer allocated by FormatMessageW, released with LocalFree.
    struct LocalBuffer(PWSTR);

    impl Drop for LocalBuffer {
        fn drop(&mut self) {
            if !self.0.is_null() {
                unsafe {
                    let _ = LocalFree(Some(HLOCAL(self.0 .0 as *mut c_void)));
                }
            }
        }
    }

    fn format_message(
        from: FORMAT_MESSAGE_OPTIONS,
        module: Option<*const c_void>,
        code: u32,
    ) -> Option<String> {
        let mut buf = LocalBuffer(PWSTR::null());
        // With ALLOCATE_BUFFER the buffer argument receives the allocation.
        let out = &mut buf.0 .0 as *mut *mut u16 as *mut u16;
        let len = unsafe {
            FormatMessageW(
                FORMAT_MESSAGE_ALLOCATE_BUFFER | FORMAT_MESSAGE_IGNORE_INSERTS | from,
                module,
                code,
                LANG_NEUTRAL_DEFAULT,
                PWSTR(out),
                0,
                None,
            )
        };
        if len == 0 || buf.0.is_null() {
            return None;
        }

        let text = unsafe { std::slice::from_raw_parts(buf.0 .0, len as usize) };
        Some(String::from_utf16_lossy(text))
    }

    #[derive(Debug, Default)]
    pub struct SystemMessages;

    impl MessageSource for SystemMessages {
        fn system_message(&self, code: u32) -> Option<String> {
            format_message(FORMAT_MESSAGE_FROM_SYSTEM, None, code)
        }

        fn internet_message(&self, code: u32) -> Option<String> {
            let module = unsafe { GetModuleHandleW(w!("wininet.dll")) }.ok()?;
            format_message(
                FORMAT_MESSAGE_FROM_HMODULE,
                Some(module.0 as *const c_void),
                code,
            )
        }

        fn last_response_info(&self) -> Option<String> {
            let mut inet_error = 0u32;
            let mut len = 0u32;

            // First call only sizes the buffer and is expected to fail.
            match unsafe { InternetGetLastResponseInfoW(&mut inet_error, None, &mut len) } {
                Err(e) if win32_code(&e) == ERROR_INSUFFICIENT_BUFFER.0 => {}
                _ => return None,
            }

            len += 1;
            let mut buf = vec![0u16; len as usize];
            unsafe {
                InternetGetLastResponseInfoW(
                    &mut inet_error,
                    Some(PWSTR(buf.as_mut_ptr())),
                    &mut len,
                )
            }
            .ok()?;

            Some(decode_wide(&buf))
        }
    }
}

#[cfg(not(windows))]
mod portable {
    use super::MessageSource;

    /// `strerror` text for system codes. There is no networking message
    /// table off Windows.
    #[derive(Debug, Default)]
    pub struct SystemMessages;

    impl MessageSource for SystemMessages {
        fn system_message(&self, code: u32) -> Option<String> {
            let code = i32::try_from(code).ok()?;
            let full = std::io::Error::from_raw_os_error(code).to_string();
            let text = match full.rsplit_once(" (os error ") {
                Some((text, _)) => text.to_string(),
                None => full,
            };
            if text.starts_with("Unknown error") {
                None
            } else {
                Some(text)
            }
        }

        fn internet_message(&self, _code: u32) -> Option<String> {
            None
        }

        fn last_response_info(&self) -> Option<String> {
            None
        }
    }
}
