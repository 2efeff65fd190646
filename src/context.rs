//! Per-call state handed to each operation.

use std::ffi::c_void;

use crate::stack::ParamStack;

/// The caller's top-level window as received from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentWindow(pub *mut c_void);

impl ParentWindow {
    pub fn none() -> Self {
        Self(std::ptr::null_mut())
    }

    #[cfg(windows)]
    pub fn hwnd(self) -> windows::Win32::Foundation::HWND {
        windows::Win32::Foundation::HWND(self.0)
    }
}

/// Everything one plugin call works with: the parent window, the host's
/// string width for this call and the parameter stack.
pub struct CallContext<'a, S: ParamStack> {
    pub window: ParentWindow,
    pub string_size: usize,
    pub stack: &'a mut S,
}

impl<'a, S: ParamStack> CallContext<'a, S> {
    pub fn new(window: ParentWindow, string_size: usize, stack: &'a mut S) -> Self {
        Self {
            window,
            string_size,
            stack,
        }
    }

    /// Pop a parameter. The host is trusted to supply every argument, so an
    /// empty stack reads as an empty string and is only logged.
    pub fn pop_param(&mut self, name: &str, max_len: usize) -> String {
        match self.stack.pop(max_len) {
            Some(value) => value,
            None => {
                crate::debug_log!("Parameter '{}' missing: {}", name, crate::error::PluginError::EmptyStack);
                String::new()
            }
        }
    }

    pub fn push(&mut self, text: &str) {
        self.stack.push(text);
    }
}
