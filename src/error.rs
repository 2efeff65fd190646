//! Error types for the plugin operations.
//!
//! None of these cross the plugin boundary. Each one ends the current call
//! and is turned into a single pushed string by the error reporter.

use thiserror::Error;

/// `WAIT_TIMEOUT` from the Win32 error table.
pub const WAIT_TIMEOUT_CODE: u32 = 258;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    /// The host supplied fewer parameters than the operation pops.
    #[error("parameter stack is empty")]
    EmptyStack,

    /// The child process could not be created.
    #[error("failed to launch process (os error {code})")]
    Launch { code: u32 },

    /// Waiting on the child or reading its exit code failed.
    #[error("failed to wait for process (os error {code})")]
    Wait { code: u32 },

    /// The configured wait ceiling elapsed before the child exited.
    #[error("process did not exit within {0:?}")]
    WaitTimeout(std::time::Duration),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// The numeric code handed to the error reporter for this failure.
    pub fn os_code(&self) -> u32 {
        match self {
            PluginError::Launch { code } | PluginError::Wait { code } => *code,
            PluginError::WaitTimeout(_) => WAIT_TIMEOUT_CODE,
            PluginError::Io(e) => e.raw_os_error().map(|c| c as u32).unwrap_or(0),
            PluginError::EmptyStack | PluginError::Config(_) => 0,
        }
    }

    #[cfg_attr(windows, allow(dead_code))]
    pub(crate) fn launch(e: &std::io::Error) -> Self {
        PluginError::Launch {
            code: e.raw_os_error().map(|c| c as u32).unwrap_or(0),
        }
    }

    #[cfg_attr(windows, allow(dead_code))]
    pub(crate) fn wait(e: &std::io::Error) -> Self {
        PluginError::Wait {
            code: e.raw_os_error().map(|c| c as u32).unwrap_or(0),
        }
    }
}

/// Recover the Win32 error code from a `windows` crate error.
#[cfg(windows)]
pub(crate) fn win32_code(e: &windows::core::Error) -> u32 {
    let hr = e.code().0 as u32;
    if hr & 0xFFFF_0000 == 0x8007_0000 {
        hr & 0xFFFF
    } else {
        hr
    }
}
