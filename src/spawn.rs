//! Minimized child process launching.
//!
//! On Windows uses CreateProcessW with STARTF_USESHOWWINDOW and
//! SW_SHOWMINNOACTIVE so the child starts minimized and the installer
//! window keeps focus. Elsewhere falls back to `std::process::Command`.

use crate::runner::{ChildProcess, LaunchRequest, Launcher, RedrawPump};

#[cfg(windows)]
pub use win32::{MinimizedLauncher, PaintPump, Win32Child};

#[cfg(not(windows))]
pub use portable::{MinimizedLauncher, PaintPump, StdChild};

/// Split a command line on whitespace, honouring double quotes and `\"`.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_arg = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                has_arg = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                has_arg = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_arg {
                    args.push(std::mem::take(&mut current));
                    has_arg = false;
                }
            }
            c => {
                current.push(c);
                has_arg = true;
            }
        }
    }

    if has_arg {
        args.push(current);
    }
    args
}

#[cfg(windows)]
mod win32 {
    use std::time::Duration;

    use windows::core::{PCWSTR, PWSTR};
    use windows::Win32::Foundation::{CloseHandle, GetLastError, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
    use windows::Win32::System::Threading::*;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, MSG, PM_REMOVE, SW_SHOWMINNOACTIVE, WM_PAINT,
    };

    use super::{ChildProcess, LaunchRequest, Launcher, RedrawPump};
    use crate::error::{win32_code, PluginError, Result};
    use crate::util::encode_wide;

    /// Closes the wrapped handle when dropped.
    struct OwnedHandle(HANDLE);

    impl Drop for OwnedHandle {
        fn drop(&mut self) {
            if !self.0.is_invalid() {
                unsafe {
                    let _ = CloseHandle(self.0);
                }
            }
        }
    }

    #[derive(Debug, Default)]
    pub struct MinimizedLauncher;

    impl Launcher for MinimizedLauncher {
        type Child = Win32Child;

        fn launch(&self, request: &LaunchRequest) -> Result<Win32Child> {
            let mut cmd_wide = encode_wide(&request.command_line);
            let dir_wide = encode_wide(&request.working_dir);

            let si = STARTUPINFOW {
                cb: std::mem::size_of::<STARTUPINFOW>() as u32,
                dwFlags: STARTF_USESHOWWINDOW,
                wShowWindow: SW_SHOWMINNOACTIVE.0 as u16,
                ..Default::default()
            };

            let mut pi = PROCESS_INFORMATION::default();

            unsafe {
                CreateProcessW(
                    None,
                    Some(PWSTR(cmd_wide.as_mut_ptr())),
                    None,
                    None,
                    false,
                    PROCESS_CREATION_FLAGS(0),
                    None,
                    PCWSTR(dir_wide.as_ptr()),
                    &si,
                    &mut pi,
                )
            }
            .map_err(|e| PluginError::Launch {
                code: win32_code(&e),
            })?;

            // The primary thread handle is never used.
            drop(OwnedHandle(pi.hThread));

            Ok(Win32Child {
                process: OwnedHandle(pi.hProcess),
            })
        }
    }

    pub struct Win32Child {
        process: OwnedHandle,
    }

    impl ChildProcess for Win32Child {
        fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<u32>> {
            // Stay below INFINITE.
            let ms = timeout.as_millis().min(u128::from(u32::MAX - 1)) as u32;
            let event = unsafe { WaitForSingleObject(self.process.0, ms) };

            if event == WAIT_TIMEOUT {
                return Ok(None);
            }
            if event != WAIT_OBJECT_0 {
                return Err(PluginError::Wait {
                    code: unsafe { GetLastError() }.0,
                });
            }

            let mut exit_code = 0u32;
            unsafe { GetExitCodeProcess(self.process.0, &mut exit_code) }.map_err(|e| {
                PluginError::Wait {
                    code: win32_code(&e),
                }
            })?;
            Ok(Some(exit_code))
        }
    }

    /// Dispatches queued WM_PAINT messages for the calling thread's windows
    /// and leaves everything else queued.
    #[derive(Debug, Default)]
    pub struct PaintPump;

    impl RedrawPump for PaintPump {
        fn drain_redraw(&mut self) {
            let mut msg = MSG::default();
            unsafe {
                while PeekMessageW(&mut msg, None, WM_PAINT, WM_PAINT, PM_REMOVE).as_bool() {
                    DispatchMessageW(&msg);
                }
            }
        }
    }
}

#[cfg(not(windows))]
mod portable {
    use std::process::{Child, Command};
    use std::time::{Duration, Instant};

    use super::{split_command_line, ChildProcess, LaunchRequest, Launcher, RedrawPump};
    use crate::error::{PluginError, Result};

    /// ENOENT, reported for an empty command line.
    const NO_SUCH_FILE: u32 = 2;

    const TRY_WAIT_STEP: Duration = Duration::from_millis(10);

    #[derive(Debug, Default)]
    pub struct MinimizedLauncher;

    impl Launcher for MinimizedLauncher {
        type Child = StdChild;

        fn launch(&self, request: &LaunchRequest) -> Result<StdChild> {
            let args = split_command_line(&request.command_line);
            let Some((program, rest)) = args.split_first() else {
                return Err(PluginError::Launch { code: NO_SUCH_FILE });
            };

            let child = Command::new(program)
                .args(rest)
                .current_dir(&request.working_dir)
                .spawn()
                .map_err(|e| PluginError::launch(&e))?;
            Ok(StdChild { child })
        }
    }

    pub struct StdChild {
        child: Child,
    }

    impl ChildProcess for StdChild {
        fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<u32>> {
            let deadline = Instant::now() + timeout;
            loop {
                if let Some(status) = self.child.try_wait().map_err(|e| PluginError::wait(&e))? {
                    return Ok(Some(exit_code(status)));
                }
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                std::thread::sleep(TRY_WAIT_STEP.min(deadline - now));
            }
        }
    }

    #[cfg(unix)]
    fn exit_code(status: std::process::ExitStatus) -> u32 {
        use std::os::unix::process::ExitStatusExt;

        match (status.code(), status.signal()) {
            (Some(code), _) => code as u32,
            (None, Some(signal)) => 128 + signal as u32,
            (None, None) => u32::MAX,
        }
    }

    #[cfg(not(unix))]
    fn exit_code(status: std::process::ExitStatus) -> u32 {
        status.code().map(|c| c as u32).unwrap_or(u32::MAX)
    }

    /// No window system to service.
    #[derive(Debug, Default)]
    pub struct PaintPump;

    impl RedrawPump for PaintPump {
        fn drain_redraw(&mut self) {}
    }
}
