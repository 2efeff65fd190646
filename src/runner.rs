//! Run a command minimized and wait for it to exit.
//!
//! The wait is a sequence of short blocking slices. Between slices pending
//! redraw events are drained so the installer window keeps painting, and
//! nothing else is dispatched. Without a configured timeout the call returns
//! only when the child exits.

use std::time::{Duration, Instant};

use crate::config::WaitPolicy;
use crate::context::CallContext;
use crate::error::{PluginError, Result};
use crate::error_report::{report_error, MessageSource};
use crate::stack::ParamStack;

/// Width of the command line and working directory parameters (MAX_PATH).
pub const MAX_PATH_LEN: usize = 260;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub command_line: String,
    pub working_dir: String,
}

pub trait Launcher {
    type Child: ChildProcess;

    /// Start the child minimized without taking focus.
    fn launch(&self, request: &LaunchRequest) -> Result<Self::Child>;
}

pub trait ChildProcess {
    /// Block for at most `timeout`. `Some(exit_code)` once the child has exited.
    fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<u32>>;
}

pub trait RedrawPump {
    /// Service pending redraw events for the caller's windows.
    fn drain_redraw(&mut self);
}

/// Signed decimal, the way the host has always received exit codes.
pub fn format_exit_code(code: u32) -> String {
    (code as i32).to_string()
}

/// Wait in `policy.poll_interval` slices, draining redraws after each slice
/// that ends with the child still running.
pub fn wait_for_exit(
    child: &mut impl ChildProcess,
    pump: &mut impl RedrawPump,
    policy: &WaitPolicy,
) -> Result<u32> {
    let started = Instant::now();

    loop {
        let slice = match policy.timeout {
            Some(limit) => {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(PluginError::WaitTimeout(limit));
                }
                policy.poll_interval.min(limit - elapsed)
            }
            None => policy.poll_interval,
        };

        if let Some(code) = child.wait_timeout(slice)? {
            return Ok(code);
        }
        pump.drain_redraw();
    }
}

/// Launch `request` and wait for its exit code.
pub fn run_and_wait<L: Launcher>(
    request: &LaunchRequest,
    launcher: &L,
    pump: &mut impl RedrawPump,
    policy: &WaitPolicy,
) -> Result<u32> {
    let mut child = launcher.launch(request)?;
    crate::debug_log!("Launched: {}", request.command_line);
    wait_for_exit(&mut child, pump, policy)
}

/// Pop the command line and working directory, run the command and push
/// either its exit code or a description of what went wrong.
pub fn exec_wait_min<S, L>(
    ctx: &mut CallContext<'_, S>,
    launcher: &L,
    pump: &mut impl RedrawPump,
    policy: &WaitPolicy,
    messages: &impl MessageSource,
) where
    S: ParamStack,
    L: Launcher,
{
    let command_line = ctx.pop_param("command line", MAX_PATH_LEN);
    let working_dir = ctx.pop_param("working directory", MAX_PATH_LEN);
    crate::debug_log!(
        "ExecWaitMin: cmd='{}' dir='{}' parent={:?}",
        command_line,
        working_dir,
        ctx.window
    );

    let request = LaunchRequest {
        command_line,
        working_dir,
    };

    match run_and_wait(&request, launcher, pump, policy) {
        Ok(code) => {
            crate::debug_log!("Exit code: {}", format_exit_code(code));
            ctx.push(&format_exit_code(code));
        }
        Err(e) => {
            crate::debug_log!("ExecWaitMin failed: {}", e);
            report_error(&mut *ctx.stack, e.os_code(), messages);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ParentWindow;
    use crate::error_report::UNKNOWN_ERROR;
    use crate::stack::MemoryStack;
    use std::cell::RefCell;

    /// Exits after a fixed number of slices.
    struct ScriptedChild {
        slices_left: usize,
        exit_code: u32,
        slices_seen: Vec<Duration>,
    }

    impl ChildProcess for ScriptedChild {
        fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<u32>> {
            self.slices_seen.push(timeout);
            if self.slices_left == 0 {
                return Ok(Some(self.exit_code));
            }
            self.slices_left -= 1;
            Ok(None)
        }
    }

    /// Never exits; sleeps through each slice.
    struct StuckChild;

    impl ChildProcess for StuckChild {
        fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<u32>> {
            std::thread::sleep(timeout);
            Ok(None)
        }
    }

    struct BrokenChild;

    impl ChildProcess for BrokenChild {
        fn wait_timeout(&mut self, _timeout: Duration) -> Result<Option<u32>> {
            Err(PluginError::Wait { code: 6 })
        }
    }

    #[derive(Default)]
    struct CountingPump(usize);

    impl RedrawPump for CountingPump {
        fn drain_redraw(&mut self) {
            self.0 += 1;
        }
    }

    struct FakeLauncher {
        outcome: std::result::Result<(usize, u32), u32>,
        requests: RefCell<Vec<LaunchRequest>>,
    }

    impl FakeLauncher {
        fn exits_after(slices: usize, code: u32) -> Self {
            Self {
                outcome: Ok((slices, code)),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn fails_with(code: u32) -> Self {
            Self {
                outcome: Err(code),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl Launcher for FakeLauncher {
        type Child = ScriptedChild;

        fn launch(&self, request: &LaunchRequest) -> Result<ScriptedChild> {
            self.requests.borrow_mut().push(request.clone());
            match self.outcome {
                Ok((slices_left, exit_code)) => Ok(ScriptedChild {
                    slices_left,
                    exit_code,
                    slices_seen: Vec::new(),
                }),
                Err(code) => Err(PluginError::Launch { code }),
            }
        }
    }

    struct FixedMessages;

    impl MessageSource for FixedMessages {
        fn system_message(&self, code: u32) -> Option<String> {
            (code == 2).then(|| "The system cannot find the file specified.".to_string())
        }

        fn internet_message(&self, _code: u32) -> Option<String> {
            None
        }

        fn last_response_info(&self) -> Option<String> {
            None
        }
    }

    fn policy(poll_ms: u64, timeout_ms: Option<u64>) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_millis(poll_ms),
            timeout: timeout_ms.map(Duration::from_millis),
        }
    }

    fn exec(launcher: &FakeLauncher, pump: &mut CountingPump, policy: &WaitPolicy) -> Vec<String> {
        let mut stack = MemoryStack::new(1024);
        stack.push("C:\\work");
        stack.push("setup.exe /quiet");
        let mut ctx = CallContext::new(ParentWindow::none(), 1024, &mut stack);
        exec_wait_min(&mut ctx, launcher, pump, policy, &FixedMessages);
        std::iter::from_fn(|| stack.pop(1024)).collect()
    }

    #[test]
    fn pops_command_then_directory() {
        let launcher = FakeLauncher::exits_after(0, 0);
        let mut pump = CountingPump::default();
        exec(&launcher, &mut pump, &WaitPolicy::default());

        assert_eq!(
            *launcher.requests.borrow(),
            vec![LaunchRequest {
                command_line: "setup.exe /quiet".to_string(),
                working_dir: "C:\\work".to_string(),
            }]
        );
    }

    #[test]
    fn immediate_exit_pushes_zero() {
        let launcher = FakeLauncher::exits_after(0, 0);
        let mut pump = CountingPump::default();
        assert_eq!(exec(&launcher, &mut pump, &WaitPolicy::default()), vec!["0"]);
        assert_eq!(pump.0, 0);
    }

    #[test]
    fn redraws_are_drained_between_slices() {
        let launcher = FakeLauncher::exits_after(5, 7);
        let mut pump = CountingPump::default();
        assert_eq!(exec(&launcher, &mut pump, &WaitPolicy::default()), vec!["7"]);
        assert_eq!(pump.0, 5);
    }

    #[test]
    fn slices_use_poll_interval() {
        let mut child = ScriptedChild {
            slices_left: 2,
            exit_code: 3,
            slices_seen: Vec::new(),
        };
        let mut pump = CountingPump::default();
        let code = wait_for_exit(&mut child, &mut pump, &policy(100, None)).unwrap();
        assert_eq!(code, 3);
        assert_eq!(child.slices_seen, vec![Duration::from_millis(100); 3]);
    }

    #[test]
    fn launch_failure_pushes_description_only() {
        let launcher = FakeLauncher::fails_with(2);
        let mut pump = CountingPump::default();
        assert_eq!(
            exec(&launcher, &mut pump, &WaitPolicy::default()),
            vec!["The system cannot find the file specified."]
        );
    }

    #[test]
    fn undecodable_launch_failure_pushes_fallback() {
        let launcher = FakeLauncher::fails_with(0xFFFF_0000);
        let mut pump = CountingPump::default();
        assert_eq!(exec(&launcher, &mut pump, &WaitPolicy::default()), vec![UNKNOWN_ERROR]);
    }

    #[test]
    fn timeout_stops_waiting() {
        let mut pump = CountingPump::default();
        let err = wait_for_exit(&mut StuckChild, &mut pump, &policy(10, Some(50))).unwrap_err();
        assert!(matches!(err, PluginError::WaitTimeout(_)));
        assert_eq!(err.os_code(), crate::error::WAIT_TIMEOUT_CODE);
        assert!(pump.0 >= 1);
    }

    #[test]
    fn wait_failure_is_reported() {
        let mut pump = CountingPump::default();
        let err = wait_for_exit(&mut BrokenChild, &mut pump, &WaitPolicy::default()).unwrap_err();
        assert_eq!(err.os_code(), 6);
        assert_eq!(pump.0, 0);
    }

    #[test]
    fn exit_code_is_signed_decimal() {
        assert_eq!(format_exit_code(0), "0");
        assert_eq!(format_exit_code(7), "7");
        assert_eq!(format_exit_code(0xC000_0005), "-1073741819");
    }
}
