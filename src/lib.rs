//! MaxDBProvider installer plugin.
//!
//! Exports two host-callable functions:
//!   SetWindowCursor  pops "WAIT" or "ARROW" and sets the cursor
//!   ExecWaitMin      pops a command line and a working directory, runs the
//!                    command minimized, waits, and pushes its exit code (or
//!                    an error description if it could not be started)

pub mod config;
pub mod context;
pub mod cursor;
pub mod error;
pub mod error_report;
pub mod log;
pub mod runner;
pub mod spawn;
pub mod stack;
pub mod util;

use std::ffi::{c_int, c_void};

use context::{CallContext, ParentWindow};
use stack::HostStack;

pub use stack::StackNode;

/// Set the current cursor shape. Parameters: cursor name.
///
/// # Safety
///
/// `stacktop` must be null or the host's live list head, with every node
/// holding `string_size` wide units.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn SetWindowCursor(
    hwnd_parent: *mut c_void,
    string_size: c_int,
    _variables: *mut u16,
    stacktop: *mut *mut StackNode,
) {
    let _ = config::get();
    let string_size = usize::try_from(string_size).unwrap_or(0);
    let mut stack = unsafe { HostStack::from_raw(stacktop, string_size) };
    let mut ctx = CallContext::new(ParentWindow(hwnd_parent), string_size, &mut stack);

    cursor::set_window_cursor(&mut ctx, &mut cursor::SystemCursor);
}

/// Run a command minimized and wait for it. Parameters: command line,
/// working directory. Result: exit code, or an error description.
///
/// # Safety
///
/// Same contract as [`SetWindowCursor`].
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn ExecWaitMin(
    hwnd_parent: *mut c_void,
    string_size: c_int,
    _variables: *mut u16,
    stacktop: *mut *mut StackNode,
) {
    let policy = config::get().wait_policy();
    let string_size = usize::try_from(string_size).unwrap_or(0);
    let mut stack = unsafe { HostStack::from_raw(stacktop, string_size) };
    let mut ctx = CallContext::new(ParentWindow(hwnd_parent), string_size, &mut stack);

    runner::exec_wait_min(
        &mut ctx,
        &spawn::MinimizedLauncher,
        &mut spawn::PaintPump,
        &policy,
        &error_report::SystemMessages,
    );
}
