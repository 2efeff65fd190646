//! Cursor shape switching.

use crate::context::CallContext;
use crate::stack::ParamStack;

/// Width of the cursor name parameter.
pub const CURSOR_NAME_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Wait,
    Arrow,
}

impl CursorShape {
    /// Case-sensitive match on `"WAIT"` / `"ARROW"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "WAIT" => Some(CursorShape::Wait),
            "ARROW" => Some(CursorShape::Arrow),
            _ => None,
        }
    }
}

pub trait CursorSink {
    fn apply(&mut self, shape: CursorShape);
}

/// Sets the system cursor for the calling thread.
#[derive(Debug, Default)]
pub struct SystemCursor;

#[cfg(windows)]
impl CursorSink for SystemCursor {
    fn apply(&mut self, shape: CursorShape) {
        use windows::Win32::UI::WindowsAndMessaging::{LoadCursorW, SetCursor, IDC_ARROW, IDC_WAIT};

        let id = match shape {
            CursorShape::Wait => IDC_WAIT,
            CursorShape::Arrow => IDC_ARROW,
        };
        unsafe {
            match LoadCursorW(None, id) {
                Ok(cursor) => {
                    let _ = SetCursor(Some(cursor));
                }
                Err(e) => crate::debug_log!("LoadCursorW failed: {}", e),
            }
        }
    }
}

#[cfg(not(windows))]
impl CursorSink for SystemCursor {
    fn apply(&mut self, shape: CursorShape) {
        crate::debug_log!("No system cursor on this platform, skipping {:?}", shape);
    }
}

/// Pop one cursor name and apply it. Unknown names change nothing and
/// push nothing.
pub fn set_window_cursor<S: ParamStack>(ctx: &mut CallContext<'_, S>, sink: &mut impl CursorSink) {
    let name = ctx.pop_param("cursor", CURSOR_NAME_LEN);

    match CursorShape::from_name(&name) {
        Some(shape) => {
            crate::debug_log!("Cursor -> {:?}", shape);
            sink.apply(shape);
        }
        None => crate::debug_log!("Unknown cursor name '{}', ignored", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ParentWindow;
    use crate::stack::MemoryStack;

    #[derive(Default)]
    struct Recorder(Vec<CursorShape>);

    impl CursorSink for Recorder {
        fn apply(&mut self, shape: CursorShape) {
            self.0.push(shape);
        }
    }

    fn run(name: &str) -> (Vec<CursorShape>, MemoryStack) {
        let mut stack = MemoryStack::new(1024);
        stack.push(name);
        let mut sink = Recorder::default();
        let mut ctx = CallContext::new(ParentWindow::none(), 1024, &mut stack);
        set_window_cursor(&mut ctx, &mut sink);
        (sink.0, stack)
    }

    #[test]
    fn wait_and_arrow_apply() {
        assert_eq!(run("WAIT").0, vec![CursorShape::Wait]);
        assert_eq!(run("ARROW").0, vec![CursorShape::Arrow]);
    }

    #[test]
    fn unknown_name_is_ignored() {
        let (applied, stack) = run("foo");
        assert!(applied.is_empty());
        assert!(stack.is_empty());
    }

    #[test]
    fn match_is_case_sensitive() {
        assert_eq!(CursorShape::from_name("wait"), None);
        assert_eq!(CursorShape::from_name("Arrow"), None);
    }

    #[test]
    fn empty_stack_applies_nothing() {
        let mut stack = MemoryStack::new(1024);
        let mut sink = Recorder::default();
        let mut ctx = CallContext::new(ParentWindow::none(), 1024, &mut stack);
        set_window_cursor(&mut ctx, &mut sink);
        assert!(sink.0.is_empty());
    }
}
