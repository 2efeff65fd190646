//! Parameter stack shared with the installer host.
//!
//! The host passes arguments and receives results through a singly linked
//! list of fixed-width wide-string nodes. `HostStack` adapts that list;
//! `MemoryStack` is an owned equivalent with the same truncation rules.
//!
//! Widths count UTF-16 units including the terminating NUL, so at most
//! `width - 1` units of text survive a push or a pop.

use std::ptr;

use crate::util::{decode_wide, encode_wide_truncated};

/// One node of the host's list. `text` runs past the struct for
/// `string_size` units.
#[repr(C)]
pub struct StackNode {
    pub next: *mut StackNode,
    pub text: [u16; 1],
}

pub trait ParamStack {
    /// Pop the top entry, keeping at most `max_len - 1` units of it.
    /// `None` when the stack is empty.
    fn pop(&mut self, max_len: usize) -> Option<String>;

    /// Push `text`, truncated to the stack's string width.
    fn push(&mut self, text: &str);
}

fn take_units(buf: &[u16], max_len: usize) -> String {
    let limit = max_len.saturating_sub(1);
    let len = buf.iter().position(|&u| u == 0).unwrap_or(buf.len());
    decode_wide(&buf[..len.min(limit)])
}

// --- Owned stack ---

#[derive(Debug, Default, Clone)]
pub struct MemoryStack {
    entries: Vec<Vec<u16>>,
    string_size: usize,
}

impl MemoryStack {
    pub fn new(string_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            string_size,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ParamStack for MemoryStack {
    fn pop(&mut self, max_len: usize) -> Option<String> {
        self.entries.pop().map(|e| take_units(&e, max_len))
    }

    fn push(&mut self, text: &str) {
        self.entries
            .push(encode_wide_truncated(text, self.string_size.max(1)));
    }
}

// --- Host list adapter ---

/// View over the host's list for the duration of one call.
pub struct HostStack<'a> {
    top: Option<&'a mut *mut StackNode>,
    string_size: usize,
}

impl<'a> HostStack<'a> {
    /// # Safety
    ///
    /// `stacktop` must be null or point to a valid list head for `'a`, every
    /// node reachable from it must hold at least `string_size` text units
    /// and must have been allocated the way this module allocates nodes.
    pub unsafe fn from_raw(stacktop: *mut *mut StackNode, string_size: usize) -> Self {
        Self {
            top: unsafe { stacktop.as_mut() },
            string_size,
        }
    }

    pub fn string_size(&self) -> usize {
        self.string_size
    }

    fn capacity(&self) -> usize {
        self.string_size.max(1)
    }
}

impl ParamStack for HostStack<'_> {
    fn pop(&mut self, max_len: usize) -> Option<String> {
        let capacity = self.capacity();
        let string_size = self.string_size;
        let top = self.top.as_deref_mut()?;
        let node = *top;
        if node.is_null() {
            return None;
        }

        // SAFETY: node is a live list node with `capacity` text units.
        let text = unsafe {
            let base = ptr::addr_of!((*node).text) as *const u16;
            let units = std::slice::from_raw_parts(base, capacity);
            take_units(units, max_len)
        };

        // SAFETY: node is unlinked before it is released; nothing else holds it.
        unsafe {
            *top = (*node).next;
            free_node(node, string_size);
        }
        Some(text)
    }

    fn push(&mut self, text: &str) {
        let capacity = self.capacity();
        let string_size = self.string_size;
        let Some(top) = self.top.as_deref_mut() else {
            return;
        };

        let units = encode_wide_truncated(text, capacity);
        // SAFETY: the allocation is zeroed and sized for `capacity` units.
        unsafe {
            let node = alloc_node(string_size);
            if node.is_null() {
                crate::debug_log!("Stack node allocation failed");
                return;
            }
            let base = ptr::addr_of_mut!((*node).text) as *mut u16;
            ptr::copy_nonoverlapping(units.as_ptr(), base, units.len());
            (*node).next = *top;
            *top = node;
        }
    }
}

fn node_bytes(string_size: usize) -> usize {
    std::mem::size_of::<StackNode>() + string_size.max(1) * std::mem::size_of::<u16>()
}

// The host releases nodes we push with GlobalFree, so they must come from
// GlobalAlloc.
#[cfg(windows)]
unsafe fn alloc_node(string_size: usize) -> *mut StackNode {
    use windows::Win32::System::Memory::{GlobalAlloc, GPTR};

    match unsafe { GlobalAlloc(GPTR, node_bytes(string_size)) } {
        Ok(h) => h.0 as *mut StackNode,
        Err(_) => ptr::null_mut(),
    }
}

#[cfg(windows)]
unsafe fn free_node(node: *mut StackNode, _string_size: usize) {
    use windows::Win32::Foundation::{GlobalFree, HGLOBAL};

    let _ = unsafe { GlobalFree(Some(HGLOBAL(node as *mut core::ffi::c_void))) };
}

#[cfg(not(windows))]
fn node_layout(string_size: usize) -> Option<std::alloc::Layout> {
    std::alloc::Layout::from_size_align(
        node_bytes(string_size),
        std::mem::align_of::<StackNode>(),
    )
    .ok()
}

#[cfg(not(windows))]
unsafe fn alloc_node(string_size: usize) -> *mut StackNode {
    match node_layout(string_size) {
        Some(layout) => unsafe { std::alloc::alloc_zeroed(layout) as *mut StackNode },
        None => ptr::null_mut(),
    }
}

#[cfg(not(windows))]
unsafe fn free_node(node: *mut StackNode, string_size: usize) {
    if let Some(layout) = node_layout(string_size) {
        unsafe { std::alloc::dealloc(node as *mut u8, layout) };
    }
}
