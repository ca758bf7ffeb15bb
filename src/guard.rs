//! Circular dependency detection
//!
//! The active resolution path is tracked per thread: it describes one
//! logical call chain, and concurrent resolutions on other threads never
//! observe each other. Entries are keyed by container identity so nested
//! use of two containers on one thread does not collide.

use crate::{DiError, Result};
use std::cell::RefCell;

thread_local! {
    static RESOLVING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard marking an identifier as mid-construction.
///
/// Entering an identifier that is already on the path of the same
/// container fails with [`DiError::CircularDependency`]. The entry is popped
/// when the guard drops, whether the build succeeded, failed or panicked.
pub(crate) struct ResolutionGuard {
    depth: usize,
}

impl ResolutionGuard {
    pub(crate) fn enter(container: usize, id: &str) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack.iter().position(|(c, i)| *c == container && i == id) {
                let mut chain: Vec<String> = stack[start..]
                    .iter()
                    .filter(|(c, _)| *c == container)
                    .map(|(_, i)| i.clone())
                    .collect();
                chain.push(id.to_string());
                return Err(DiError::CircularDependency {
                    id: id.to_string(),
                    chain,
                });
            }
            stack.push((container, id.to_string()));
            Ok(Self { depth: stack.len() })
        })
    }

    /// Whether `id` is currently being built by `container` on this thread
    pub(crate) fn is_active(container: usize, id: &str) -> bool {
        RESOLVING.with(|stack| {
            stack
                .borrow()
                .iter()
                .any(|(c, i)| *c == container && i == id)
        })
    }

    /// Length of the active path on this thread
    pub(crate) fn depth() -> usize {
        RESOLVING.with(|stack| stack.borrow().len())
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        // try_with: the thread-local may already be gone during thread teardown
        let _ = RESOLVING.try_with(|stack| {
            stack.borrow_mut().truncate(self.depth - 1);
        });
    }
}
