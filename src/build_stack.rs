//! Per-thread build stack for cycle detection
//!
//! Each frame records the container that pushed it, so two containers
//! resolving on the same thread never see each other's ids. A frame is popped
//! when its [`BuildGuard`] drops, whether the build succeeded or failed.

use crate::{ContainerError, Result};
use std::cell::RefCell;

#[cfg(feature = "logging")]
use tracing::trace;

struct Frame {
    owner: usize,
    id: String,
}

thread_local! {
    static BUILD_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Marks `id` as under construction for one container until dropped
#[must_use = "the id is popped as soon as the guard is dropped"]
pub(crate) struct BuildGuard {
    owner: usize,
    depth: usize,
}

impl BuildGuard {
    /// Push `id`, failing with the cycle path if it is already being built
    pub(crate) fn enter(owner: usize, id: &str) -> Result<Self> {
        BUILD_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if let Some(start) = stack.iter().position(|f| f.owner == owner && f.id == id) {
                let mut path: Vec<String> = stack[start..]
                    .iter()
                    .filter(|f| f.owner == owner)
                    .map(|f| f.id.clone())
                    .collect();
                path.push(id.to_string());
                return Err(ContainerError::circular(path));
            }

            stack.push(Frame {
                owner,
                id: id.to_string(),
            });

            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                service = id,
                depth = stack.len(),
                "Entering build stack"
            );

            Ok(Self {
                owner,
                depth: stack.len(),
            })
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILD_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth);
            debug_assert!(stack.last().is_some_and(|f| f.owner == self.owner));
            stack.pop();
        });
    }
}

/// Ids currently being built by `owner` on this thread, outermost first
#[cfg(test)]
pub(crate) fn current(owner: usize) -> Vec<String> {
    BUILD_STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .filter(|f| f.owner == owner)
            .map(|f| f.id.clone())
            .collect()
    })
}
