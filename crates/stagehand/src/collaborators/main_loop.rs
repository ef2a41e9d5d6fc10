//! Handle used to stop the event loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Collaborator able to stop the running event loop.
pub trait MainLoop {
    /// Requests the loop to stop after the current dispatch.
    fn quit(&self);
}

/// Shared stop flag polled by the event loop between dispatches.
#[derive(Debug, Default, Clone)]
pub struct LoopHandle {
    stopped: Arc<AtomicBool>,
}

impl LoopHandle {
    /// Builds a handle for a loop that has not been asked to stop.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`MainLoop::quit`] has been called on any clone.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl MainLoop for LoopHandle {
    fn quit(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quitting_any_clone_stops_the_loop() {
        let handle = LoopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stopped());

        clone.quit();

        assert!(handle.is_stopped());
    }
}
