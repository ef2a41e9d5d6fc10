//! Observer lists for controller notifications.
//!
//! Handlers run synchronously on the event-loop thread, in the order they were
//! connected. A handler must not call back into the controller that emits it;
//! the controller is mutably borrowed for the duration of the emission.

use std::fmt;

/// Identifies a connected handler so it can be disconnected later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler<A> = Box<dyn FnMut(&A)>;

/// Ordered list of handlers for one notification kind.
pub struct Signal<A> {
    name: &'static str,
    next_id: u64,
    handlers: Vec<(HandlerId, Handler<A>)>,
}

impl<A> Signal<A> {
    /// Builds an empty signal.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    /// Appends a handler.
    pub fn connect(&mut self, handler: impl FnMut(&A) + 'static) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Removes a handler; returns whether it was connected.
    pub fn disconnect(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(candidate, _)| *candidate != id);
        before != self.handlers.len()
    }

    /// Invokes every handler in connection order.
    pub fn emit(&mut self, payload: &A) {
        for (_, handler) in &mut self.handlers {
            handler(payload);
        }
    }

    /// Number of connected handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<A> fmt::Debug for Signal<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Signal")
            .field("name", &self.name)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Notifications published by the application controller.
#[derive(Debug)]
pub struct ApplicationSignals {
    /// Fired once per actual termination, before the event loop stops.
    pub quit: Signal<()>,
    /// Fired whenever the `daemonized` property is assigned.
    pub daemonized_changed: Signal<bool>,
}

impl Default for ApplicationSignals {
    fn default() -> Self {
        Self {
            quit: Signal::new("quit"),
            daemonized_changed: Signal::new("notify::daemonized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn handlers_run_in_connection_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::<u8>::new("test");
        for label in ["first", "second", "third"] {
            let calls = Rc::clone(&calls);
            signal.connect(move |value| calls.borrow_mut().push(format!("{label}:{value}")));
        }

        signal.emit(&7);

        assert_eq!(*calls.borrow(), vec!["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn disconnected_handlers_are_skipped() {
        let count = Rc::new(RefCell::new(0_u32));
        let mut signal = Signal::<()>::new("test");
        let counter = Rc::clone(&count);
        let id = signal.connect(move |()| *counter.borrow_mut() += 1);

        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id), "second disconnect should be a no-op");
        signal.emit(&());

        assert_eq!(*count.borrow(), 0);
        assert_eq!(signal.handler_count(), 0);
    }
}
