//! Single-threaded event loop driving the controller.
//!
//! Only the loop thread touches the controller. The socket listener and the
//! signal thread post [`LoopEvent`]s over a channel; the loop dispatches them
//! in receipt order and stops once the controller asks it to.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info};

use crate::application::ApplicationHooks;
use crate::collaborators::{LoopHandle, StageEvent};
use crate::output::CommandOutput;
use crate::singleton::{self, SharedApplication};

const LOOP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::controller");

/// Result of a forwarded command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationReply {
    /// Exit status for the invoking process.
    pub status: i32,
    /// Text the invocation printed.
    pub output: CommandOutput,
}

/// Work posted to the loop thread.
#[derive(Debug)]
pub enum LoopEvent {
    /// A command line forwarded by a secondary invocation.
    CommandLine {
        /// Argument vector, program name first.
        arguments: Vec<String>,
        /// Where to send the outcome.
        reply: Sender<InvocationReply>,
    },
    /// A stage notification.
    Stage(StageEvent),
    /// A termination signal was received.
    Terminate {
        /// Signal number.
        signal: i32,
    },
}

/// Channel-backed loop.
#[derive(Debug)]
pub struct EventLoop {
    sender: Sender<LoopEvent>,
    receiver: Receiver<LoopEvent>,
    handle: LoopHandle,
}

impl EventLoop {
    /// Builds a loop with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            handle: LoopHandle::new(),
        }
    }

    /// Sender used by other threads to post events.
    #[must_use]
    pub fn sender(&self) -> Sender<LoopEvent> {
        self.sender.clone()
    }

    /// Stop handle handed to the controller.
    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Dispatches events until the controller stops the loop.
    pub fn run(&self, application: &SharedApplication) {
        info!(target: LOOP_TARGET, "event loop running");
        while !self.handle.is_stopped() {
            let Ok(event) = self.receiver.recv() else {
                break;
            };
            self.dispatch(application, event);
        }
        info!(target: LOOP_TARGET, "event loop stopped");
    }

    /// Dispatches a single event.
    ///
    /// A forwarded invocation without any arguments that succeeds against a
    /// running controller also activates it, revealing hidden stages.
    pub fn dispatch(&self, application: &SharedApplication, event: LoopEvent) {
        match event {
            LoopEvent::CommandLine { arguments, reply } => {
                let mut output = CommandOutput::new();
                let status = {
                    let mut application = application.borrow_mut();
                    let status = application.command_line(&arguments, &mut output);
                    if status == 0 && arguments.len() <= 1 && application.is_running() {
                        application.activate();
                    }
                    status
                };
                if reply.send(InvocationReply { status, output }).is_err() {
                    debug!(target: LOOP_TARGET, "invoker went away before the reply");
                }
            }
            LoopEvent::Stage(event) => application.borrow_mut().handle_stage_event(event),
            LoopEvent::Terminate { signal } => {
                info!(target: LOOP_TARGET, signal, "termination requested");
                singleton::request_quit_forced(&self.handle);
            }
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
