//! Single-instance application controller for the stagehand dashboard.
//!
//! Exactly one primary instance runs per user session. Every later invocation
//! forwards its argument vector to the primary, whose [`Application`] decides
//! what happens: initialize fully, wake up, replace the running instance or
//! quit it. The decision comes back as a [`Disposition`] and becomes the exit
//! status of the invoking process.
//!
//! The controller never owns presentation surfaces. It drives stages, views
//! and the settings channel through the traits in [`collaborators`], so the
//! decision logic can be exercised without a display.
//!
//! Shutdown depends on the daemon flag negotiated by the latest command line:
//! a daemon only hides its stages when asked to quit, while an interactive
//! instance destroys them and stops its event loop. `--quit` and `--restart`
//! always terminate.

mod application;
pub mod broker;
mod cli;
pub mod collaborators;
mod disposition;
mod event_loop;
mod lifecycle;
mod output;
mod process;
mod quit;
mod reporter;
mod signals;
pub mod singleton;
mod telemetry;

pub use application::{Application, ApplicationHooks};
pub use cli::{InvocationIntent, ParseOutcome, parse_intent};
pub use disposition::Disposition;
pub use event_loop::{EventLoop, InvocationReply, LoopEvent};
pub use lifecycle::{InitializationError, Lifecycle, LifecycleState};
pub use output::{CommandOutput, OutputChunk, StreamTarget};
pub use process::{AppError, ShutdownError, SignalForwarder, TERMINATION_SIGNALS, run};
pub use quit::{QuitOutcome, QuitRequest, sequence_quit};
pub use reporter::{LifecycleReporter, StructuredLifecycleReporter};
pub use signals::{ApplicationSignals, HandlerId, Signal};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
