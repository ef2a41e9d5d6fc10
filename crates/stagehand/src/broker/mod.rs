//! Single-instance broker.
//!
//! The process holding the exclusive lock on the lock file in the runtime
//! directory is the primary: it records its pid, publishes a state snapshot
//! and listens on the instance socket. Later invocations find the lock held,
//! forward their argument vector over the socket and exit with the status it
//! returns.

mod errors;
mod guard;
mod listener;
mod protocol;
mod remote;
mod state;

pub use errors::{BrokerError, ListenerError};
pub use guard::{InstanceGuard, Registration, register, wait_for_release};
pub use listener::{BrokerListener, ConnectionHandler, ForwardingHandler, ListenerHandle};
pub use protocol::{Forwarded, Request, Response, relay_responses, responses_for, write_message};
pub use remote::{CONNECTION_TIMEOUT, connect, forward};
pub use state::{InstanceStatus, StateRecorder, StateSnapshot};

pub(crate) const BROKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::broker");
