//! Error surface of the single-instance broker.

use std::io;
use std::path::PathBuf;
use std::time::SystemTimeError;

use nix::errno::Errno;
use thiserror::Error;

/// Errors raised while registering, forwarding or handing over.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Opening the lock file failed.
    #[error("failed to open lock file '{path}': {source}")]
    LockCreate {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Taking the exclusive lock failed for a reason other than contention.
    #[error("failed to lock '{path}': {source}")]
    LockAcquire {
        /// Lock file path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Writing the PID file failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the state snapshot failed.
    #[error("failed to write state snapshot '{path}': {source}")]
    StateWrite {
        /// State file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Serialising a snapshot or request failed.
    #[error("failed to serialise message: {source}")]
    Serialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// Obtaining the current timestamp failed.
    #[error("failed to read system time: {source}")]
    Clock {
        /// Underlying system time error.
        #[source]
        source: SystemTimeError,
    },
    /// Connecting to the primary failed.
    #[error("failed to connect to the running instance at '{path}': {source}")]
    Connect {
        /// Socket path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Sending the command line to the primary failed.
    #[error("failed to send the command line: {source}")]
    SendRequest {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading the primary's response failed.
    #[error("failed to read the response: {source}")]
    ReadResponse {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The primary sent a line that is not a protocol message.
    #[error("malformed response from the running instance: {source}")]
    ParseMessage {
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing forwarded output to the local terminal failed.
    #[error("failed to forward output: {source}")]
    ForwardOutput {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The primary closed the connection without an exit status.
    #[error("the running instance closed the connection without an exit status")]
    MissingExit,
    /// The old primary did not release the lock in time.
    #[error("timed out after {timeout_ms} ms waiting for the running instance to exit")]
    HandoverTimeout {
        /// Configured budget.
        timeout_ms: u128,
    },
}

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        #[source]
        source: io::Error,
    },
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("existing unix socket {path} is already in use")]
    UnixInUse { path: String },
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket { path: String },
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("listener thread panicked")]
    ThreadPanic,
}
