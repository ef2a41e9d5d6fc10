//! Unified error surface of the process entry point.

use std::io;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use stagehand_config::RuntimePathsError;

use crate::broker::{BrokerError, ListenerError};
use crate::telemetry::TelemetryError;

use super::shutdown::ShutdownError;

/// Errors that end the process before or around the event loop.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The runtime directory could not be prepared.
    #[error(transparent)]
    RuntimePaths(#[from] RuntimePathsError),
    /// Registering, forwarding or handing over failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),
    /// The instance socket could not be served.
    #[error("instance socket listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
    /// Signal forwarding could not be installed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// Writing the invocation's own output failed.
    #[error("failed to write output: {source}")]
    Output {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<Arc<OrthoError>> for AppError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<ListenerError> for AppError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}
