//! Diagnostics for every stagehand invocation.
//!
//! Both roles log through the same subscriber: a primary logs its lifecycle
//! and broker traffic, a forwarding invocation logs registration and relay.
//! Diagnostics always go to stderr because stdout carries the output the
//! primary relays back for the invocation.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, debug, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use stagehand_config::{Config, LogFormat};

/// Format of the subscriber installed by the first invocation in this process.
static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Describes the subscriber an invocation logs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
    installed_now: bool,
}

impl TelemetryHandle {
    /// Format of the active subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }

    /// Whether this call installed the subscriber.
    #[must_use]
    pub const fn installed_now(self) -> bool {
        self.installed_now
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The `--log-filter` directive does not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another subscriber was already installed globally.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on the first call in this process.
///
/// A remote that takes over after a restart or a shutdown runs `launch` a
/// second time in the same process; it keeps logging through the subscriber
/// it already has, and a different configured format is only noted.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let mut installed_now = false;
    let format = *INSTALLED_FORMAT.get_or_try_init(|| {
        let subscriber = build_subscriber(config)?;
        tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
        installed_now = true;
        Ok::<_, TelemetryError>(config.log_format())
    })?;
    if format != config.log_format() {
        debug!(
            installed = ?format,
            requested = ?config.log_format(),
            "telemetry already installed; keeping the existing format"
        );
    }
    Ok(TelemetryHandle {
        format,
        installed_now,
    })
}

fn build_subscriber(config: &Config) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let stderr_is_terminal = io::stderr().is_terminal();
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_timer(UtcTime::rfc_3339());

    Ok(match config.log_format() {
        // JSON lines are read by tools, never a terminal.
        LogFormat::Json => Box::new(builder.with_ansi(false).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.with_ansi(stderr_is_terminal).compact().finish()),
    })
}
