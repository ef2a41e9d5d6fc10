//! Shared configuration for the stagehand controller.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, a
//! configuration file, `STAGEHAND_*` environment variables, and finally the
//! leading command-line flags listed in [`CONFIG_CLI_FLAGS`]. The values here
//! only shape the process (telemetry, runtime directories, the settings
//! channel); per-invocation intent such as `--quit` is parsed separately by
//! the controller.

mod defaults;
mod logging;
mod runtime;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    APP_ID, DEFAULT_HANDOVER_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_SETTINGS_CHANNEL,
    default_handover_timeout_ms, default_log_filter, default_log_filter_string,
    default_log_format, default_settings_channel,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError, settings_directory};

/// Flags consumed by the configuration loader rather than the controller.
///
/// Keep in sync with the fields of [`Config`].
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--runtime-dir",
    "--settings-dir",
    "--settings-channel",
    "--handover-timeout-ms",
];

/// Process-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "STAGEHAND")]
pub struct Config {
    /// `tracing` filter expression, for example `info,stagehand::broker=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of the log subscriber.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Overrides the directory holding the lock, pid, state and socket files.
    #[serde(default)]
    pub runtime_dir: Option<Utf8PathBuf>,
    /// Overrides the directory backing the settings channel.
    #[serde(default)]
    pub settings_dir: Option<Utf8PathBuf>,
    /// Name of the settings channel opened during full initialization.
    #[serde(default = "default_settings_channel")]
    #[ortho_config(default = default_settings_channel())]
    pub settings_channel: String,
    /// How long a restarting invocation waits for the old primary to exit.
    #[serde(default = "default_handover_timeout_ms")]
    #[ortho_config(default = DEFAULT_HANDOVER_TIMEOUT_MS)]
    pub handover_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            runtime_dir: None,
            settings_dir: None,
            settings_channel: default_settings_channel(),
            handover_timeout_ms: DEFAULT_HANDOVER_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Filter expression handed to the log subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Runtime directory override, if any.
    #[must_use]
    pub fn runtime_dir(&self) -> Option<&Utf8Path> {
        self.runtime_dir.as_deref()
    }

    /// Settings directory override, if any.
    #[must_use]
    pub fn settings_dir(&self) -> Option<&Utf8Path> {
        self.settings_dir.as_deref()
    }

    /// Settings channel name.
    #[must_use]
    pub fn settings_channel(&self) -> &str {
        &self.settings_channel
    }

    /// Handover timeout as a [`std::time::Duration`].
    #[must_use]
    pub const fn handover_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.handover_timeout_ms)
    }
}
