use crate::logging::LogFormat;

/// Application identity shared by every invocation.
pub const APP_ID: &str = "org.stagehand.Dashboard";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default settings channel name.
pub const DEFAULT_SETTINGS_CHANNEL: &str = "stagehand";

/// Default wait for the previous primary to release the lock on restart.
pub const DEFAULT_HANDOVER_TIMEOUT_MS: u64 = 5_000;

/// Default log filter expression.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value for serde defaults.
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Interactive sessions read compact lines more easily than JSON.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Owned settings channel name for serde defaults.
pub fn default_settings_channel() -> String {
    DEFAULT_SETTINGS_CHANNEL.to_owned()
}

/// Handover timeout for serde defaults.
pub fn default_handover_timeout_ms() -> u64 {
    DEFAULT_HANDOVER_TIMEOUT_MS
}
