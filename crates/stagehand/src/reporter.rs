//! Structured reporting for controller lifecycle events.

use std::sync::Arc;

use crate::lifecycle::InitializationError;
use crate::quit::QuitOutcome;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked when the host runs the startup hook.
    fn startup(&self);

    /// Invoked before full initialization begins.
    fn initialization_starting(&self);

    /// Invoked once the controller reaches the running state.
    fn initialization_succeeded(&self);

    /// Invoked when full initialization fails.
    fn initialization_failed(&self, error: &InitializationError);

    /// Invoked after the quit sequencer has acted on every stage.
    fn quit_sequenced(&self, outcome: &QuitOutcome);

    /// Invoked whenever the daemon flag is assigned.
    fn daemon_mode_changed(&self, daemonized: bool);

    /// Invoked when a command line fails to parse.
    fn command_line_rejected(&self, error: &clap::Error);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn startup(&self) {
        (**self).startup();
    }

    fn initialization_starting(&self) {
        (**self).initialization_starting();
    }

    fn initialization_succeeded(&self) {
        (**self).initialization_succeeded();
    }

    fn initialization_failed(&self, error: &InitializationError) {
        (**self).initialization_failed(error);
    }

    fn quit_sequenced(&self, outcome: &QuitOutcome) {
        (**self).quit_sequenced(outcome);
    }

    fn daemon_mode_changed(&self, daemonized: bool) {
        (**self).daemon_mode_changed(daemonized);
    }

    fn command_line_rejected(&self, error: &clap::Error) {
        (**self).command_line_rejected(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn startup(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "startup",
            "application startup"
        );
    }

    fn initialization_starting(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "initialization_starting",
            "starting full initialization"
        );
    }

    fn initialization_succeeded(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "initialization_succeeded",
            "application is running"
        );
    }

    fn initialization_failed(&self, error: &InitializationError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "initialization_failed",
            error = %error,
            "full initialization failed"
        );
    }

    fn quit_sequenced(&self, outcome: &QuitOutcome) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "quit_sequenced",
            terminated = outcome.terminated,
            stages = outcome.stages,
            loop_stopped = outcome.loop_stopped,
            "quit sequenced"
        );
    }

    fn daemon_mode_changed(&self, daemonized: bool) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "daemon_mode_changed",
            daemonized,
            "daemon mode assigned"
        );
    }

    fn command_line_rejected(&self, error: &clap::Error) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "command_line_rejected",
            kind = ?error.kind(),
            "command line rejected"
        );
    }
}
