//! Test double for [`LifecycleReporter`] that records structured events for assertions.

use std::sync::Mutex;

use crate::lifecycle::InitializationError;
use crate::quit::QuitOutcome;
use crate::reporter::LifecycleReporter;

/// Structured lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Startup,
    InitializationStarting,
    InitializationSucceeded,
    InitializationFailed(String),
    QuitSequenced(QuitOutcome),
    DaemonModeChanged(bool),
    CommandLineRejected,
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn startup(&self) {
        self.record(LifecycleEvent::Startup);
    }

    fn initialization_starting(&self) {
        self.record(LifecycleEvent::InitializationStarting);
    }

    fn initialization_succeeded(&self) {
        self.record(LifecycleEvent::InitializationSucceeded);
    }

    fn initialization_failed(&self, error: &InitializationError) {
        self.record(LifecycleEvent::InitializationFailed(error.to_string()));
    }

    fn quit_sequenced(&self, outcome: &QuitOutcome) {
        self.record(LifecycleEvent::QuitSequenced(*outcome));
    }

    fn daemon_mode_changed(&self, daemonized: bool) {
        self.record(LifecycleEvent::DaemonModeChanged(daemonized));
    }

    fn command_line_rejected(&self, _error: &clap::Error) {
        self.record(LifecycleEvent::CommandLineRejected);
    }
}
