//! Lifecycle state machine guarding full initialization.
//!
//! The controller moves `Uninitialized → Initializing → Running` at most once
//! per process. A failure while initializing leaves the state at
//! `Initializing` with initialization still pending, so a later command line
//! may retry.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::collaborators::{
    SettingsChannel, SettingsError, StageError, StageId, StageRegistry, ViewKind, ViewRegistry,
};
use crate::reporter::LifecycleReporter;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Persistent lifecycle state of the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing has been initialized.
    #[default]
    Uninitialized,
    /// Full initialization started but has not completed.
    Initializing,
    /// Full initialization completed; terminal.
    Running,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Running => "running",
        };
        formatter.write_str(label)
    }
}

/// Errors raised by [`Lifecycle::initialize_full`].
#[derive(Debug, Error)]
pub enum InitializationError {
    /// The settings channel could not be opened.
    #[error("could not initialize settings: {source}")]
    Settings {
        /// Underlying channel error.
        #[from]
        source: SettingsError,
    },
    /// The primary stage could not be created.
    #[error("could not create the primary stage: {source}")]
    Stage {
        /// Underlying stage error.
        #[from]
        source: StageError,
    },
}

/// State machine plus the bookkeeping attached to it.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: LifecycleState,
    pending_init: bool,
    watched: BTreeSet<StageId>,
}

impl Lifecycle {
    /// Builds an uninitialized lifecycle with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether full initialization has completed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, LifecycleState::Running)
    }

    /// Whether the next command line must run full initialization.
    #[must_use]
    pub const fn pending_init(&self) -> bool {
        self.pending_init
    }

    /// Marks full initialization as pending.
    pub fn request_initialization(&mut self) {
        self.pending_init = true;
    }

    /// Whether notifications from `id` reach the controller.
    #[must_use]
    pub fn watches(&self, id: StageId) -> bool {
        self.watched.contains(&id)
    }

    /// Drops every stage subscription; used once stages are destroyed.
    pub fn forget_stages(&mut self) {
        self.watched.clear();
    }

    /// Performs full initialization unless the controller is already running.
    ///
    /// Opens the settings channel, registers the built-in views in order and
    /// creates one visible, fullscreen stage. If the stage cannot be created
    /// the views are unregistered and the settings channel is shut down again.
    pub fn initialize_full(
        &mut self,
        settings: &mut dyn SettingsChannel,
        views: &mut dyn ViewRegistry,
        stages: &mut dyn StageRegistry,
        reporter: &dyn LifecycleReporter,
    ) -> Result<(), InitializationError> {
        if self.is_running() {
            debug!(
                target: LIFECYCLE_TARGET,
                "full initialization skipped: already running"
            );
            self.pending_init = false;
            return Ok(());
        }

        self.state = LifecycleState::Initializing;
        reporter.initialization_starting();

        if let Err(source) = settings.init() {
            let error = InitializationError::from(source);
            reporter.initialization_failed(&error);
            return Err(error);
        }

        for kind in ViewKind::BUILT_IN {
            views.register(kind);
        }

        let stage = match stages.create() {
            Ok(stage) => stage,
            Err(source) => {
                views.clear();
                settings.shutdown();
                let error = InitializationError::from(source);
                reporter.initialization_failed(&error);
                return Err(error);
            }
        };
        stages.show(stage);
        stages.set_fullscreen(stage, true);
        self.watched.insert(stage);

        self.state = LifecycleState::Running;
        self.pending_init = false;
        reporter.initialization_succeeded();
        Ok(())
    }
}
