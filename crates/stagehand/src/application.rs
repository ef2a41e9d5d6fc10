//! The application controller.
//!
//! [`Application`] owns the lifecycle, the daemon flag and the collaborators,
//! and implements the host hooks. Every command line, local or forwarded,
//! ends up in [`Application::arbitrate`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use stagehand_config::APP_ID;

use crate::cli::{ParseOutcome, parse_intent};
use crate::collaborators::{Collaborators, StageEvent};
use crate::disposition::Disposition;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::output::CommandOutput;
use crate::quit::{QuitRequest, sequence_quit};
use crate::reporter::LifecycleReporter;
use crate::signals::{ApplicationSignals, HandlerId};

const CONTROLLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::controller");

/// Extension points the host calls into.
pub trait ApplicationHooks {
    /// Runs once before the first command line is delivered.
    fn startup(&mut self);

    /// Brings the instance to the foreground.
    fn activate(&mut self);

    /// Handles one command line and returns the exit status for its invoker.
    fn command_line(&mut self, arguments: &[String], output: &mut CommandOutput) -> i32;
}

/// Single-instance application controller.
pub struct Application {
    application_id: String,
    lifecycle: Lifecycle,
    daemonized: bool,
    collaborators: Collaborators,
    signals: ApplicationSignals,
    reporter: Arc<dyn LifecycleReporter>,
}

impl Application {
    /// Builds a controller identified by [`APP_ID`].
    #[must_use]
    pub fn new(collaborators: Collaborators, reporter: Arc<dyn LifecycleReporter>) -> Self {
        Self {
            application_id: APP_ID.to_owned(),
            lifecycle: Lifecycle::new(),
            daemonized: false,
            collaborators,
            signals: ApplicationSignals::default(),
            reporter,
        }
    }

    /// Identity used for single-instance registration.
    #[must_use]
    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// Command lines are always routed to the primary's controller.
    #[must_use]
    pub const fn handles_command_line(&self) -> bool {
        true
    }

    /// The `daemonized` property.
    #[must_use]
    pub const fn daemonized(&self) -> bool {
        self.daemonized
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether full initialization has completed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Whether the next command line will run full initialization.
    #[must_use]
    pub const fn pending_initialization(&self) -> bool {
        self.lifecycle.pending_init()
    }

    /// Connects a handler to the `quit` notification.
    pub fn connect_quit(&mut self, mut handler: impl FnMut() + 'static) -> HandlerId {
        self.signals.quit.connect(move |()| handler())
    }

    /// Disconnects a `quit` handler.
    pub fn disconnect_quit(&mut self, id: HandlerId) -> bool {
        self.signals.quit.disconnect(id)
    }

    /// Connects a handler to `daemonized` change notifications.
    pub fn connect_daemonized_changed(
        &mut self,
        mut handler: impl FnMut(bool) + 'static,
    ) -> HandlerId {
        self.signals
            .daemonized_changed
            .connect(move |daemonized| handler(*daemonized))
    }

    /// Disconnects a `daemonized` handler.
    pub fn disconnect_daemonized_changed(&mut self, id: HandlerId) -> bool {
        self.signals.daemonized_changed.disconnect(id)
    }

    /// Arbitrates one command line.
    ///
    /// A forced quit of the running instance happens before the daemon flag
    /// is assigned, so the quit is evaluated against the previous mode.
    pub fn arbitrate(&mut self, arguments: &[String], output: &mut CommandOutput) -> Disposition {
        let intent = match parse_intent(arguments) {
            Ok(ParseOutcome::Intent(intent)) => intent,
            Ok(ParseOutcome::Informational(text)) => {
                output.stdout(text);
                return Disposition::Success;
            }
            Err(error) => {
                self.reporter.command_line_rejected(&error);
                output.stderr(error.render().to_string());
                return Disposition::Failed;
            }
        };
        debug!(
            target: CONTROLLER_TARGET,
            daemonize = intent.daemonize,
            replace = intent.replace,
            quit = intent.quit,
            "command line parsed"
        );

        if intent.replace || intent.quit {
            self.quit(true);
        }

        self.set_daemonized(intent.daemonize);

        if intent.quit {
            return Disposition::SuccessAndQuit;
        }

        if intent.replace {
            self.lifecycle.request_initialization();
        }

        if self.lifecycle.pending_init() {
            let Collaborators {
                settings,
                views,
                stages,
                ..
            } = &mut self.collaborators;
            if let Err(error) = self.lifecycle.initialize_full(
                settings.as_mut(),
                views.as_mut(),
                stages.as_mut(),
                self.reporter.as_ref(),
            ) {
                output.stderr(format!("error: {error}\n"));
                return Disposition::Failed;
            }
        }

        if intent.replace {
            Disposition::SuccessAndRestart
        } else {
            Disposition::Success
        }
    }

    /// Quits the instance.
    ///
    /// Stages are destroyed and the loop stopped when `force` is set or the
    /// instance is not a daemon; otherwise stages are only hidden.
    pub fn quit(&mut self, force: bool) {
        let request = QuitRequest {
            force,
            daemonized: self.daemonized,
            running: self.lifecycle.is_running(),
        };
        let outcome = sequence_quit(
            request,
            self.collaborators.stages.as_mut(),
            self.collaborators.main_loop.as_ref(),
            &mut self.signals.quit,
        );
        if outcome.terminated {
            self.lifecycle.forget_stages();
        }
        self.reporter.quit_sequenced(&outcome);
    }

    /// Reacts to a notification raised by a stage.
    pub fn handle_stage_event(&mut self, event: StageEvent) {
        let stage = event.stage();
        if !self.lifecycle.watches(stage) {
            debug!(
                target: CONTROLLER_TARGET,
                stage = %stage,
                "ignoring notification from unwatched stage"
            );
            return;
        }
        match event {
            StageEvent::CloseRequested(_) => {
                info!(target: CONTROLLER_TARGET, stage = %stage, "stage close requested");
            }
            StageEvent::Unfullscreened(_) => {
                info!(target: CONTROLLER_TARGET, stage = %stage, "stage left fullscreen");
                self.collaborators.stages.set_fullscreen(stage, true);
            }
        }
        self.quit(false);
    }

    /// Releases the view registry and the settings channel.
    pub fn dispose(&mut self) {
        self.collaborators.views.clear();
        self.collaborators.settings.shutdown();
        debug!(target: CONTROLLER_TARGET, "application disposed");
    }

    fn set_daemonized(&mut self, daemonized: bool) {
        self.daemonized = daemonized;
        self.reporter.daemon_mode_changed(daemonized);
        self.signals.daemonized_changed.emit(&daemonized);
    }
}

impl ApplicationHooks for Application {
    fn startup(&mut self) {
        self.lifecycle.request_initialization();
        self.reporter.startup();
    }

    fn activate(&mut self) {
        for id in self.collaborators.stages.list_all() {
            self.collaborators.stages.show(id);
        }
    }

    fn command_line(&mut self, arguments: &[String], output: &mut CommandOutput) -> i32 {
        self.arbitrate(arguments, output).exit_status()
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Application")
            .field("application_id", &self.application_id)
            .field("lifecycle", &self.lifecycle)
            .field("daemonized", &self.daemonized)
            .field("collaborators", &self.collaborators)
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}
