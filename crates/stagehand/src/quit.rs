//! Quit sequencing.
//!
//! A quit either parks the instance (every stage hidden, loop untouched) or
//! terminates it (every stage destroyed, `quit` emitted, loop stopped).
//! Termination happens when the quit is forced or the instance is not a
//! daemon.

use tracing::debug;

use crate::collaborators::{MainLoop, StageRegistry};
use crate::signals::Signal;

const QUIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::controller");

/// Inputs of a single quit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuitRequest {
    /// Terminate even in daemon mode.
    pub force: bool,
    /// Current value of the daemon flag.
    pub daemonized: bool,
    /// Whether full initialization has completed.
    pub running: bool,
}

impl QuitRequest {
    /// Whether this quit destroys stages and ends the process.
    #[must_use]
    pub const fn should_terminate(self) -> bool {
        self.force || !self.daemonized
    }
}

/// What a quit did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuitOutcome {
    /// Stages were destroyed and `quit` was emitted.
    pub terminated: bool,
    /// Number of stages acted upon.
    pub stages: usize,
    /// The main loop was asked to stop.
    pub loop_stopped: bool,
}

/// Destroys or hides every live stage, then stops the loop when terminating.
///
/// The loop is only stopped once the controller is running; before that there
/// is no loop to stop and the caller simply returns.
pub fn sequence_quit(
    request: QuitRequest,
    stages: &mut dyn StageRegistry,
    main_loop: &dyn MainLoop,
    quit: &mut Signal<()>,
) -> QuitOutcome {
    let terminate = request.should_terminate();
    let live = stages.list_all();
    for id in &live {
        if terminate {
            stages.destroy(*id);
        } else {
            stages.hide(*id);
        }
    }
    debug!(
        target: QUIT_TARGET,
        force = request.force,
        daemonized = request.daemonized,
        terminate,
        stages = live.len(),
        "stages sequenced for quit"
    );

    let mut outcome = QuitOutcome {
        terminated: terminate,
        stages: live.len(),
        loop_stopped: false,
    };
    if !terminate {
        return outcome;
    }

    quit.emit(&());
    if request.running {
        main_loop.quit();
        outcome.loop_stopped = true;
    }
    outcome
}
