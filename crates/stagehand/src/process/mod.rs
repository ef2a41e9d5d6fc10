//! Process entry: configuration, registration and the primary's lifetime.

mod arguments;
mod errors;
mod shutdown;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use tracing::{debug, info, warn};

use stagehand_config::{Config, RuntimePaths};

use crate::application::{Application, ApplicationHooks};
use crate::broker::{
    self, BrokerError, BrokerListener, Forwarded, ForwardingHandler, InstanceGuard,
    InstanceStatus, Registration, StateRecorder,
};
use crate::collaborators::Collaborators;
use crate::disposition::Disposition;
use crate::event_loop::EventLoop;
use crate::output::CommandOutput;
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};
use crate::singleton;
use crate::telemetry;

use self::arguments::{controller_arguments, split_config_arguments};

pub use errors::AppError;
pub use shutdown::{ShutdownError, SignalForwarder, TERMINATION_SIGNALS};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Runs one invocation of the program.
///
/// The process either becomes the primary instance and runs the event loop,
/// or forwards its arguments to the primary and exits with the status the
/// primary assigned. A remote that replaced the primary, or that reached a
/// primary already on its way out, waits for the old primary to exit and
/// takes over.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match launch(&args, stdout, stderr) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            let _ = writeln!(stderr, "error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn launch<W, E>(args: &[OsString], stdout: &mut W, stderr: &mut E) -> Result<ExitCode, AppError>
where
    W: Write,
    E: Write,
{
    let split = split_config_arguments(args);
    let config = Config::load_from_iter(split.config_arguments.iter().cloned())?;
    let telemetry = telemetry::initialise(&config)?;
    debug!(
        target: PROCESS_TARGET,
        format = %telemetry.format(),
        installed = telemetry.installed_now(),
        "telemetry ready"
    );
    let arguments = controller_arguments(args, &split);
    let paths = RuntimePaths::from_config(&config)?;

    let guard = match broker::register(&paths)? {
        Registration::Primary(guard) => guard,
        Registration::Remote { pid } => {
            info!(target: PROCESS_TARGET, pid = ?pid, "forwarding to the running instance");
            match broker::forward(paths.socket_path(), &arguments, stdout, stderr) {
                Ok(Forwarded::Exit(status))
                    if Disposition::from_exit_status(status)
                        != Some(Disposition::SuccessAndRestart) =>
                {
                    return Ok(exit_code_from_status(status));
                }
                Ok(Forwarded::Exit(_)) => info!(
                    target: PROCESS_TARGET,
                    pid = ?pid,
                    "running instance replaced; waiting for it to exit"
                ),
                Ok(Forwarded::ShuttingDown) => info!(
                    target: PROCESS_TARGET,
                    pid = ?pid,
                    "running instance is exiting; waiting to take over"
                ),
                Err(BrokerError::Connect { path, source }) => info!(
                    target: PROCESS_TARGET,
                    pid = ?pid,
                    socket = %path.display(),
                    error = %source,
                    "running instance is not listening; waiting to take over"
                ),
                Err(error) => return Err(error.into()),
            }
            broker::wait_for_release(&paths, config.handover_timeout())?
        }
    };

    run_primary(&config, guard, &arguments, stdout, stderr)
}

fn run_primary<W, E>(
    config: &Config,
    guard: InstanceGuard,
    arguments: &[String],
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError>
where
    W: Write,
    E: Write,
{
    let state = StateRecorder::new(guard.paths().state_path(), guard.pid());
    record(&state, InstanceStatus::Starting);

    let event_loop = EventLoop::new();
    let listener = BrokerListener::bind(guard.paths().socket_path())?
        .start(Arc::new(ForwardingHandler::new(event_loop.sender())))?;
    let signals = SignalForwarder::install(event_loop.sender())?;

    let reporter: Arc<dyn LifecycleReporter> = Arc::new(StructuredLifecycleReporter::new());
    let application = singleton::get_default_with(|| {
        Application::new(
            Collaborators::headless(config, event_loop.handle()),
            reporter,
        )
    });
    {
        let mut application = application.borrow_mut();
        let on_daemonized = state.clone();
        application.connect_daemonized_changed(move |daemonized| {
            if let Err(error) = on_daemonized.record_daemonized(daemonized) {
                warn!(target: PROCESS_TARGET, error = %error, "failed to record daemon mode");
            }
        });
        let on_quit = state.clone();
        application.connect_quit(move || record(&on_quit, InstanceStatus::Stopping));
        application.startup();
    }

    let mut output = CommandOutput::new();
    let status = application
        .borrow_mut()
        .command_line(arguments, &mut output);
    let replayed = output.replay(stdout, stderr);

    let running = application.borrow().is_running();
    if running && !event_loop.handle().is_stopped() {
        record(&state, InstanceStatus::Running);
        event_loop.run(&application);
    }

    drop(application);
    singleton::dispose();
    signals.close();
    drop(event_loop);
    listener.join()?;
    drop(guard);
    info!(target: PROCESS_TARGET, status, "primary instance exiting");

    replayed.map_err(|source| AppError::Output { source })?;
    Ok(exit_code_from_status(status))
}

fn record(state: &StateRecorder, status: InstanceStatus) {
    if let Err(error) = state.record_status(status) {
        warn!(target: PROCESS_TARGET, error = %error, "failed to record instance state");
    }
}

fn exit_code_from_status(status: i32) -> ExitCode {
    u8::try_from(status).map_or(ExitCode::FAILURE, ExitCode::from)
}
