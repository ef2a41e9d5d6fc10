//! Command-line flags understood by the controller.
//!
//! Every invocation, local or forwarded from a secondary process, is parsed
//! here into an [`InvocationIntent`]. Process-level options (log filter,
//! runtime directory and so on) are stripped beforehand by the configuration
//! loader.

use clap::Parser;
use clap::error::ErrorKind;

/// Flags accepted on every invocation.
#[derive(Parser, Debug)]
#[command(
    name = "stagehand",
    version,
    about = "Full-screen dashboard that keeps one instance per session"
)]
pub(crate) struct Cli {
    /// Keep running in the background when every stage is hidden.
    #[arg(short = 'd', long)]
    pub(crate) daemonize: bool,
    /// Replace the running instance with this one.
    #[arg(short = 'r', long)]
    pub(crate) restart: bool,
    /// Quit the running instance.
    #[arg(short = 'q', long)]
    pub(crate) quit: bool,
}

/// Normalised flags of a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationIntent {
    /// Survive the last stage being hidden.
    pub daemonize: bool,
    /// Force-quit the running instance and initialize this one.
    pub replace: bool,
    /// Force-quit the running instance without initializing.
    pub quit: bool,
    /// Raw argument vector, program name included.
    pub arguments: Vec<String>,
}

/// Result of parsing that did not produce an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Flags to act upon.
    Intent(InvocationIntent),
    /// `--help` or `--version` output; nothing to act upon.
    Informational(String),
}

/// Parses an argument vector, program name first.
///
/// Help and version requests are not errors: their rendered text is returned
/// as [`ParseOutcome::Informational`].
pub fn parse_intent(arguments: &[String]) -> Result<ParseOutcome, clap::Error> {
    match Cli::try_parse_from(arguments) {
        Ok(cli) => Ok(ParseOutcome::Intent(InvocationIntent {
            daemonize: cli.daemonize,
            replace: cli.restart,
            quit: cli.quit,
            arguments: arguments.to_vec(),
        })),
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Ok(ParseOutcome::Informational(error.render().to_string()))
        }
        Err(error) => Err(error),
    }
}
