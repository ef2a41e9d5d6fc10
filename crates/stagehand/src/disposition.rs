//! Outcome of arbitrating a single command line.

use std::fmt;
use std::process::ExitCode;

/// Normalised result of one `command-line` delivery.
///
/// Each variant maps to a distinct exit status so a wrapper script can tell
/// "the arguments were rejected" apart from "the instance is now gone".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// The invocation was handled and the instance keeps running.
    Success,
    /// The arguments were rejected or initialization failed.
    Failed,
    /// The running instance was replaced; this process is the new primary.
    SuccessAndRestart,
    /// The running instance was told to quit.
    SuccessAndQuit,
}

impl Disposition {
    /// Exit status reported to the invoking process.
    #[must_use]
    pub const fn exit_status(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::SuccessAndRestart => 2,
            Self::SuccessAndQuit => 3,
        }
    }

    /// Reverse of [`Disposition::exit_status`]; unknown statuses map to `None`.
    #[must_use]
    pub const fn from_exit_status(status: i32) -> Option<Self> {
        match status {
            0 => Some(Self::Success),
            1 => Some(Self::Failed),
            2 => Some(Self::SuccessAndRestart),
            3 => Some(Self::SuccessAndQuit),
            _ => None,
        }
    }

    /// Whether the disposition reports success of any kind.
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl From<Disposition> for ExitCode {
    fn from(disposition: Disposition) -> Self {
        match u8::try_from(disposition.exit_status()) {
            Ok(status) => Self::from(status),
            Err(_) => Self::FAILURE,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => formatter.write_str("success"),
            Self::Failed => formatter.write_str("failed"),
            Self::SuccessAndRestart => formatter.write_str("restart"),
            Self::SuccessAndQuit => formatter.write_str("quit"),
        }
    }
}
