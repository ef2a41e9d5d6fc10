use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked handles: the log subscriber and the listener threads share stderr
    // for the whole lifetime of a primary.
    stagehand::run(std::env::args_os(), &mut io::stdout(), &mut io::stderr())
}
