use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use socket2::{Domain, SockAddr, Socket, Type};
use tracing::debug;

use super::BROKER_TARGET;
use super::errors::BrokerError;
use super::protocol::{Forwarded, Request, relay_responses, write_message};

/// Budget for reaching a primary that has registered but not yet bound.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Forwards `arguments` to the primary and relays its output.
///
/// Returns the exit status the primary assigned to the invocation, or
/// [`Forwarded::ShuttingDown`] when the primary was exiting and never
/// arbitrated it.
pub fn forward<W, E>(
    socket: &Path,
    arguments: &[String],
    stdout: &mut W,
    stderr: &mut E,
) -> Result<Forwarded, BrokerError>
where
    W: Write,
    E: Write,
{
    let mut connection = connect(socket, CONNECTION_TIMEOUT)?;
    let request = Request::CommandLine {
        arguments: arguments.to_vec(),
    };
    write_message(&mut connection, &request)
        .map_err(|source| BrokerError::SendRequest { source })?;
    debug!(
        target: BROKER_TARGET,
        socket = %socket.display(),
        "command line forwarded to the running instance"
    );
    relay_responses(&mut connection, stdout, stderr)
}

/// Connects to the instance socket, retrying while the primary is binding.
pub fn connect(path: &Path, timeout: Duration) -> Result<UnixStream, BrokerError> {
    let deadline = Instant::now() + timeout;
    loop {
        match connect_unix(path, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) if is_not_listening(&error) && Instant::now() < deadline => {
                thread::sleep(RETRY_INTERVAL);
            }
            Err(source) => {
                return Err(BrokerError::Connect {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
}

fn connect_unix(path: &Path, timeout: Duration) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, timeout)?;
    Ok(UnixStream::from(OwnedFd::from(socket)))
}

fn is_not_listening(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
    )
}
