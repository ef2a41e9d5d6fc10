use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::event_loop::{InvocationReply, LoopEvent};
use crate::output::CommandOutput;

use super::BROKER_TARGET;
use super::errors::ListenerError;
use super::protocol::{
    Request, Response, parse_request, read_request_line, responses_for, write_message,
};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: UnixStream);
}

/// Posts forwarded command lines to the event loop and writes the reply back.
#[derive(Debug, Clone)]
pub struct ForwardingHandler {
    events: Sender<LoopEvent>,
}

impl ForwardingHandler {
    /// Builds a handler posting to `events`.
    #[must_use]
    pub fn new(events: Sender<LoopEvent>) -> Self {
        Self { events }
    }

    /// Posts the command line and waits for its reply; `None` once the
    /// event loop has stopped.
    fn dispatch(&self, arguments: Vec<String>) -> Option<InvocationReply> {
        let (reply, response) = mpsc::channel();
        self.events
            .send(LoopEvent::CommandLine { arguments, reply })
            .ok()?;
        response.recv().ok()
    }
}

impl ConnectionHandler for ForwardingHandler {
    fn handle(&self, mut stream: UnixStream) {
        if let Err(error) = stream.set_read_timeout(Some(REQUEST_TIMEOUT)) {
            warn!(target: BROKER_TARGET, error = %error, "failed to set request timeout");
        }
        let line = match read_request_line(&mut stream) {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(error) => {
                warn!(target: BROKER_TARGET, error = %error, "failed to read request");
                return;
            }
        };
        let responses = match parse_request(&line) {
            Ok(Request::CommandLine { arguments }) => {
                debug!(
                    target: BROKER_TARGET,
                    arguments = arguments.len(),
                    "forwarded command line received"
                );
                match self.dispatch(arguments) {
                    Some(reply) => responses_for(reply.status, &reply.output),
                    None => {
                        info!(
                            target: BROKER_TARGET,
                            "event loop stopped; sending the invocation back"
                        );
                        vec![Response::ShuttingDown]
                    }
                }
            }
            Err(error) => {
                let mut output = CommandOutput::new();
                output.stderr(format!("error: malformed request: {error}\n"));
                responses_for(1, &output)
            }
        };
        for message in responses {
            if let Err(error) = write_message(&mut stream, &message) {
                warn!(target: BROKER_TARGET, error = %error, "failed to write response");
                return;
            }
        }
    }
}

/// Listener bound to the instance socket.
#[derive(Debug)]
pub struct BrokerListener {
    path: PathBuf,
    listener: UnixListener,
}

impl BrokerListener {
    /// Binds the socket, replacing a stale socket file left by a dead primary.
    pub fn bind(path: &Path) -> Result<Self, ListenerError> {
        let listener = bind_unix(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            listener,
        })
    }

    /// Starts accepting connections on a background thread.
    pub fn start(self, handler: Arc<dyn ConnectionHandler>) -> Result<ListenerHandle, ListenerError> {
        if let Err(source) = self.listener.set_nonblocking(true) {
            cleanup_socket(&self.path);
            return Err(ListenerError::NonBlocking { source });
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || run_accept_loop(&self, &shutdown_flag, &handler));
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop and its in-flight connections to finish.
    pub fn join(mut self) -> Result<(), ListenerError> {
        self.shutdown();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &BrokerListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
) {
    info!(
        target: BROKER_TARGET,
        socket = %listener.path.display(),
        "instance socket listening"
    );
    let mut connections: Vec<JoinHandle<()>> = Vec::new();
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some(stream)) => {
                last_error = None;
                connections.retain(|connection| !connection.is_finished());
                let handler = Arc::clone(handler);
                connections.push(thread::spawn(move || handler.handle(stream)));
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(target: BROKER_TARGET, error = %error, "socket accept error");
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    for connection in connections {
        if connection.join().is_err() {
            warn!(target: BROKER_TARGET, "connection handler panicked");
        }
    }
    cleanup_socket(&listener.path);
}

fn accept_connection(listener: &UnixListener) -> io::Result<Option<UnixStream>> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
                path: path.display().to_string(),
                source,
            })?;
        if !metadata.file_type().is_socket() {
            return Err(ListenerError::UnixNotSocket {
                path: path.display().to_string(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ListenerError::UnixInUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(ListenerError::UnixConnect {
                    path: path.display().to_string(),
                    source,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}

fn cleanup_socket(path: &Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: BROKER_TARGET,
            error = %error,
            path = %path.display(),
            "failed to remove unix socket file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::protocol::{Forwarded, relay_responses};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use tempfile::TempDir;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ConnectionHandler for CountingHandler {
        fn handle(&self, _stream: UnixStream) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if count.load(Ordering::SeqCst) >= expected {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn listener_accepts_and_cleans_up() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("stagehand.sock");
        let count = Arc::new(AtomicUsize::new(0));
        let handle = BrokerListener::bind(&path)
            .expect("bind")
            .start(Arc::new(CountingHandler {
                count: Arc::clone(&count),
            }))
            .expect("start");

        UnixStream::connect(&path).expect("first client");
        UnixStream::connect(&path).expect("second client");

        assert!(wait_for_count(&count, 2), "expected two connections");
        handle.join().expect("join listener");
        assert!(!path.exists(), "socket should be removed on shutdown");
    }

    #[test]
    fn stale_socket_files_are_replaced() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("stagehand.sock");
        {
            let _stale = UnixListener::bind(&path).expect("bind stale listener");
        }
        assert!(path.exists(), "stale socket should remain");

        let listener = BrokerListener::bind(&path).expect("bind over stale socket");
        drop(listener);
    }

    #[test]
    fn live_sockets_are_not_stolen() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("stagehand.sock");
        let _existing = UnixListener::bind(&path).expect("bind existing listener");

        let error = BrokerListener::bind(&path).expect_err("bind should fail");
        assert!(matches!(error, ListenerError::UnixInUse { .. }));
    }

    #[test]
    fn forwarding_handler_relays_the_loop_reply() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("stagehand.sock");
        let (events, receiver) = mpsc::channel();
        let handle = BrokerListener::bind(&path)
            .expect("bind")
            .start(Arc::new(ForwardingHandler::new(events)))
            .expect("start");
        let responder = thread::spawn(move || {
            let Ok(LoopEvent::CommandLine { arguments, reply }) = receiver.recv() else {
                panic!("expected a command line event");
            };
            let mut output = CommandOutput::new();
            output.stdout(format!("{}\n", arguments.join(" ")));
            reply
                .send(InvocationReply { status: 3, output })
                .expect("send reply");
        });

        let mut client = UnixStream::connect(&path).expect("connect");
        write_message(
            &mut client,
            &Request::CommandLine {
                arguments: vec![String::from("stagehand"), String::from("-q")],
            },
        )
        .expect("send request");
        let mut stdout = Vec::new();
        let status =
            relay_responses(&mut client, &mut stdout, &mut Vec::new()).expect("relay reply");

        responder.join().expect("responder thread");
        handle.join().expect("join listener");
        assert_eq!(status, Forwarded::Exit(3));
        assert_eq!(stdout, b"stagehand -q\n");
    }

    #[test]
    fn stopped_loop_sends_the_invocation_back() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("stagehand.sock");
        let (events, receiver) = mpsc::channel();
        drop(receiver);
        let handle = BrokerListener::bind(&path)
            .expect("bind")
            .start(Arc::new(ForwardingHandler::new(events)))
            .expect("start");

        let mut client = UnixStream::connect(&path).expect("connect");
        write_message(
            &mut client,
            &Request::CommandLine {
                arguments: vec![String::from("stagehand")],
            },
        )
        .expect("send request");
        let mut stderr = Vec::new();
        let outcome =
            relay_responses(&mut client, &mut Vec::new(), &mut stderr).expect("relay reply");

        handle.join().expect("join listener");
        assert_eq!(outcome, Forwarded::ShuttingDown);
        assert!(stderr.is_empty(), "nothing should be printed: {stderr:?}");
    }

    #[test]
    fn reply_dropped_by_a_stopping_loop_is_not_arbitrated() {
        let (events, receiver) = mpsc::channel();
        let handler = ForwardingHandler::new(events);
        let stopping = thread::spawn(move || drop(receiver.recv().expect("event")));

        assert!(handler.dispatch(vec![String::from("stagehand")]).is_none());
        stopping.join().expect("loop thread");
    }
}
