use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, info, warn};

use stagehand_config::RuntimePaths;

use super::BROKER_TARGET;
use super::errors::BrokerError;

/// How long a remote waits for a freshly locked primary to publish its pid.
const STARTUP_GRACE: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MAX_LOCK_ATTEMPTS: usize = 3;

/// Outcome of registering the application identity.
#[derive(Debug)]
pub enum Registration {
    /// This process owns the identity.
    Primary(InstanceGuard),
    /// Another process holds the identity lock.
    Remote {
        /// PID published by the primary, if it has written one yet.
        pid: Option<u32>,
    },
}

/// An exclusive `flock` on the lock file plus the pid file next to it.
///
/// The kernel releases the lock when the holder exits, so a lock file left
/// behind by a crashed primary never blocks a new one. Dropping the guard
/// removes the runtime files before the lock is released.
#[derive(Debug)]
pub struct InstanceGuard {
    paths: RuntimePaths,
    _lock: Flock<File>,
    pid: u32,
}

impl InstanceGuard {
    /// PID written to the pid file.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Runtime artefact paths guarded by this instance.
    #[must_use]
    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    fn write_pid(&self) -> Result<(), BrokerError> {
        let path = self.paths.pid_path();
        let pid_error = |source| BrokerError::PidWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path).map_err(pid_error)?;
        writeln!(file, "{}", self.pid).map_err(pid_error)?;
        file.sync_all().map_err(pid_error)?;
        info!(
            target: BROKER_TARGET,
            pid = self.pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(())
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        // The lock file is unlinked while still locked; `register` rejects a
        // lock taken on an inode that is no longer at the path.
        for path in [
            self.paths.state_path(),
            self.paths.pid_path(),
            self.paths.lock_path(),
        ] {
            if let Err(error) = fs::remove_file(path)
                && error.kind() != io::ErrorKind::NotFound
            {
                warn!(
                    target: BROKER_TARGET,
                    file = %path.display(),
                    error = %error,
                    "failed to remove runtime file"
                );
            }
        }
        debug!(target: BROKER_TARGET, "application identity released");
    }
}

/// Registers the application identity.
///
/// The process that takes the exclusive lock on the lock file becomes
/// primary. Anyone finding the lock held is a remote.
pub fn register(paths: &RuntimePaths) -> Result<Registration, BrokerError> {
    let lock_path = paths.lock_path();
    for _ in 0..MAX_LOCK_ATTEMPTS {
        let file = open_lock(lock_path).map_err(|source| BrokerError::LockCreate {
            path: lock_path.to_path_buf(),
            source,
        })?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => {
                if !still_linked(&lock, lock_path) {
                    debug!(
                        target: BROKER_TARGET,
                        file = %lock_path.display(),
                        "lock file was released under us; retrying"
                    );
                    continue;
                }
                let guard = InstanceGuard {
                    paths: paths.clone(),
                    _lock: lock,
                    pid: std::process::id(),
                };
                guard.write_pid()?;
                info!(
                    target: BROKER_TARGET,
                    file = %lock_path.display(),
                    "registered as primary instance"
                );
                return Ok(Registration::Primary(guard));
            }
            Err((_, Errno::EAGAIN)) => {
                let pid = published_pid(paths);
                debug!(target: BROKER_TARGET, pid = ?pid, "identity held by another instance");
                return Ok(Registration::Remote { pid });
            }
            Err((_, source)) => {
                return Err(BrokerError::LockAcquire {
                    path: lock_path.to_path_buf(),
                    source,
                });
            }
        }
    }
    Err(BrokerError::LockCreate {
        path: lock_path.to_path_buf(),
        source: io::Error::new(
            io::ErrorKind::WouldBlock,
            "lock file kept being replaced while registering",
        ),
    })
}

/// Waits until the current primary releases the identity, then claims it.
pub fn wait_for_release(
    paths: &RuntimePaths,
    timeout: Duration,
) -> Result<InstanceGuard, BrokerError> {
    let deadline = Instant::now() + timeout;
    loop {
        match register(paths)? {
            Registration::Primary(guard) => return Ok(guard),
            Registration::Remote { pid } => {
                if Instant::now() >= deadline {
                    warn!(
                        target: BROKER_TARGET,
                        pid = ?pid,
                        timeout_ms = timeout.as_millis(),
                        "previous instance did not exit in time"
                    );
                    return Err(BrokerError::HandoverTimeout {
                        timeout_ms: timeout.as_millis(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

fn open_lock(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Whether the locked descriptor still refers to the file at `path`.
fn still_linked(lock: &File, path: &Path) -> bool {
    let (Ok(locked), Ok(current)) = (lock.metadata(), fs::metadata(path)) else {
        return false;
    };
    locked.dev() == current.dev() && locked.ino() == current.ino()
}

fn published_pid(paths: &RuntimePaths) -> Option<u32> {
    let deadline = Instant::now() + STARTUP_GRACE;
    loop {
        if let Some(pid) = read_pid(paths.pid_path()) {
            return Some(pid);
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok().filter(|pid| *pid != 0)
}
