use std::cell::Cell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::Builder;
use tracing::info;

use super::BROKER_TARGET;
use super::errors::BrokerError;

/// Coarse status published by the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Registered but not yet running its loop.
    Starting,
    /// Fully initialized; the loop is running.
    Running,
    /// Terminating.
    Stopping,
}

/// Contents of the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Current status.
    pub status: InstanceStatus,
    /// PID of the primary.
    pub pid: u32,
    /// Current daemon flag.
    pub daemonized: bool,
    /// Seconds since the Unix epoch at which the snapshot was written.
    pub timestamp: u64,
}

impl StateSnapshot {
    /// Reads a snapshot; `None` when the file is absent or unreadable.
    #[must_use]
    pub fn read(path: &Path) -> Option<Self> {
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }
}

/// Rewrites the state file whenever the status or daemon flag changes.
///
/// Clones share the current values, so a clone captured by a controller
/// handler and the one held by the process entry stay consistent.
#[derive(Debug, Clone)]
pub struct StateRecorder {
    path: PathBuf,
    pid: u32,
    status: Rc<Cell<InstanceStatus>>,
    daemonized: Rc<Cell<bool>>,
}

impl StateRecorder {
    /// Builds a recorder; nothing is written until the first update.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, pid: u32) -> Self {
        Self {
            path: path.into(),
            pid,
            status: Rc::new(Cell::new(InstanceStatus::Starting)),
            daemonized: Rc::new(Cell::new(false)),
        }
    }

    /// Records a new status.
    pub fn record_status(&self, status: InstanceStatus) -> Result<(), BrokerError> {
        self.status.set(status);
        self.write()
    }

    /// Records a new daemon flag.
    pub fn record_daemonized(&self, daemonized: bool) -> Result<(), BrokerError> {
        self.daemonized.set(daemonized);
        self.write()
    }

    fn write(&self) -> Result<(), BrokerError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|source| BrokerError::Clock { source })?
            .as_secs();
        let snapshot = StateSnapshot {
            status: self.status.get(),
            pid: self.pid,
            daemonized: self.daemonized.get(),
            timestamp,
        };
        let mut payload = serde_json::to_vec(&snapshot)?;
        payload.push(b'\n');
        atomic_write(&self.path, &payload).map_err(|source| BrokerError::StateWrite {
            path: self.path.clone(),
            source,
        })?;
        info!(
            target: BROKER_TARGET,
            status = ?snapshot.status,
            daemonized = snapshot.daemonized,
            file = %self.path.display(),
            "state snapshot updated"
        );
        Ok(())
    }
}

/// Writes through a temporary file renamed into place.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "target path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("stagehand"),
    );
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o600));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clones_share_the_recorded_values() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("stagehand.state");
        let recorder = StateRecorder::new(&path, 42);
        let clone = recorder.clone();

        recorder.record_status(InstanceStatus::Running).expect("status");
        clone.record_daemonized(true).expect("daemonized");

        let snapshot = StateSnapshot::read(&path).expect("snapshot");
        assert_eq!(snapshot.status, InstanceStatus::Running);
        assert_eq!(snapshot.pid, 42);
        assert!(snapshot.daemonized);
    }

    #[test]
    fn statuses_serialise_in_snake_case() {
        let json = serde_json::to_string(&InstanceStatus::Stopping).expect("serialise");
        assert_eq!(json, "\"stopping\"");
    }
}
