//! Derives the per-session runtime artefact paths.
//!
//! Every invocation of the program resolves the same layout so a secondary
//! invocation can find the primary's lock, pid, state snapshot and socket.

use std::env;
use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

#[cfg(unix)]
use libc::geteuid;

const LOCK_FILE: &str = "stagehand.lock";
const PID_FILE: &str = "stagehand.pid";
const STATE_FILE: &str = "stagehand.state";
const SOCKET_FILE: &str = "stagehand.sock";
const NAMESPACE: &str = "stagehand";

/// Canonical paths for artefacts owned by the primary instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    runtime_dir: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    state_path: PathBuf,
    socket_path: PathBuf,
}

impl RuntimePaths {
    /// Resolves the layout and creates the runtime directory (mode `0700`).
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let paths = Self::resolve(config);
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(&paths.runtime_dir)
            .map_err(|source| RuntimePathsError::RuntimeDirectory {
                path: paths.runtime_dir.clone(),
                source,
            })?;
        Ok(paths)
    }

    /// Resolves the layout without touching the filesystem.
    #[must_use]
    pub fn resolve(config: &Config) -> Self {
        let runtime_dir = config
            .runtime_dir()
            .map(|dir| dir.as_std_path().to_path_buf())
            .unwrap_or_else(default_runtime_directory);
        Self::within(runtime_dir)
    }

    /// Builds the layout rooted at `runtime_dir`.
    #[must_use]
    pub fn within(runtime_dir: impl Into<PathBuf>) -> Self {
        let runtime_dir = runtime_dir.into();
        Self {
            lock_path: runtime_dir.join(LOCK_FILE),
            pid_path: runtime_dir.join(PID_FILE),
            state_path: runtime_dir.join(STATE_FILE),
            socket_path: runtime_dir.join(SOCKET_FILE),
            runtime_dir,
        }
    }

    /// Directory holding runtime artefacts.
    #[must_use]
    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    /// Lock file guarding the single-instance identity.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// PID of the current primary.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    /// JSON snapshot of the primary's lifecycle state.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Unix socket the primary listens on for forwarded command lines.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

/// Directory backing the settings channel: the override or `$XDG_CONFIG_HOME/stagehand`.
#[must_use]
pub fn settings_directory(config: &Config) -> PathBuf {
    if let Some(dir) = config.settings_dir() {
        return dir.as_std_path().to_path_buf();
    }
    dirs::config_dir()
        .unwrap_or_else(env::temp_dir)
        .join(NAMESPACE)
}

fn default_runtime_directory() -> PathBuf {
    if let Some(mut dir) = dirs::runtime_dir() {
        dir.push(NAMESPACE);
        return dir;
    }
    let mut dir = env::temp_dir();
    dir.push(NAMESPACE);
    #[cfg(unix)]
    dir.push(format!("uid-{}", unsafe { geteuid() }));
    dir
}

/// Errors raised while preparing runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
