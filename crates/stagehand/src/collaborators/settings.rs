//! Settings channel opened during full initialization.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, DirBuilder};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

const SETTINGS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::settings");

/// Errors raised while opening the settings channel.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The channel directory could not be created.
    #[error("failed to prepare settings directory '{path}': {source}")]
    Directory {
        /// Directory backing the channel.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The channel store exists but could not be read.
    #[error("failed to read settings channel '{path}': {source}")]
    Read {
        /// Store path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The channel store is not a JSON object.
    #[error("settings channel '{path}' is corrupt: {source}")]
    Corrupt {
        /// Store path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration channel collaborator.
pub trait SettingsChannel {
    /// Connects to the settings backend.
    fn init(&mut self) -> Result<(), SettingsError>;

    /// Releases the backend; calling it on a closed channel is a no-op.
    fn shutdown(&mut self);

    /// Whether [`SettingsChannel::init`] succeeded and no shutdown followed.
    fn is_open(&self) -> bool;
}

impl<T> SettingsChannel for Rc<RefCell<T>>
where
    T: SettingsChannel,
{
    fn init(&mut self) -> Result<(), SettingsError> {
        self.borrow_mut().init()
    }

    fn shutdown(&mut self) {
        self.borrow_mut().shutdown();
    }

    fn is_open(&self) -> bool {
        self.borrow().is_open()
    }
}

/// Channel backed by `<directory>/<channel>.json`.
///
/// A missing store is an empty channel.
#[derive(Debug)]
pub struct FileSettingsChannel {
    directory: PathBuf,
    channel: String,
    values: Option<BTreeMap<String, Value>>,
}

impl FileSettingsChannel {
    /// Builds a closed channel.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, channel: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            channel: channel.into(),
            values: None,
        }
    }

    /// Path of the JSON store.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.directory.join(format!("{}.json", self.channel))
    }

    /// Looks up a property; `None` when the channel is closed or the key is unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.as_ref()?.get(key)
    }

    fn prepare_directory(&self) -> Result<(), SettingsError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(&self.directory)
            .map_err(|source| SettingsError::Directory {
                path: self.directory.clone(),
                source,
            })
    }
}

impl SettingsChannel for FileSettingsChannel {
    fn init(&mut self) -> Result<(), SettingsError> {
        if self.values.is_some() {
            return Ok(());
        }
        self.prepare_directory()?;
        let path = self.store_path();
        let values = load_store(&path)?;
        info!(
            target: SETTINGS_TARGET,
            channel = %self.channel,
            store = %path.display(),
            properties = values.len(),
            "settings channel opened"
        );
        self.values = Some(values);
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.values.take().is_some() {
            debug!(
                target: SETTINGS_TARGET,
                channel = %self.channel,
                "settings channel closed"
            );
        }
    }

    fn is_open(&self) -> bool {
        self.values.is_some()
    }
}

fn load_store(path: &Path) -> Result<BTreeMap<String, Value>, SettingsError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&contents).map_err(|source| SettingsError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
