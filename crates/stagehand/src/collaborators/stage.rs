//! Stage enumeration and control.
//!
//! A stage is an opaque top-level presentation surface. The controller never
//! owns one; it asks the registry to create, show, hide or destroy stages by
//! id. Notifications raised by a stage reach the controller as
//! [`StageEvent`]s delivered through the event loop.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info, warn};

const STAGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::stage");

/// Identifies a live stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageId(u32);

impl StageId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "stage-{}", self.0)
    }
}

/// Notifications a stage raises towards the controller.
///
/// A windowing backend posts these as `LoopEvent::Stage` through
/// `EventLoop::sender()`; the headless registry never raises them itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// The user asked to close the stage.
    CloseRequested(StageId),
    /// The stage left fullscreen without the controller asking.
    Unfullscreened(StageId),
}

impl StageEvent {
    /// Stage that raised the notification.
    #[must_use]
    pub const fn stage(self) -> StageId {
        match self {
            Self::CloseRequested(id) | Self::Unfullscreened(id) => id,
        }
    }
}

/// Raised when the windowing backend cannot create a stage.
#[derive(Debug, Error)]
#[error("failed to create stage: {message}")]
pub struct StageError {
    message: String,
}

impl StageError {
    /// Builds an error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Collaborator enumerating and controlling live stages.
pub trait StageRegistry {
    /// Creates a stage on the primary display. New stages start hidden.
    fn create(&mut self) -> Result<StageId, StageError>;

    /// Live stages in creation order.
    fn list_all(&self) -> Vec<StageId>;

    /// Makes a stage visible.
    fn show(&mut self, id: StageId);

    /// Hides a stage, keeping its resources.
    fn hide(&mut self, id: StageId);

    /// Destroys a stage; the id is no longer live afterwards.
    fn destroy(&mut self, id: StageId);

    /// Enters or leaves fullscreen.
    fn set_fullscreen(&mut self, id: StageId, fullscreen: bool);
}

impl<T> StageRegistry for Rc<RefCell<T>>
where
    T: StageRegistry,
{
    fn create(&mut self) -> Result<StageId, StageError> {
        self.borrow_mut().create()
    }

    fn list_all(&self) -> Vec<StageId> {
        self.borrow().list_all()
    }

    fn show(&mut self, id: StageId) {
        self.borrow_mut().show(id);
    }

    fn hide(&mut self, id: StageId) {
        self.borrow_mut().hide(id);
    }

    fn destroy(&mut self, id: StageId) {
        self.borrow_mut().destroy(id);
    }

    fn set_fullscreen(&mut self, id: StageId, fullscreen: bool) {
        self.borrow_mut().set_fullscreen(id, fullscreen);
    }
}

/// Observable state of a headless stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageState {
    /// Whether the stage is shown.
    pub visible: bool,
    /// Whether the stage covers the display.
    pub fullscreen: bool,
}

/// In-memory registry used when no windowing backend is attached.
#[derive(Debug, Default)]
pub struct HeadlessStageRegistry {
    next_id: u32,
    stages: BTreeMap<StageId, StageState>,
    destroyed: Vec<StageId>,
}

impl HeadlessStageRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a live stage.
    #[must_use]
    pub fn state(&self, id: StageId) -> Option<StageState> {
        self.stages.get(&id).copied()
    }

    /// Stages destroyed so far, in destruction order.
    #[must_use]
    pub fn destroyed(&self) -> &[StageId] {
        &self.destroyed
    }

    fn update(&mut self, id: StageId, action: &str, apply: impl FnOnce(&mut StageState)) {
        match self.stages.get_mut(&id) {
            Some(state) => {
                apply(state);
                debug!(
                    target: STAGE_TARGET,
                    stage = %id,
                    action,
                    visible = state.visible,
                    fullscreen = state.fullscreen,
                    "stage updated"
                );
            }
            None => warn!(
                target: STAGE_TARGET,
                stage = %id,
                action,
                "ignoring request for unknown stage"
            ),
        }
    }
}

impl StageRegistry for HeadlessStageRegistry {
    fn create(&mut self) -> Result<StageId, StageError> {
        let id = StageId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| StageError::new("stage identifiers exhausted"))?;
        self.stages.insert(id, StageState::default());
        info!(target: STAGE_TARGET, stage = %id, "stage created");
        Ok(id)
    }

    fn list_all(&self) -> Vec<StageId> {
        self.stages.keys().copied().collect()
    }

    fn show(&mut self, id: StageId) {
        self.update(id, "show", |state| state.visible = true);
    }

    fn hide(&mut self, id: StageId) {
        self.update(id, "hide", |state| state.visible = false);
    }

    fn destroy(&mut self, id: StageId) {
        if self.stages.remove(&id).is_some() {
            self.destroyed.push(id);
            info!(target: STAGE_TARGET, stage = %id, "stage destroyed");
        } else {
            warn!(
                target: STAGE_TARGET,
                stage = %id,
                "ignoring destroy for unknown stage"
            );
        }
    }

    fn set_fullscreen(&mut self, id: StageId, fullscreen: bool) {
        self.update(id, "set_fullscreen", |state| state.fullscreen = fullscreen);
    }
}
