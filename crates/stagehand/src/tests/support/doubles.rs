//! Collaborator doubles whose failures can be switched on per scenario.

use std::cell::Cell;
use std::io;
use std::rc::Rc;

use crate::collaborators::{
    HeadlessStageRegistry, MainLoop, SettingsChannel, SettingsError, StageError, StageId,
    StageRegistry, StageState,
};

/// Settings channel that can be made unavailable.
#[derive(Debug, Default)]
pub struct SwitchableSettings {
    open: bool,
    unavailable: bool,
    inits: usize,
    shutdowns: usize,
}

impl SwitchableSettings {
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    pub fn inits(&self) -> usize {
        self.inits
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns
    }
}

impl SettingsChannel for SwitchableSettings {
    fn init(&mut self) -> Result<(), SettingsError> {
        self.inits += 1;
        if self.unavailable {
            return Err(SettingsError::Read {
                path: "switchable".into(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "settings daemon down"),
            });
        }
        self.open = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.open {
            self.shutdowns += 1;
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Headless registry whose stage creation can be made to fail.
#[derive(Debug, Default)]
pub struct SwitchableStages {
    inner: HeadlessStageRegistry,
    refuse_creation: bool,
}

impl SwitchableStages {
    pub fn set_refuse_creation(&mut self, refuse: bool) {
        self.refuse_creation = refuse;
    }

    pub fn state(&self, id: StageId) -> Option<StageState> {
        self.inner.state(id)
    }

    pub fn visible_count(&self) -> usize {
        self.inner
            .list_all()
            .into_iter()
            .filter(|id| self.inner.state(*id).is_some_and(|state| state.visible))
            .count()
    }

    pub fn destroyed_count(&self) -> usize {
        self.inner.destroyed().len()
    }
}

impl StageRegistry for SwitchableStages {
    fn create(&mut self) -> Result<StageId, StageError> {
        if self.refuse_creation {
            return Err(StageError::new("no primary display"));
        }
        self.inner.create()
    }

    fn list_all(&self) -> Vec<StageId> {
        self.inner.list_all()
    }

    fn show(&mut self, id: StageId) {
        self.inner.show(id);
    }

    fn hide(&mut self, id: StageId) {
        self.inner.hide(id);
    }

    fn destroy(&mut self, id: StageId) {
        self.inner.destroy(id);
    }

    fn set_fullscreen(&mut self, id: StageId, fullscreen: bool) {
        self.inner.set_fullscreen(id, fullscreen);
    }
}

/// Main loop that counts stop requests.
#[derive(Debug, Default, Clone)]
pub struct CountingLoop {
    stops: Rc<Cell<u32>>,
}

impl CountingLoop {
    pub fn stops(&self) -> u32 {
        self.stops.get()
    }
}

impl MainLoop for CountingLoop {
    fn quit(&self) {
        self.stops.set(self.stops.get() + 1);
    }
}
