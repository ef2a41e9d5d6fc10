//! Collaborators the controller drives but does not own the semantics of.

mod main_loop;
mod settings;
mod stage;
mod views;

use std::fmt;

use stagehand_config::{Config, settings_directory};

pub use main_loop::{LoopHandle, MainLoop};
pub use settings::{FileSettingsChannel, SettingsChannel, SettingsError};
pub use stage::{
    HeadlessStageRegistry, StageError, StageEvent, StageId, StageRegistry, StageState,
};
pub use views::{OrderedViewRegistry, ViewKind, ViewKindParseError, ViewRegistry};

/// Everything the controller reaches through an interface.
pub struct Collaborators {
    /// Configuration channel opened during full initialization.
    pub settings: Box<dyn SettingsChannel>,
    /// Registry of content views.
    pub views: Box<dyn ViewRegistry>,
    /// Live stages.
    pub stages: Box<dyn StageRegistry>,
    /// Loop stopped when the instance terminates.
    pub main_loop: Box<dyn MainLoop>,
}

impl Collaborators {
    /// Bundles the given collaborators.
    #[must_use]
    pub fn new(
        settings: Box<dyn SettingsChannel>,
        views: Box<dyn ViewRegistry>,
        stages: Box<dyn StageRegistry>,
        main_loop: Box<dyn MainLoop>,
    ) -> Self {
        Self {
            settings,
            views,
            stages,
            main_loop,
        }
    }

    /// File-backed settings with in-memory views and stages.
    #[must_use]
    pub fn headless(config: &Config, main_loop: LoopHandle) -> Self {
        Self::new(
            Box::new(FileSettingsChannel::new(
                settings_directory(config),
                config.settings_channel(),
            )),
            Box::new(OrderedViewRegistry::new()),
            Box::new(HeadlessStageRegistry::new()),
            Box::new(main_loop),
        )
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Collaborators")
            .field("settings_open", &self.settings.is_open())
            .field("views", &self.views.views())
            .field("stages", &self.stages.list_all())
            .finish_non_exhaustive()
    }
}
