//! Shared fixtures for controller tests.

pub mod doubles;
pub mod reporter;
pub mod world;

pub use doubles::{CountingLoop, SwitchableSettings, SwitchableStages};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use world::TestWorld;
