//! Registry of the built-in content views.
//!
//! Registration order matters: the view manager resolves the default view by
//! first-registered-wins, so views providing initial content register before
//! views that only add supplementary content.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use thiserror::Error;

/// Built-in content views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Application launcher; provides the initial content.
    Applications,
    /// Open-window overview; supplementary.
    Windows,
}

impl ViewKind {
    /// Built-in views in registration order.
    pub const BUILT_IN: [Self; 2] = [Self::Applications, Self::Windows];
}

impl fmt::Display for ViewKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Applications => "applications",
            Self::Windows => "windows",
        };
        formatter.write_str(label)
    }
}

/// Error returned when a view name is not recognised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown view kind: {0}")]
pub struct ViewKindParseError(String);

impl FromStr for ViewKind {
    type Err = ViewKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "applications" => Ok(Self::Applications),
            "windows" => Ok(Self::Windows),
            other => Err(ViewKindParseError(other.to_owned())),
        }
    }
}

/// Collaborator that records which views are available.
pub trait ViewRegistry {
    /// Registers a view; registering the same kind twice is ignored.
    fn register(&mut self, kind: ViewKind);

    /// Registered views in registration order.
    fn views(&self) -> Vec<ViewKind>;

    /// Unregisters every view.
    fn clear(&mut self);

    /// View shown when a stage opens.
    fn default_view(&self) -> Option<ViewKind> {
        self.views().first().copied()
    }
}

impl<T> ViewRegistry for Rc<RefCell<T>>
where
    T: ViewRegistry,
{
    fn register(&mut self, kind: ViewKind) {
        self.borrow_mut().register(kind);
    }

    fn views(&self) -> Vec<ViewKind> {
        self.borrow().views()
    }

    fn clear(&mut self) {
        self.borrow_mut().clear();
    }
}

/// Vector-backed registry.
#[derive(Debug, Default, Clone)]
pub struct OrderedViewRegistry {
    views: Vec<ViewKind>,
}

impl OrderedViewRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewRegistry for OrderedViewRegistry {
    fn register(&mut self, kind: ViewKind) {
        if self.views.contains(&kind) {
            return;
        }
        self.views.push(kind);
    }

    fn views(&self) -> Vec<ViewKind> {
        self.views.clone()
    }

    fn clear(&mut self) {
        self.views.clear();
    }
}
