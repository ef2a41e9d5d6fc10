//! Process-wide controller slot.
//!
//! The controller lives on the event-loop thread, so the slot is thread-local.
//! Requests arriving while the controller is already borrowed (a handler
//! calling back into it) are logged and dropped instead of panicking.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::application::Application;
use crate::collaborators::MainLoop;

const SINGLETON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::controller");

thread_local! {
    static DEFAULT: RefCell<Option<Rc<RefCell<Application>>>> = const { RefCell::new(None) };
}

/// Shared handle to the controller.
pub type SharedApplication = Rc<RefCell<Application>>;

/// Returns the controller, building it with `factory` on first use.
pub fn get_default_with<F>(factory: F) -> SharedApplication
where
    F: FnOnce() -> Application,
{
    if let Some(existing) = peek() {
        return existing;
    }
    let created = Rc::new(RefCell::new(factory()));
    DEFAULT.with(|slot| {
        slot.borrow_mut()
            .get_or_insert_with(|| Rc::clone(&created))
            .clone()
    })
}

/// Returns the controller without creating one.
#[must_use]
pub fn peek() -> Option<SharedApplication> {
    DEFAULT.with(|slot| slot.borrow().clone())
}

/// Disposes the controller and clears the slot.
pub fn dispose() {
    let Some(application) = DEFAULT.with(|slot| slot.borrow_mut().take()) else {
        return;
    };
    match application.try_borrow_mut() {
        Ok(mut application) => application.dispose(),
        Err(_) => warn!(
            target: SINGLETON_TARGET,
            "controller busy during dispose; resources released on drop"
        ),
    }
}

/// Runs an unforced quit on the controller, if one exists.
pub fn request_quit() {
    if let Some(application) = peek() {
        with_application(&application, |application| application.quit(false));
    }
}

/// Runs a forced quit on the controller, or stops `fallback` when none exists.
pub fn request_quit_forced(fallback: &dyn MainLoop) {
    match peek() {
        Some(application) => {
            with_application(&application, |application| application.quit(true));
        }
        None => fallback.quit(),
    }
}

fn with_application(application: &SharedApplication, action: impl FnOnce(&mut Application)) {
    match application.try_borrow_mut() {
        Ok(mut application) => action(&mut application),
        Err(_) => warn!(
            target: SINGLETON_TARGET,
            "controller busy; quit request dropped"
        ),
    }
}
