//! Unit tests for the controller singleton, the event loop and arbitration rules.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc;

use rstest::rstest;

use crate::application::{Application, ApplicationHooks};
use crate::collaborators::{
    Collaborators, LoopHandle, MainLoop, OrderedViewRegistry, SettingsChannel, StageEvent,
    StageRegistry, ViewRegistry,
};
use crate::disposition::Disposition;
use crate::event_loop::{EventLoop, LoopEvent};
use crate::output::CommandOutput;
use crate::singleton;

use super::support::{
    CountingLoop, LifecycleEvent, RecordingLifecycleReporter, SwitchableSettings,
    SwitchableStages, TestWorld,
};

struct Harness {
    application: Application,
    settings: Rc<RefCell<SwitchableSettings>>,
    views: Rc<RefCell<OrderedViewRegistry>>,
    stages: Rc<RefCell<SwitchableStages>>,
}

fn harness(main_loop: Box<dyn MainLoop>) -> Harness {
    let settings = Rc::new(RefCell::new(SwitchableSettings::default()));
    let views = Rc::new(RefCell::new(OrderedViewRegistry::new()));
    let stages = Rc::new(RefCell::new(SwitchableStages::default()));
    let collaborators = Collaborators::new(
        Box::new(Rc::clone(&settings)),
        Box::new(Rc::clone(&views)),
        Box::new(Rc::clone(&stages)),
        main_loop,
    );
    let application = Application::new(
        collaborators,
        Arc::new(RecordingLifecycleReporter::default()),
    );
    Harness {
        application,
        settings,
        views,
        stages,
    }
}

fn arguments(flags: &[&str]) -> Vec<String> {
    std::iter::once("stagehand")
        .chain(flags.iter().copied())
        .map(str::to_owned)
        .collect()
}

fn start(application: &mut Application, flags: &[&str]) {
    application.startup();
    let mut output = CommandOutput::new();
    assert_eq!(
        application.arbitrate(&arguments(flags), &mut output),
        Disposition::Success,
        "start-up failed: {output:?}"
    );
}

#[rstest]
#[case::quit(&["--quit"])]
#[case::quit_and_daemonize(&["--quit", "--daemonize"])]
#[case::quit_and_restart(&["--restart", "--quit"])]
#[case::everything(&["-d", "-r", "-q"])]
fn quit_always_wins(#[case] flags: &[&str]) {
    let mut world = TestWorld::new();
    world.start(&[]).expect("controller should start");
    assert_eq!(world.deliver(flags), Disposition::SuccessAndQuit);
    assert_eq!(world.live_stages(), 0);
}

#[rstest]
#[case::daemon_quit(&["--daemonize", "--quit"], true)]
#[case::plain_quit(&["--quit"], false)]
fn daemon_flag_is_applied_before_quit_returns(#[case] flags: &[&str], #[case] expected: bool) {
    let mut world = TestWorld::new();
    world.start(&[]).expect("controller should start");
    world.deliver(flags);
    assert_eq!(world.application.daemonized(), expected);
}

#[rstest]
fn forced_quit_runs_before_the_daemon_flag_changes() {
    let mut world = TestWorld::new();
    world.start(&["--daemonize"]).expect("controller should start");
    world.deliver(&["--restart"]);
    let events = world.events();
    let quit = events
        .iter()
        .rposition(|event| matches!(event, LifecycleEvent::QuitSequenced(outcome) if outcome.terminated))
        .expect("forced quit should be reported");
    let flag = events
        .iter()
        .rposition(|event| *event == LifecycleEvent::DaemonModeChanged(false))
        .expect("daemon flag should be reported");
    assert!(quit < flag, "quit must precede the flag update: {events:?}");
    assert!(!world.application.daemonized());
}

#[rstest]
fn running_controller_never_reinitializes() {
    let mut world = TestWorld::new();
    world.start(&[]).expect("controller should start");
    world.application.startup();
    assert_eq!(world.deliver(&[]), Disposition::Success);
    assert_eq!(world.live_stages(), 1);
    assert_eq!(world.settings.borrow().inits(), 1);
    assert!(!world.application.pending_initialization());
}

#[rstest]
fn disconnected_quit_handlers_are_not_called() {
    let mut world = TestWorld::new();
    let calls = Rc::new(Cell::new(0_u32));
    let counter = Rc::clone(&calls);
    let id = world
        .application
        .connect_quit(move || counter.set(counter.get() + 1));
    assert!(world.application.disconnect_quit(id));
    world.application.quit(true);
    assert_eq!(calls.get(), 0);
    assert!(!world.application.disconnect_quit(id));
}

#[rstest]
fn controller_identity_is_fixed() {
    let world = TestWorld::new();
    assert_eq!(world.application.application_id(), stagehand_config::APP_ID);
    assert!(world.application.handles_command_line());
}

#[rstest]
fn dispose_releases_views_and_settings() {
    let mut world = TestWorld::new();
    world.start(&[]).expect("controller should start");
    world.application.dispose();
    assert!(world.registered_views().is_empty());
    assert!(!world.settings.borrow().is_open());
    assert_eq!(world.settings.borrow().shutdowns(), 1);
}

#[rstest]
fn singleton_builds_once_and_dispose_clears_it() {
    let builds = Cell::new(0_u32);
    let mut settings = None;
    let mut views = None;
    let first = singleton::get_default_with(|| {
        builds.set(builds.get() + 1);
        let mut harness = harness(Box::new(CountingLoop::default()));
        start(&mut harness.application, &[]);
        settings = Some(harness.settings);
        views = Some(harness.views);
        harness.application
    });
    let second = singleton::get_default_with(|| panic!("controller already exists"));
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(builds.get(), 1);
    drop((first, second));

    singleton::dispose();
    assert!(singleton::peek().is_none());
    let settings = settings.expect("factory should have run");
    let views = views.expect("factory should have run");
    assert!(!settings.borrow().is_open());
    assert!(views.borrow().views().is_empty());
}

#[rstest]
fn dispose_without_controller_is_a_no_op() {
    singleton::dispose();
    assert!(singleton::peek().is_none());
}

#[rstest]
fn forced_quit_without_controller_stops_the_fallback_loop() {
    let handle = LoopHandle::new();
    singleton::request_quit_forced(&handle);
    assert!(handle.is_stopped());
}

#[rstest]
fn unforced_quit_request_hides_daemon_stages() {
    let mut stages = None;
    let application = singleton::get_default_with(|| {
        let mut harness = harness(Box::new(CountingLoop::default()));
        start(&mut harness.application, &["-d"]);
        stages = Some(harness.stages);
        harness.application
    });
    singleton::request_quit();
    let stages = stages.expect("factory should have run");
    assert_eq!(stages.borrow().list_all().len(), 1);
    assert_eq!(stages.borrow().visible_count(), 0);
    drop(application);
    singleton::dispose();
}

#[rstest]
fn forwarded_command_line_replies_with_the_disposition() {
    let event_loop = EventLoop::new();
    let mut harness = harness(Box::new(event_loop.handle()));
    harness.application.startup();
    let application = Rc::new(RefCell::new(harness.application));

    let (reply, replies) = mpsc::channel();
    event_loop.dispatch(
        &application,
        LoopEvent::CommandLine {
            arguments: arguments(&["--bogus"]),
            reply,
        },
    );
    let outcome = replies.recv().expect("reply should arrive");
    assert_eq!(outcome.status, Disposition::Failed.exit_status());
    assert!(!outcome.output.chunks().is_empty());
}

#[rstest]
fn bare_forwarded_command_line_reveals_hidden_stages() {
    let event_loop = EventLoop::new();
    let mut harness = harness(Box::new(event_loop.handle()));
    start(&mut harness.application, &["--daemonize"]);
    let stage = harness.stages.borrow().list_all()[0];
    let application = Rc::new(RefCell::new(harness.application));

    event_loop.dispatch(&application, LoopEvent::Stage(StageEvent::CloseRequested(stage)));
    assert_eq!(harness.stages.borrow().visible_count(), 0);

    let (reply, replies) = mpsc::channel();
    event_loop.dispatch(
        &application,
        LoopEvent::CommandLine {
            arguments: arguments(&[]),
            reply,
        },
    );
    assert_eq!(replies.recv().expect("reply should arrive").status, 0);
    assert_eq!(harness.stages.borrow().visible_count(), 1);
    assert!(!event_loop.handle().is_stopped());
}

#[rstest]
fn termination_signal_force_quits_the_controller() {
    let event_loop = EventLoop::new();
    let mut stages = None;
    let application = singleton::get_default_with(|| {
        let mut harness = harness(Box::new(event_loop.handle()));
        start(&mut harness.application, &["--daemonize"]);
        stages = Some(harness.stages);
        harness.application
    });

    event_loop
        .sender()
        .send(LoopEvent::Terminate { signal: 15 })
        .expect("loop should accept events");
    event_loop.run(&application);

    assert!(event_loop.handle().is_stopped());
    let stages = stages.expect("factory should have run");
    assert!(stages.borrow().list_all().is_empty());
    drop(application);
    singleton::dispose();
}
