//! Shared state for controller behaviour scenarios.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::application::{Application, ApplicationHooks};
use crate::collaborators::{
    Collaborators, OrderedViewRegistry, StageEvent, StageId, StageRegistry, ViewKind,
    ViewRegistry,
};
use crate::disposition::Disposition;
use crate::output::{CommandOutput, StreamTarget};

use super::doubles::{CountingLoop, SwitchableSettings, SwitchableStages};
use super::reporter::{LifecycleEvent, RecordingLifecycleReporter};

/// Controller wired to inspectable doubles.
pub struct TestWorld {
    pub application: Application,
    pub settings: Rc<RefCell<SwitchableSettings>>,
    pub views: Rc<RefCell<OrderedViewRegistry>>,
    pub stages: Rc<RefCell<SwitchableStages>>,
    pub main_loop: CountingLoop,
    pub reporter: Arc<RecordingLifecycleReporter>,
    pub quit_notifications: Rc<RefCell<u32>>,
    pub daemonized_notifications: Rc<RefCell<Vec<bool>>>,
    pub last_disposition: Option<Disposition>,
    pub last_output: CommandOutput,
    pub remembered_stage: Option<StageId>,
}

impl TestWorld {
    pub fn new() -> Self {
        let settings = Rc::new(RefCell::new(SwitchableSettings::default()));
        let views = Rc::new(RefCell::new(OrderedViewRegistry::new()));
        let stages = Rc::new(RefCell::new(SwitchableStages::default()));
        let main_loop = CountingLoop::default();
        let reporter = Arc::new(RecordingLifecycleReporter::default());
        let collaborators = Collaborators::new(
            Box::new(Rc::clone(&settings)),
            Box::new(Rc::clone(&views)),
            Box::new(Rc::clone(&stages)),
            Box::new(main_loop.clone()),
        );
        let mut application = Application::new(collaborators, reporter.clone());

        let quit_notifications = Rc::new(RefCell::new(0));
        let quit_counter = Rc::clone(&quit_notifications);
        application.connect_quit(move || *quit_counter.borrow_mut() += 1);

        let daemonized_notifications = Rc::new(RefCell::new(Vec::new()));
        let daemonized_log = Rc::clone(&daemonized_notifications);
        application.connect_daemonized_changed(move |value| daemonized_log.borrow_mut().push(value));

        Self {
            application,
            settings,
            views,
            stages,
            main_loop,
            reporter,
            quit_notifications,
            daemonized_notifications,
            last_disposition: None,
            last_output: CommandOutput::new(),
            remembered_stage: None,
        }
    }

    /// Delivers `stagehand` followed by `flags` to the controller.
    pub fn deliver(&mut self, flags: &[&str]) -> Disposition {
        let arguments: Vec<String> = std::iter::once("stagehand")
            .chain(flags.iter().copied())
            .map(str::to_owned)
            .collect();
        let mut output = CommandOutput::new();
        let disposition = self.application.arbitrate(&arguments, &mut output);
        self.last_disposition = Some(disposition);
        self.last_output = output;
        disposition
    }

    /// Runs startup followed by a command line carrying `flags`.
    pub fn start(&mut self, flags: &[&str]) -> Result<(), String> {
        self.application.startup();
        match self.deliver(flags) {
            Disposition::Success => Ok(()),
            other => Err(format!("start-up command line returned {other}")),
        }
    }

    pub fn primary_stage(&self) -> Result<StageId, String> {
        self.stages
            .borrow()
            .list_all()
            .first()
            .copied()
            .ok_or_else(|| "no live stage".to_owned())
    }

    pub fn raise(&mut self, event: StageEvent) {
        self.application.handle_stage_event(event);
    }

    pub fn visible_stages(&self) -> usize {
        self.stages.borrow().visible_count()
    }

    pub fn live_stages(&self) -> usize {
        self.stages.borrow().list_all().len()
    }

    pub fn registered_views(&self) -> Vec<ViewKind> {
        self.views.borrow().views()
    }

    pub fn stderr(&self) -> String {
        self.last_output.text(StreamTarget::Stderr)
    }

    pub fn stdout(&self) -> String {
        self.last_output.text(StreamTarget::Stdout)
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.reporter.events()
    }
}
