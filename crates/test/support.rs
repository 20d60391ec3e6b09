//! Shared rig for the scenario tests: an engine on a virtual clock, the
//! demo desktop, and hooks that record everything the engine reports.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

use emergent_core::layout::StaticLayout;
use emergent_core::scheduler::{ManualScheduler, Scheduler};
use emergent_core::settings::Timings;
use emergent_core::{AgentController, AgentHooks, RunOutcome, Store, Workflow, WorkflowAction};

pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    Action(usize, &'static str),
    AppOpen(String),
    AppClick(String),
    Type(String, String),
}

/// Runs inside `on_action`, with the engine that fired it.
pub type ActionProbe = Box<dyn Fn(&AgentController, usize) + Send + Sync>;

#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<HookEvent>>,
    probe: Mutex<Option<ActionProbe>>,
    engine: OnceLock<Weak<AgentController>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<HookEvent> {
        lock(&self.events).clone()
    }

    /// Indices of the actions that started, in order.
    pub fn dispatched(&self) -> Vec<usize> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                HookEvent::Action(i, _) => Some(*i),
                _ => None,
            })
            .collect()
    }

    pub fn opened(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                HookEvent::AppOpen(app) => Some(app.clone()),
                _ => None,
            })
            .collect()
    }
}

impl AgentHooks for RecordingHooks {
    fn on_action(&self, index: usize, action: &WorkflowAction) {
        lock(&self.events).push(HookEvent::Action(index, action.kind()));
        let Some(engine) = self.engine.get().and_then(Weak::upgrade) else { return };
        if let Some(probe) = lock(&self.probe).as_ref() {
            probe(&engine, index);
        }
    }

    fn on_app_open(&self, app_id: &str) {
        lock(&self.events).push(HookEvent::AppOpen(app_id.to_string()));
    }

    fn on_app_click(&self, app_id: &str) {
        lock(&self.events).push(HookEvent::AppClick(app_id.to_string()));
    }

    fn on_type(&self, selector: &str, text: &str) {
        lock(&self.events).push(HookEvent::Type(selector.to_string(), text.to_string()));
    }
}

pub struct Rig {
    pub engine: Arc<AgentController>,
    pub store: Arc<Store>,
    pub hooks: Arc<RecordingHooks>,
    pub clock: Arc<ManualScheduler>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_timings(Timings::default())
    }

    pub fn with_timings(timings: Timings) -> Self {
        let store = Arc::new(Store::new());
        let hooks = Arc::new(RecordingHooks::default());
        let clock = Arc::new(ManualScheduler::new(timings.frame_ms as f64));
        let engine = Arc::new(AgentController::new(
            Arc::clone(&store),
            hooks.clone(),
            clock.clone(),
            timings,
        ));
        engine.set_container(Arc::new(StaticLayout::demo_desktop()));
        hooks.engine.set(Arc::downgrade(&engine)).ok();
        Self { engine, store, hooks, clock }
    }

    /// Install a callback run as each action starts.
    pub fn probe<F>(&self, f: F)
    where
        F: Fn(&AgentController, usize) + Send + Sync + 'static,
    {
        *lock(&self.hooks.probe) = Some(Box::new(f));
    }

    pub fn run(&self, workflow: &Workflow) -> RunOutcome {
        self.engine.execute_workflow(workflow)
    }

    pub fn run_actions(&self, actions: Vec<WorkflowAction>) -> RunOutcome {
        self.run(&Workflow::new("scenario", "Scenario", "", actions))
    }

    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}
