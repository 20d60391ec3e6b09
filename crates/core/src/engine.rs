//! The agent controller: replays a [`Workflow`] as cursor motion, click
//! and typing pulses, and store mutations.
//!
//! `execute_workflow` blocks the calling thread until the run completes or
//! is cancelled; `stop`, `reset` and the observers may be used from any
//! other thread meanwhile. Every wait is sliced and rechecks the cancel
//! flag, and the animation loop checks it every frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::layout::{Container, Selector};
use crate::logger;
use crate::motion;
use crate::scheduler::{self, Scheduler};
use crate::settings::Timings;
use crate::state::{EmailMessage, EmailPatch, Message, AGENT_ADDRESS};
use crate::store::{generate_id, Store};
use crate::terminal;
use crate::types::{AgentState, Point};
use crate::workflow::{AppInput, EmailField, MoveTarget, Workflow, WorkflowAction};

pub const AGENT_SENDER: &str = "Agent";

/// Side effects the host wants to observe. Every method defaults to a
/// no-op, so hosts implement only what they render.
pub trait AgentHooks: Send + Sync {
    /// Called as action `index` starts.
    fn on_action(&self, _index: usize, _action: &WorkflowAction) {}
    /// After a double click on an app.
    fn on_app_open(&self, _app_id: &str) {}
    /// After a single click on an app.
    fn on_app_click(&self, _app_id: &str) {}
    /// After a `type` action with a target.
    fn on_type(&self, _selector: &str, _text: &str) {}
}

pub struct NoHooks;

impl AgentHooks for NoHooks {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    /// Another workflow was already running; nothing happened.
    Rejected,
}

type UpdateListener = Arc<dyn Fn(&AgentState) + Send + Sync>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct AgentController {
    store: Arc<Store>,
    hooks: Arc<dyn AgentHooks>,
    scheduler: Arc<dyn Scheduler>,
    timings: Timings,
    state: Mutex<AgentState>,
    listener: Mutex<Option<UpdateListener>>,
    container: Mutex<Option<Arc<dyn Container>>>,
    /// Cleared by `stop`; the run loop's cancel flag.
    running: AtomicBool,
    /// Held for the whole of a run, including its unwinding after `stop`.
    busy: AtomicBool,
    /// Set by `reset`; the run zeroes AgentState again as it unwinds.
    reset_requested: AtomicBool,
}

impl AgentController {
    pub fn new(
        store: Arc<Store>,
        hooks: Arc<dyn AgentHooks>,
        scheduler: Arc<dyn Scheduler>,
        timings: Timings,
    ) -> Self {
        logger::register_prefix("agent", logger::COLOR_GREEN);
        Self {
            store,
            hooks,
            scheduler,
            timings,
            state: Mutex::new(AgentState::default()),
            listener: Mutex::new(None),
            container: Mutex::new(None),
            running: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            reset_requested: AtomicBool::new(false),
        }
    }

    pub fn set_container(&self, container: Arc<dyn Container>) {
        *lock(&self.container) = Some(container);
    }

    /// Replace the AgentState listener.
    pub fn on_update<F>(&self, listener: F)
    where
        F: Fn(&AgentState) + Send + Sync + 'static,
    {
        *lock(&self.listener) = Some(Arc::new(listener));
    }

    pub fn agent_state(&self) -> AgentState {
        lock(&self.state).clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    fn update_state(&self, apply: impl FnOnce(&mut AgentState)) {
        let snapshot = {
            let mut state = lock(&self.state);
            apply(&mut state);
            state.clone()
        };
        let listener = lock(&self.listener).clone();
        if let Some(listener) = listener {
            listener(&snapshot);
        }
    }

    /// Run `workflow` to completion or cancellation. A call made while
    /// another run is in flight returns `Rejected` without touching it.
    pub fn execute_workflow(&self, workflow: &Workflow) -> RunOutcome {
        if self.busy.swap(true, Ordering::AcqRel) {
            logger::warn_p("agent", &format!("ignoring {}: a workflow is already running", workflow.id));
            return RunOutcome::Rejected;
        }
        self.reset_requested.store(false, Ordering::Release);
        self.running.store(true, Ordering::Release);
        let name = workflow.name.clone();
        self.update_state(|s| s.workflow_name = name);
        logger::info_p("agent", &format!("starting {} ({} actions)", workflow.name, workflow.actions.len()));

        let mut outcome = RunOutcome::Completed;
        for (index, action) in workflow.actions.iter().enumerate() {
            if !self.is_running() {
                outcome = RunOutcome::Cancelled;
                break;
            }
            self.hooks.on_action(index, action);
            self.dispatch(action);
            self.pause(scheduler::jittered(self.timings.inter_action_ms, self.timings.jitter));
        }
        // A stop during the last action still cuts the run short.
        if !self.is_running() {
            outcome = RunOutcome::Cancelled;
        }

        match outcome {
            RunOutcome::Cancelled => logger::info_p("agent", &format!("{} cancelled", workflow.name)),
            _ => logger::info_p("agent", &format!("{} finished", workflow.name)),
        }
        self.running.store(false, Ordering::Release);
        if self.reset_requested.swap(false, Ordering::AcqRel) {
            self.update_state(|s| *s = AgentState::default());
        }
        self.busy.store(false, Ordering::Release);
        outcome
    }

    /// Cancel the current run at the next slice boundary.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Stop and return the cursor to its idle state.
    pub fn reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
        self.stop();
        self.update_state(|s| *s = AgentState::default());
    }

    fn dispatch(&self, action: &WorkflowAction) {
        let t = &self.timings;
        match action {
            WorkflowAction::Move { to, duration_ms } => {
                let target = match to {
                    MoveTarget::Position(p) => Some(*p),
                    MoveTarget::Element(selector) => self.resolve(selector),
                };
                match target {
                    Some(p) => {
                        self.animate_to(p, duration_ms.unwrap_or(t.move_duration_ms));
                    }
                    None => logger::warn_p("agent", "move target not found, skipping"),
                }
            }
            WorkflowAction::MoveToApp { app_id } => self.move_to_selector(&Selector::app_icon(app_id)),
            WorkflowAction::MoveToDock { app_id } => self.move_to_selector(&Selector::dock_icon(app_id)),
            WorkflowAction::Click { app_id } => {
                if self.click_pulse() {
                    if let Some(app) = app_id {
                        self.hooks.on_app_click(app);
                    }
                }
            }
            WorkflowAction::DoubleClick { app_id } => {
                let done = self.click_pulse() && self.pause(t.double_click_gap_ms) && self.click_pulse();
                if done {
                    if let Some(app) = app_id {
                        self.hooks.on_app_open(app);
                    }
                }
            }
            WorkflowAction::Type { text, speed_ms, target } => {
                if self.typing_pulse(text, *speed_ms) {
                    if let Some(selector) = target {
                        self.hooks.on_type(selector, text);
                    }
                }
            }
            WorkflowAction::TypeInApp { input, text, speed_ms } => {
                if self.typing_pulse(text, *speed_ms) {
                    self.route_text(input, text);
                }
            }
            WorkflowAction::SelectCell { cell_id } => {
                self.move_to_selector(&Selector::cell(cell_id));
                if self.click_pulse() {
                    self.store.select_cell(cell_id);
                }
            }
            WorkflowAction::SendMessage { conversation_id, text } => {
                let message = Message {
                    id: generate_id(),
                    sender: AGENT_SENDER.to_string(),
                    content: text.clone(),
                    timestamp: Utc::now(),
                    is_from_agent: true,
                };
                self.store.send_message(conversation_id, message);
            }
            WorkflowAction::SendEmail { to, subject, body } => self.send_email(to, subject, body),
            WorkflowAction::ExecuteCommand { command } => {
                let cwd = self.store.get_state().terminal.current_directory.clone();
                let output = terminal::simulate(command, &cwd);
                self.store.execute_command(command, &output);
            }
            WorkflowAction::Wait { duration_ms } => {
                self.pause(duration_ms.unwrap_or(t.wait_ms));
            }
            // TODO: animate press-move-release once the desktop has draggable windows.
            WorkflowAction::Drag => {}
        }
    }

    /// Centre of the first element matching `selector`, relative to the
    /// bound container.
    fn resolve(&self, selector: &Selector) -> Option<Point> {
        let container = lock(&self.container).clone()?;
        let rect = container.query(selector)?;
        Some(rect.center_within(&container.bounds()))
    }

    fn move_to_selector(&self, selector: &Selector) {
        match self.resolve(selector) {
            Some(p) => {
                self.animate_to(p, self.timings.move_duration_ms);
            }
            None => logger::warn_p("agent", &format!("{} not found, skipping move", selector)),
        }
    }

    /// Ease the cursor to `to`, emitting a state update every frame. The
    /// final update is always exactly at full progress. Returns false if
    /// cancelled part way.
    fn animate_to(&self, to: Point, duration_ms: u64) -> bool {
        let from = lock(&self.state).position;
        let duration = duration_ms as f64;
        let start = self.scheduler.now_ms();
        loop {
            if !self.is_running() {
                return false;
            }
            let elapsed = self.scheduler.now_ms() - start;
            let position = motion::interpolate(from, to, elapsed, duration);
            self.update_state(|s| s.position = position);
            if elapsed >= duration {
                return true;
            }
            self.scheduler.next_frame();
        }
    }

    /// Sleep `ms`, waking every slice to honour `stop`. Returns false if
    /// cancelled before the full duration elapsed.
    fn pause(&self, ms: u64) -> bool {
        let deadline = self.scheduler.now_ms() + ms as f64;
        let slice = self.timings.cancel_slice_ms.max(1);
        loop {
            if !self.is_running() {
                return false;
            }
            let remaining = deadline - self.scheduler.now_ms();
            if remaining <= 0.0 {
                return true;
            }
            self.scheduler.sleep_ms((remaining.ceil() as u64).min(slice));
        }
    }

    fn click_pulse(&self) -> bool {
        self.update_state(|s| s.is_clicking = true);
        let held = self.pause(self.timings.click_pulse_ms);
        self.update_state(|s| s.is_clicking = false);
        held && self.pause(self.timings.click_pulse_ms)
    }

    fn typing_pulse(&self, text: &str, speed_ms: Option<u64>) -> bool {
        let speed = speed_ms.unwrap_or(self.timings.type_speed_ms);
        let duration = (text.chars().count() as u64).saturating_mul(speed);
        self.update_state(|s| s.is_typing = true);
        let finished = self.pause(duration);
        self.update_state(|s| s.is_typing = false);
        finished
    }

    fn route_text(&self, input: &AppInput, text: &str) {
        match input {
            AppInput::Gmail(field) => {
                let value = Some(text.to_string());
                let patch = match field {
                    EmailField::To => EmailPatch { to: value, ..Default::default() },
                    EmailField::Subject => EmailPatch { subject: value, ..Default::default() },
                    EmailField::Body => EmailPatch { body: value, ..Default::default() },
                };
                self.store.update_composing_email(patch);
            }
            AppInput::Numbers { cell_id } => self.store.update_cell(cell_id, text, None),
            AppInput::TextEdit { document_id } => {
                let doc = match document_id {
                    Some(id) => id.clone(),
                    None => self.store.get_state().text_edit.active_document_id.clone(),
                };
                self.store.update_document(&doc, text);
            }
            AppInput::Messages => self.store.update_composing_message(text),
            AppInput::Notes => {
                let selected = self.store.get_state().notes.selected_note_id.clone();
                match selected {
                    Some(note_id) => self.store.update_note(&note_id, text),
                    None => logger::warn_p("agent", "no note selected, dropping typed text"),
                }
            }
        }
    }

    fn send_email(&self, to: &Option<String>, subject: &Option<String>, body: &Option<String>) {
        let state = self.store.get_state();
        let (draft_to, draft_subject, draft_body) = match &state.gmail.composing {
            Some(d) => (d.to.clone(), d.subject.clone(), d.body.clone()),
            None => Default::default(),
        };
        let email = EmailMessage {
            id: generate_id(),
            from: AGENT_ADDRESS.to_string(),
            to: to.clone().unwrap_or(draft_to),
            subject: subject.clone().unwrap_or(draft_subject),
            body: body.clone().unwrap_or(draft_body),
            timestamp: Utc::now(),
            is_read: false,
            is_draft: false,
        };
        self.store.send_email(email);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StaticLayout;
    use crate::scheduler::ManualScheduler;
    use crate::types::Rect;

    struct Harness {
        engine: Arc<AgentController>,
        clock: Arc<ManualScheduler>,
        updates: Arc<Mutex<Vec<AgentState>>>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualScheduler::default());
        let engine = Arc::new(AgentController::new(
            Arc::new(Store::new()),
            Arc::new(NoHooks),
            clock.clone(),
            Timings::default(),
        ));
        engine.set_container(Arc::new(StaticLayout::demo_desktop()));
        let updates: Arc<Mutex<Vec<AgentState>>> = Arc::default();
        let u = Arc::clone(&updates);
        engine.on_update(move |s| lock(&u).push(s.clone()));
        Harness { engine, clock, updates }
    }

    fn run(h: &Harness, actions: Vec<WorkflowAction>) -> RunOutcome {
        h.engine.execute_workflow(&Workflow::new("t", "Test", "", actions))
    }

    type Tick = Box<dyn Fn(&AgentController, f64) + Send + Sync>;

    /// Virtual clock that calls back into the engine after every sleep
    /// and frame, to land `stop`/`reset` mid-action.
    struct TickingScheduler {
        clock: ManualScheduler,
        engine: std::sync::OnceLock<std::sync::Weak<AgentController>>,
        tick: Tick,
    }

    impl TickingScheduler {
        fn fire(&self) {
            if let Some(engine) = self.engine.get().and_then(std::sync::Weak::upgrade) {
                (self.tick)(&engine, self.clock.now_ms());
            }
        }
    }

    impl Scheduler for TickingScheduler {
        fn now_ms(&self) -> f64 {
            self.clock.now_ms()
        }

        fn sleep_ms(&self, ms: u64) {
            self.clock.sleep_ms(ms);
            self.fire();
        }

        fn next_frame(&self) {
            self.clock.next_frame();
            self.fire();
        }
    }

    fn ticking<F>(tick: F) -> Arc<AgentController>
    where
        F: Fn(&AgentController, f64) + Send + Sync + 'static,
    {
        let sched = Arc::new(TickingScheduler {
            clock: ManualScheduler::default(),
            engine: std::sync::OnceLock::new(),
            tick: Box::new(tick),
        });
        let engine = Arc::new(AgentController::new(
            Arc::new(Store::new()),
            Arc::new(NoHooks),
            sched.clone(),
            Timings::default(),
        ));
        engine.set_container(Arc::new(StaticLayout::demo_desktop()));
        sched.engine.set(Arc::downgrade(&engine)).ok();
        engine
    }

    #[test]
    fn reset_mid_move_leaves_cursor_zeroed() {
        let engine = ticking(|engine, _| {
            if engine.is_running() {
                engine.reset();
            }
        });
        let out = engine.execute_workflow(&Workflow::new("t", "Test", "", vec![WorkflowAction::move_to(500.0, 500.0)]));
        assert_eq!(out, RunOutcome::Cancelled);
        assert_eq!(engine.agent_state(), AgentState::default());
    }

    #[test]
    fn stop_during_last_action_reports_cancelled() {
        let engine = ticking(|engine, now| {
            if now >= 100.0 {
                engine.stop();
            }
        });
        let out = engine.execute_workflow(&Workflow::new("t", "Test", "", vec![WorkflowAction::wait(500)]));
        assert_eq!(out, RunOutcome::Cancelled);
        assert!(!engine.is_running());
    }

    #[test]
    fn huge_typing_speed_saturates_and_stays_cancellable() {
        let engine = ticking(|engine, now| {
            if now >= 1000.0 {
                engine.stop();
            }
        });
        let out = engine.execute_workflow(&Workflow::new("t", "Test", "", vec![WorkflowAction::type_text("abc", u64::MAX)]));
        assert_eq!(out, RunOutcome::Cancelled);
        assert!(!engine.agent_state().is_typing);
    }

    #[test]
    fn animation_ends_exactly_on_target() {
        let h = harness();
        run(&h, vec![WorkflowAction::move_to(333.3, 71.7), WorkflowAction::move_to(12.5, 640.25)]);
        let pos = h.engine.agent_state().position;
        assert!((pos.x - 12.5).abs() < 1e-9 && (pos.y - 640.25).abs() < 1e-9);
    }

    #[test]
    fn animation_emits_every_frame_and_takes_its_duration() {
        let h = harness();
        run(&h, vec![WorkflowAction::Move { to: MoveTarget::Position(Point::new(160.0, 0.0)), duration_ms: Some(160) }]);
        let xs: Vec<f64> = lock(&h.updates).iter().skip(1).map(|s| s.position.x).take(11).collect();
        assert_eq!(xs.len(), 11);
        assert_eq!(xs[0], 0.0);
        assert_eq!(xs[10], 160.0);
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        // 160ms of motion plus the 300ms inter-action pause.
        assert_eq!(h.clock.now_ms(), 460.0);
    }

    #[test]
    fn reaches_element_centre_relative_to_container() {
        let h = harness();
        let layout = StaticLayout::new(Rect::new(100.0, 100.0, 500.0, 500.0))
            .with(Selector::dock_icon("mail"), Rect::new(300.0, 500.0, 40.0, 60.0));
        h.engine.set_container(Arc::new(layout));
        run(&h, vec![WorkflowAction::move_to_dock("mail")]);
        assert_eq!(h.engine.agent_state().position, Point::new(220.0, 430.0));
    }

    #[test]
    fn unresolved_target_leaves_cursor_and_costs_only_the_pause() {
        let h = harness();
        run(&h, vec![WorkflowAction::move_to(50.0, 60.0)]);
        let before = h.clock.now_ms();
        run(&h, vec![WorkflowAction::move_to_element(Selector::cell("Z99")), WorkflowAction::move_to_app("safari")]);
        assert_eq!(h.engine.agent_state().position, Point::new(50.0, 60.0));
        assert_eq!(h.clock.now_ms() - before, 600.0);
    }

    #[test]
    fn missing_container_is_a_miss_not_a_panic() {
        let clock = Arc::new(ManualScheduler::default());
        let engine = AgentController::new(Arc::new(Store::new()), Arc::new(NoHooks), clock, Timings::default());
        let out = engine.execute_workflow(&Workflow::new("t", "T", "", vec![WorkflowAction::move_to_app("notes")]));
        assert_eq!(out, RunOutcome::Completed);
        assert_eq!(engine.agent_state().position, Point::ORIGIN);
    }

    #[test]
    fn click_pulses_then_releases() {
        let h = harness();
        run(&h, vec![WorkflowAction::click()]);
        let flags: Vec<bool> = lock(&h.updates).iter().map(|s| s.is_clicking).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(h.clock.now_ms(), 150.0 + 150.0 + 300.0);
    }

    #[test]
    fn double_click_is_two_pulses() {
        let h = harness();
        run(&h, vec![WorkflowAction::open_app("notes")]);
        let presses = lock(&h.updates).iter().filter(|s| s.is_clicking).count();
        assert_eq!(presses, 2);
        assert_eq!(h.clock.now_ms(), 300.0 + 100.0 + 300.0 + 300.0);
    }

    #[test]
    fn typing_lasts_length_times_speed() {
        let h = harness();
        run(&h, vec![WorkflowAction::type_text("héllo", 40)]);
        assert_eq!(h.clock.now_ms(), 5.0 * 40.0 + 300.0);
        let s = h.engine.agent_state();
        assert!(!s.is_typing);
        assert_eq!(s.workflow_name, "Test");
    }

    #[test]
    fn wait_defaults_to_one_second() {
        let h = harness();
        run(&h, vec![WorkflowAction::Wait { duration_ms: None }, WorkflowAction::Drag]);
        assert_eq!(h.clock.now_ms(), 1000.0 + 300.0 + 300.0);
    }

    #[test]
    fn type_in_app_routes_into_store() {
        let h = harness();
        let store = Arc::clone(h.engine.store());
        store.select_note("1");
        run(&h, vec![
            WorkflowAction::type_in(AppInput::Gmail(EmailField::Subject), "Status", 1),
            WorkflowAction::type_in(AppInput::Gmail(EmailField::To), "ceo@emergentlabs.ai", 1),
            WorkflowAction::type_in(AppInput::TextEdit { document_id: None }, "Draft", 1),
            WorkflowAction::type_in(AppInput::Messages, "typing...", 1),
            WorkflowAction::type_in(AppInput::Notes, "Results", 1),
            WorkflowAction::fill_cell("E5", "99", 1),
        ]);
        let s = store.get_state();
        let draft = s.gmail.composing.as_ref().unwrap();
        assert_eq!((draft.subject.as_str(), draft.to.as_str()), ("Status", "ceo@emergentlabs.ai"));
        assert_eq!(s.text_edit.documents["default"].content, "Draft");
        assert_eq!(s.messages.composing_message.as_deref(), Some("typing..."));
        assert_eq!(s.selected_note().unwrap().content, "Results");
        assert_eq!(s.cell_value("E5"), Some("99"));
    }

    #[test]
    fn notes_text_without_selection_is_dropped() {
        let h = harness();
        let before = h.engine.store().get_state();
        run(&h, vec![WorkflowAction::type_in(AppInput::Notes, "lost", 1)]);
        assert!(Arc::ptr_eq(&before, &h.engine.store().get_state()));
    }

    #[test]
    fn select_cell_moves_clicks_and_selects() {
        let h = harness();
        run(&h, vec![WorkflowAction::select_cell("B3")]);
        let cell = StaticLayout::demo_desktop().query(&Selector::cell("B3")).unwrap();
        let expected = cell.center_within(&StaticLayout::demo_desktop().bounds());
        assert_eq!(h.engine.agent_state().position, expected);
        assert_eq!(h.engine.store().get_state().spreadsheet.selected_cell.as_deref(), Some("B3"));
    }

    #[test]
    fn send_email_falls_back_to_draft() {
        let h = harness();
        let store = Arc::clone(h.engine.store());
        store.update_composing_email(EmailPatch { subject: Some("Weekly".into()), to: Some("team@x".into()), ..Default::default() });
        run(&h, vec![WorkflowAction::SendEmail { to: None, subject: None, body: Some("All good".into()) }]);
        let s = store.get_state();
        assert!(s.gmail.composing.is_none());
        let sent = &s.gmail.emails[0];
        assert_eq!((sent.to.as_str(), sent.subject.as_str(), sent.body.as_str()), ("team@x", "Weekly", "All good"));
        assert_eq!(sent.from, AGENT_ADDRESS);
        assert!(!sent.is_draft);
    }

    #[test]
    fn pwd_uses_store_directory() {
        let h = harness();
        run(&h, vec![WorkflowAction::run_command("pwd")]);
        let cmds = &h.engine.store().get_state().terminal.commands;
        assert_eq!(cmds[0].output, "~/projects/emergent-labs");
    }

    #[test]
    fn reset_zeroes_state() {
        let h = harness();
        run(&h, vec![WorkflowAction::move_to(10.0, 10.0)]);
        h.engine.reset();
        assert_eq!(h.engine.agent_state(), AgentState::default());
        assert!(!h.engine.is_running());
    }

    #[test]
    fn listener_is_replaced_not_stacked() {
        let h = harness();
        let second: Arc<Mutex<usize>> = Arc::default();
        let s = Arc::clone(&second);
        h.engine.on_update(move |_| *lock(&s) += 1);
        let before = lock(&h.updates).len();
        run(&h, vec![WorkflowAction::click()]);
        assert_eq!(lock(&h.updates).len(), before);
        assert_eq!(*lock(&second), 3);
    }
}
