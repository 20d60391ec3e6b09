use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use emergent_core::catalog::Catalog;
use emergent_core::layout::StaticLayout;
use emergent_core::logger::LogRecord;
use emergent_core::settings::Settings;
use emergent_core::state::AppState;
use emergent_core::store::Subscription;
use emergent_core::types::{AgentState, Command, RunnerState};
use emergent_core::AgentController;

use crate::confirm::ConfirmDialog;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct App {
    pub catalog: Arc<Catalog>,
    pub engine: Arc<AgentController>,
    pub layout: Arc<StaticLayout>,
    pub runner_state: Arc<Mutex<RunnerState>>,
    pub windows: Arc<Mutex<Vec<String>>>,
    /// Latest snapshots pushed by the engine and the store.
    pub agent: Arc<Mutex<AgentState>>,
    pub desktop: Arc<Mutex<Arc<AppState>>>,
    pub selected: usize,
    pub log_visible: bool,
    pub log_messages: Vec<LogRecord>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<LogRecord>,
    pub cmd_tx: mpsc::Sender<Command>,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
    settings: Settings,
    settings_path: PathBuf,
    store_sub: Option<Subscription>,
}

impl App {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<Catalog>,
        engine: Arc<AgentController>,
        layout: Arc<StaticLayout>,
        runner_state: Arc<Mutex<RunnerState>>,
        windows: Arc<Mutex<Vec<String>>>,
        log_rx: mpsc::Receiver<LogRecord>,
        cmd_tx: mpsc::Sender<Command>,
        settings: Settings,
        settings_path: PathBuf,
    ) -> Self {
        let agent = Arc::new(Mutex::new(engine.agent_state()));
        let sink = Arc::clone(&agent);
        engine.on_update(move |s| *lock(&sink) = s.clone());

        let store = Arc::clone(engine.store());
        let desktop = Arc::new(Mutex::new(store.get_state()));
        let sink = Arc::clone(&desktop);
        let store_sub = store.subscribe(move |s| *lock(&sink) = Arc::clone(s));

        let selected = settings
            .last_workflow
            .as_deref()
            .and_then(|id| catalog.index_of(id))
            .unwrap_or(0);

        Self {
            catalog,
            engine,
            layout,
            runner_state,
            windows,
            agent,
            desktop,
            selected,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            cmd_tx,
            confirm: None,
            should_quit: false,
            settings,
            settings_path,
            store_sub: Some(store_sub),
        }
    }

    pub fn drain_logs(&mut self) {
        while let Ok(record) = self.log_rx.try_recv() {
            self.log_messages.push(record);
            if self.log_scroll > 0 {
                // keep the viewport pinned while scrolled back
                self.log_scroll += 1;
            }
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.catalog.len() {
            self.selected += 1;
        }
    }

    pub fn runner_state(&self) -> RunnerState {
        *lock(&self.runner_state)
    }

    pub fn run_selected(&mut self) {
        if self.runner_state() != RunnerState::Idle {
            return;
        }
        let Some(workflow) = self.catalog.at(self.selected) else { return };
        self.settings.last_workflow = Some(workflow.id.clone());
        self.settings.save(&self.settings_path);
        self.cmd_tx.send(Command::Run(self.selected)).ok();
    }

    pub fn stop(&mut self) {
        let mut state = lock(&self.runner_state);
        if *state == RunnerState::Running {
            *state = RunnerState::Stopping;
            self.engine.stop();
        }
    }

    pub fn request_reset(&mut self) {
        self.confirm = Some(ConfirmDialog::new("Reset the desktop?"));
    }

    /// Close the confirm dialog, resetting if the user chose Yes.
    pub fn answer_confirm(&mut self, accept: bool) {
        if self.confirm.take().is_some() && accept {
            self.stop();
            lock(&self.windows).clear();
            self.cmd_tx.send(Command::Reset).ok();
        }
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    pub fn quit(&mut self) {
        self.engine.stop();
        if let Some(sub) = self.store_sub.take() {
            sub.unsubscribe();
        }
        self.cmd_tx.send(Command::Quit).ok();
        self.should_quit = true;
    }
}
