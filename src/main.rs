use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use emergent_core::catalog::Catalog;
use emergent_core::layout::StaticLayout;
use emergent_core::logger::{self, LogRecord};
use emergent_core::scheduler::RealtimeScheduler;
use emergent_core::settings::Settings;
use emergent_core::types::{Command, RunnerState};
use emergent_core::{orchestrator, AgentController, Store};
use emergent_tui::DesktopHooks;

fn main() -> Result<()> {
    let fast = std::env::args().any(|a| a == "--fast");

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    logger::init(&cwd.join("logs"))?;

    let settings_path = cwd.join("settings.json");
    let settings = Settings::load(&settings_path);
    let timings = if fast { settings.timings.scaled(4) } else { settings.timings.clone() };

    let store = Arc::new(Store::new());
    let hooks = Arc::new(DesktopHooks::new(Arc::clone(&store)));
    let windows = Arc::clone(&hooks.windows);
    let engine = Arc::new(AgentController::new(
        Arc::clone(&store),
        hooks,
        Arc::new(RealtimeScheduler::new(timings.frame_ms)),
        timings,
    ));
    let layout = Arc::new(StaticLayout::demo_desktop());
    engine.set_container(layout.clone());

    let workflows_dir = if settings.workflows_dir.is_absolute() {
        settings.workflows_dir.clone()
    } else {
        cwd.join(&settings.workflows_dir)
    };
    let catalog = Arc::new(Catalog::load(&workflows_dir));
    logger::info(&format!("loaded {} workflow(s)", catalog.len()));

    let runner_state = Arc::new(Mutex::new(RunnerState::Idle));

    let (log_tx, log_rx) = mpsc::channel::<LogRecord>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    logger::set_tui_sender(log_tx);
    logger::info("emergent started");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = emergent_tui::App::new(
        Arc::clone(&catalog),
        Arc::clone(&engine),
        layout,
        Arc::clone(&runner_state),
        windows,
        log_rx,
        cmd_tx,
        settings,
        settings_path,
    );

    // Workflows block while they play, so they run off the UI thread
    let runner = thread::spawn(move || {
        orchestrator::orchestrate(engine, catalog, runner_state, cmd_rx);
    });

    let result = emergent_tui::event::run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    drop(app);
    runner.join().ok();
    result
}
