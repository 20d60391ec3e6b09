use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use crate::catalog::Catalog;
use crate::engine::{AgentController, RunOutcome};
use crate::logger;
use crate::types::{Command, RunnerState};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// Apply a non-run command. Returns false on Quit.
fn apply(cmd: Command, engine: &AgentController) -> bool {
    match cmd {
        Command::Quit => {
            logger::info("shutting down");
            engine.stop();
            false
        }
        Command::Reset => {
            engine.reset();
            engine.store().reset();
            logger::info("desktop reset");
            true
        }
        Command::Run(_) => true,
    }
}

/// Commands that piled up during a run. Queued runs are discarded: a
/// request made while a workflow was playing is not replayed later.
fn drain_after_run(cmd_rx: &mpsc::Receiver<Command>, engine: &AgentController) -> bool {
    while let Ok(cmd) = cmd_rx.try_recv() {
        match cmd {
            Command::Run(idx) => logger::warn(&format!("dropped run request #{} made while busy", idx)),
            other => {
                if !apply(other, engine) {
                    return false;
                }
            }
        }
    }
    true
}

/// Runner loop. Runs on a background thread; workflows execute here so
/// the UI thread stays free to call `engine.stop()`.
pub fn orchestrate(
    engine: Arc<AgentController>,
    catalog: Arc<Catalog>,
    runner_state: Arc<Mutex<RunnerState>>,
    cmd_rx: mpsc::Receiver<Command>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        let Command::Run(idx) = cmd else {
            if !apply(cmd, &engine) {
                return;
            }
            continue;
        };
        let Some(workflow) = catalog.at(idx) else {
            logger::warn(&format!("no workflow at index {}", idx));
            continue;
        };

        *lock(&runner_state) = RunnerState::Running;
        let outcome = engine.execute_workflow(workflow);
        *lock(&runner_state) = RunnerState::Idle;
        if outcome == RunOutcome::Rejected {
            logger::warn(&format!("{} rejected, engine busy", workflow.name));
        }

        if !drain_after_run(&cmd_rx, &engine) {
            return;
        }
    }
    engine.stop();
}
