use std::sync::{Arc, Mutex};

use emergent_core::logger;
use emergent_core::{AgentHooks, Store};

/// Tracks which app windows the agent has brought up, front-most first.
pub struct DesktopHooks {
    pub windows: Arc<Mutex<Vec<String>>>,
    store: Arc<Store>,
}

impl DesktopHooks {
    pub fn new(store: Arc<Store>) -> Self {
        Self { windows: Arc::new(Mutex::new(Vec::new())), store }
    }

    fn raise(&self, app_id: &str) {
        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());
        windows.retain(|w| w != app_id);
        windows.insert(0, app_id.to_string());
    }
}

impl AgentHooks for DesktopHooks {
    fn on_app_open(&self, app_id: &str) {
        logger::info_p("desktop", &format!("open {}", app_id));
        self.raise(app_id);
        // Notes opens on its first note, so typed text has a destination.
        if app_id == "notes" {
            let state = self.store.get_state();
            if state.notes.selected_note_id.is_none() {
                if let Some(first) = state.notes.notes.first() {
                    self.store.select_note(&first.id);
                }
            }
        }
    }

    fn on_app_click(&self, app_id: &str) {
        logger::info_p("desktop", &format!("focus {}", app_id));
        self.raise(app_id);
    }

    fn on_type(&self, selector: &str, text: &str) {
        logger::info_p("desktop", &format!("typed {} chars into {}", text.chars().count(), selector));
    }
}
