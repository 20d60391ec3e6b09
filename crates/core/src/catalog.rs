use std::path::{Path, PathBuf};

use crate::layout::Selector;
use crate::logger;
use crate::lua_rt;
use crate::workflow::{AppInput, EmailField, Workflow, WorkflowAction as A};

/// Recursively find workflow files under `dir`: every `main.lua` (one per
/// directory; its subdirectories are not searched) and every `*.json`.
pub fn find_workflow_files(dir: &Path) -> Vec<PathBuf> {
    let mut results = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return results,
    };
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();
    for path in paths {
        let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            let main_lua = path.join("main.lua");
            if main_lua.is_file() {
                results.push(main_lua);
            } else {
                results.extend(find_workflow_files(&path));
            }
        } else if path.extension().is_some_and(|e| e == "json") {
            results.push(path);
        }
    }
    results
}

fn load_file(path: &Path) -> anyhow::Result<Workflow> {
    if path.extension().is_some_and(|e| e == "json") {
        let json = std::fs::read_to_string(path)?;
        Workflow::from_json(&json)
    } else {
        lua_rt::load_workflow_script(path)
    }
}

/// Ordered set of workflows the caller picks from by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    workflows: Vec<Workflow>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self { workflows: demo_workflows() }
    }

    /// Built-ins plus every workflow under `dir`. Files that fail to load
    /// are logged and left out; a loaded workflow replaces a built-in with
    /// the same id.
    pub fn load(dir: &Path) -> Self {
        logger::register_prefix("catalog", logger::COLOR_GRAY);
        let mut catalog = Self::builtin();
        for path in find_workflow_files(dir) {
            match load_file(&path) {
                Ok(wf) => {
                    logger::info_p("catalog", &format!("loaded {} from {}", wf.id, path.display()));
                    catalog.insert(wf);
                }
                Err(e) => logger::error_p("catalog", &format!("failed to load {}: {}", path.display(), e)),
            }
        }
        catalog
    }

    pub fn insert(&mut self, workflow: Workflow) {
        match self.workflows.iter_mut().find(|w| w.id == workflow.id) {
            Some(existing) => *existing = workflow,
            None => self.workflows.push(workflow),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.workflows.iter().position(|w| w.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workflow> {
        self.workflows.iter()
    }

    pub fn at(&self, index: usize) -> Option<&Workflow> {
        self.workflows.get(index)
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

fn fill(cell: &str, text: &str) -> [A; 3] {
    [A::select_cell(cell), A::fill_cell(cell, text, 80), A::wait(300)]
}

/// The demo workflows shipped with the desktop.
pub fn demo_workflows() -> Vec<Workflow> {
    let mut research = vec![
        A::move_to_dock("safari"),
        A::wait(500),
        A::open_app("safari"),
        A::wait(2000),
        A::move_to(400.0, 200.0),
        A::click(),
        A::type_text("emergent labs AI agents", 60),
        A::wait(1500),
        A::move_to_app("numbers"),
        A::wait(500),
        A::open_app("numbers"),
        A::wait(1500),
    ];
    for (cell, text) in [("A1", "Company"), ("B1", "AI Focus"), ("A2", "Emergent Labs"), ("B2", "Autonomous Agents")] {
        research.extend(fill(cell, text));
    }
    research.push(A::wait(1000));

    let content = vec![
        A::move_to_app("textedit"),
        A::wait(500),
        A::open_app("textedit"),
        A::wait(1500),
        A::move_to(400.0, 300.0),
        A::click(),
        A::type_in(AppInput::TextEdit { document_id: None }, "The Future of AI Agents", 70),
        A::wait(500),
        A::move_to_element(Selector { attr: "data-format-bold".into(), value: None }),
        A::click(),
        A::wait(300),
        A::move_to(400.0, 350.0),
        A::click(),
        A::type_in(
            AppInput::TextEdit { document_id: None },
            "The Future of AI Agents\n\nAI agents are transforming how we work...",
            60,
        ),
        A::wait(1000),
    ];

    let analysis = vec![
        A::move_to_dock("terminal"),
        A::wait(500),
        A::click_app("terminal"),
        A::wait(1500),
        A::move_to(400.0, 300.0),
        A::click(),
        A::type_text("python analyze_data.py", 50),
        A::run_command("python analyze_data.py"),
        A::wait(1000),
        A::move_to_app("notes"),
        A::wait(500),
        A::open_app("notes"),
        A::wait(1500),
        A::move_to(400.0, 250.0),
        A::click(),
        A::type_in(
            AppInput::Notes,
            "Analysis Results:\n- Data shows 45% improvement\n- Key metrics trending up",
            65,
        ),
        A::wait(1500),
        A::move_to_dock("numbers"),
        A::click_app("numbers"),
        A::wait(1000),
    ];

    let coordination = vec![
        A::move_to_app("calendar"),
        A::wait(500),
        A::open_app("calendar"),
        A::wait(2000),
        A::move_to(500.0, 300.0),
        A::wait(1000),
        A::move_to_app("messages"),
        A::wait(500),
        A::open_app("messages"),
        A::wait(1500),
        A::move_to(400.0, 400.0),
        A::click(),
        A::type_in(AppInput::Messages, "Team meeting at 3pm today!", 70),
        A::SendMessage { conversation_id: "team".into(), text: "Team meeting at 3pm today!".into() },
        A::wait(1000),
        A::move_to_dock("mail"),
        A::click_app("mail"),
        A::wait(1500),
    ];

    let inbox = vec![
        A::move_to_dock("mail"),
        A::open_app("mail"),
        A::wait(1000),
        A::move_to(420.0, 180.0),
        A::click(),
        A::type_in(AppInput::Gmail(EmailField::To), "research@ai-conference.com", 50),
        A::type_in(AppInput::Gmail(EmailField::Subject), "Re: Speaker Invitation", 60),
        A::type_in(AppInput::Gmail(EmailField::Body), "Happy to speak about autonomous agents.", 50),
        A::SendEmail { to: None, subject: None, body: None },
        A::wait(800),
        A::move_to_dock("terminal"),
        A::open_app("terminal"),
        A::run_command("echo invitation accepted"),
        A::wait(500),
        A::move_to_app("messages"),
        A::open_app("messages"),
        A::SendMessage { conversation_id: "team".into(), text: "I'm speaking at the AI conference!".into() },
        A::wait(1000),
    ];

    vec![
        Workflow::new("research-workflow", "Research Assistant", "Gather data from web and organize in spreadsheet", research),
        Workflow::new("content-creation", "Content Creator", "Write and format a document", content),
        Workflow::new("data-analysis", "Hari's Workflow", "Analyze data across multiple apps", analysis),
        Workflow::new("communication-workflow", "Team Coordinator", "Check calendar and send messages", coordination),
        Workflow::new("inbox-assistant", "Inbox Assistant", "Reply to mail and tell the team", inbox),
    ]
}
