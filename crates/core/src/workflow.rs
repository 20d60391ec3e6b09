//! Workflow data model.
//!
//! Authored workflows (Lua scripts, JSON files) arrive as loosely shaped
//! [`RawAction`]s. [`WorkflowAction::from_raw`] checks each kind's required
//! fields once; anything that fails is dropped with a warning so the rest
//! of the workflow still runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::{Selector, CELL_ATTR};
use crate::logger;
use crate::types::Point;

/// Authored action before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub speed: Option<u64>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RawAction {
    fn data_str(&self, key: &str) -> Option<String> {
        self.data
            .as_ref()?
            .get(key)?
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn text(&self) -> Option<String> {
        self.text.clone().filter(|t| !t.is_empty())
    }

    fn target(&self) -> Option<String> {
        self.target.clone().filter(|t| !t.is_empty())
    }
}

/// Authored workflow before validation; actions stay untyped so one bad
/// entry cannot reject its siblings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveTarget {
    Position(Point),
    Element(Selector),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailField {
    To,
    Subject,
    Body,
}

/// Where `typeInApp` text lands in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum AppInput {
    Gmail(EmailField),
    Numbers { cell_id: String },
    /// `None` targets the active document.
    TextEdit { document_id: Option<String> },
    Messages,
    /// The currently selected note.
    Notes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowAction {
    Move { to: MoveTarget, duration_ms: Option<u64> },
    MoveToApp { app_id: String },
    MoveToDock { app_id: String },
    Click { app_id: Option<String> },
    DoubleClick { app_id: Option<String> },
    Type { text: String, speed_ms: Option<u64>, target: Option<String> },
    TypeInApp { input: AppInput, text: String, speed_ms: Option<u64> },
    SelectCell { cell_id: String },
    SendMessage { conversation_id: String, text: String },
    /// Fields left `None` are taken from the composing draft.
    SendEmail { to: Option<String>, subject: Option<String>, body: Option<String> },
    ExecuteCommand { command: String },
    Wait { duration_ms: Option<u64> },
    /// Recognised but not animated yet.
    Drag,
}

/// Why a raw action was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    UnknownKind(String),
    Missing { kind: String, field: &'static str },
    BadSelector(String),
    UnknownApp(String),
}

impl std::fmt::Display for Malformed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Malformed::UnknownKind(k) => write!(f, "unknown action type \"{}\"", k),
            Malformed::Missing { kind, field } => write!(f, "{} requires {}", kind, field),
            Malformed::BadSelector(s) => write!(f, "unsupported selector {}", s),
            Malformed::UnknownApp(a) => write!(f, "typeInApp has no route for app \"{}\"", a),
        }
    }
}

fn missing(kind: &str, field: &'static str) -> Malformed {
    Malformed::Missing { kind: kind.to_string(), field }
}

fn parse_selector(s: &str) -> Result<Selector, Malformed> {
    Selector::parse(s).ok_or_else(|| Malformed::BadSelector(s.to_string()))
}

/// Cell id from either a bare id (`A1`) or a cell selector.
fn cell_id_of(s: &str) -> String {
    match Selector::parse(s) {
        Some(sel) if sel.attr == CELL_ATTR => sel.value.unwrap_or_default(),
        _ => s.to_string(),
    }
}

impl WorkflowAction {
    pub fn from_raw(raw: &RawAction) -> Result<Self, Malformed> {
        let kind = raw.kind.as_str();
        let action = match kind {
            "move" => {
                let to = match (raw.position, raw.target()) {
                    (Some(p), _) => MoveTarget::Position(p),
                    (None, Some(t)) => MoveTarget::Element(parse_selector(&t)?),
                    (None, None) => return Err(missing(kind, "position or target")),
                };
                Self::Move { to, duration_ms: raw.duration }
            }
            "moveToApp" => Self::MoveToApp { app_id: raw.target().ok_or_else(|| missing(kind, "target"))? },
            "moveToDock" => Self::MoveToDock { app_id: raw.target().ok_or_else(|| missing(kind, "target"))? },
            "click" => Self::Click { app_id: raw.target() },
            "doubleClick" => Self::DoubleClick { app_id: raw.target() },
            "type" => Self::Type {
                text: raw.text().ok_or_else(|| missing(kind, "text"))?,
                speed_ms: raw.speed,
                target: raw.target(),
            },
            "typeInApp" => {
                let app = raw.target().ok_or_else(|| missing(kind, "target"))?;
                let input = match app.as_str() {
                    "gmail" | "mail" => Self::email_field(raw.data_str("target").as_deref()),
                    "numbers" | "spreadsheet" => AppInput::Numbers {
                        cell_id: raw
                            .data_str("cellId")
                            .map(|c| cell_id_of(&c))
                            .ok_or_else(|| missing(kind, "data.cellId"))?,
                    },
                    "textedit" => AppInput::TextEdit { document_id: raw.data_str("documentId") },
                    "messages" => AppInput::Messages,
                    "notes" => AppInput::Notes,
                    _ => return Err(Malformed::UnknownApp(app)),
                };
                Self::TypeInApp {
                    input,
                    text: raw.text().ok_or_else(|| missing(kind, "text"))?,
                    speed_ms: raw.speed,
                }
            }
            "selectCell" => Self::SelectCell {
                cell_id: raw
                    .target()
                    .or_else(|| raw.data_str("cellId"))
                    .map(|c| cell_id_of(&c))
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| missing(kind, "target"))?,
            },
            "sendMessage" => Self::SendMessage {
                conversation_id: raw
                    .data_str("conversationId")
                    .or_else(|| raw.target())
                    .ok_or_else(|| missing(kind, "data.conversationId"))?,
                text: raw.text().ok_or_else(|| missing(kind, "text"))?,
            },
            "sendEmail" => Self::SendEmail {
                to: raw.data_str("to"),
                subject: raw.data_str("subject"),
                body: raw.text().or_else(|| raw.data_str("body")),
            },
            "executeCommand" => Self::ExecuteCommand {
                command: raw.text().ok_or_else(|| missing(kind, "text"))?,
            },
            "wait" => Self::Wait { duration_ms: raw.duration },
            "drag" => Self::Drag,
            other => return Err(Malformed::UnknownKind(other.to_string())),
        };
        Ok(action)
    }

    fn email_field(discriminator: Option<&str>) -> AppInput {
        AppInput::Gmail(match discriminator {
            Some("to") | Some("recipient") => EmailField::To,
            Some("subject") => EmailField::Subject,
            _ => EmailField::Body,
        })
    }

    /// Authored kind name, as used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::MoveToApp { .. } => "moveToApp",
            Self::MoveToDock { .. } => "moveToDock",
            Self::Click { .. } => "click",
            Self::DoubleClick { .. } => "doubleClick",
            Self::Type { .. } => "type",
            Self::TypeInApp { .. } => "typeInApp",
            Self::SelectCell { .. } => "selectCell",
            Self::SendMessage { .. } => "sendMessage",
            Self::SendEmail { .. } => "sendEmail",
            Self::ExecuteCommand { .. } => "executeCommand",
            Self::Wait { .. } => "wait",
            Self::Drag => "drag",
        }
    }

    // Shorthand constructors for workflows written in Rust.

    pub fn move_to(x: f64, y: f64) -> Self {
        Self::Move { to: MoveTarget::Position(Point::new(x, y)), duration_ms: None }
    }

    pub fn move_to_element(selector: Selector) -> Self {
        Self::Move { to: MoveTarget::Element(selector), duration_ms: None }
    }

    pub fn move_to_app(app_id: &str) -> Self {
        Self::MoveToApp { app_id: app_id.to_string() }
    }

    pub fn move_to_dock(app_id: &str) -> Self {
        Self::MoveToDock { app_id: app_id.to_string() }
    }

    pub fn click() -> Self {
        Self::Click { app_id: None }
    }

    pub fn click_app(app_id: &str) -> Self {
        Self::Click { app_id: Some(app_id.to_string()) }
    }

    pub fn open_app(app_id: &str) -> Self {
        Self::DoubleClick { app_id: Some(app_id.to_string()) }
    }

    pub fn type_text(text: &str, speed_ms: u64) -> Self {
        Self::Type { text: text.to_string(), speed_ms: Some(speed_ms), target: None }
    }

    pub fn type_in(input: AppInput, text: &str, speed_ms: u64) -> Self {
        Self::TypeInApp { input, text: text.to_string(), speed_ms: Some(speed_ms) }
    }

    pub fn fill_cell(cell_id: &str, text: &str, speed_ms: u64) -> Self {
        Self::type_in(AppInput::Numbers { cell_id: cell_id.to_string() }, text, speed_ms)
    }

    pub fn select_cell(cell_id: &str) -> Self {
        Self::SelectCell { cell_id: cell_id.to_string() }
    }

    pub fn wait(ms: u64) -> Self {
        Self::Wait { duration_ms: Some(ms) }
    }

    pub fn run_command(command: &str) -> Self {
        Self::ExecuteCommand { command: command.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub actions: Vec<WorkflowAction>,
}

impl Workflow {
    pub fn new(id: &str, name: &str, description: &str, actions: Vec<WorkflowAction>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            actions,
        }
    }

    /// Validate every raw action, keeping the ones that pass.
    pub fn from_raw(raw: RawWorkflow) -> Self {
        let mut actions = Vec::with_capacity(raw.actions.len());
        for (i, value) in raw.actions.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RawAction>(value)
                .map_err(|e| e.to_string())
                .and_then(|r| WorkflowAction::from_raw(&r).map_err(|e| e.to_string()));
            match parsed {
                Ok(action) => actions.push(action),
                Err(e) => logger::warn_p("catalog", &format!("{}: skipping action #{}: {}", raw.id, i, e)),
            }
        }
        Self { id: raw.id, name: raw.name, description: raw.description, actions }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let raw: RawWorkflow = serde_json::from_str(json)?;
        Ok(Self::from_raw(raw))
    }
}
