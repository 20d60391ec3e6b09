//! Data held by the mock desktop applications.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const AGENT_ADDRESS: &str = "agent@emergentlabs.ai";
pub const DEFAULT_DOCUMENT: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub is_draft: bool,
}

/// Partial update applied to the composing draft; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailPatch {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetCell {
    pub value: String,
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Formatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: Align,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextDocument {
    pub content: String,
    pub formatting: Formatting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_from_agent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalCommand {
    pub id: String,
    pub command: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmailState {
    pub emails: Vec<EmailMessage>,
    pub selected_email_id: Option<String>,
    pub composing: Option<EmailMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetState {
    pub cells: BTreeMap<String, SpreadsheetCell>,
    pub selected_cell: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEditState {
    pub documents: BTreeMap<String, TextDocument>,
    pub active_document_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesState {
    pub conversations: BTreeMap<String, Vec<Message>>,
    pub active_conversation_id: Option<String>,
    pub composing_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarState {
    pub events: Vec<CalendarEvent>,
    pub selected_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesState {
    pub notes: Vec<Note>,
    pub selected_note_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalState {
    pub commands: Vec<TerminalCommand>,
    pub current_directory: String,
}

/// Every mock application's data in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub gmail: GmailState,
    pub spreadsheet: SpreadsheetState,
    pub text_edit: TextEditState,
    pub messages: MessagesState,
    pub calendar: CalendarState,
    pub notes: NotesState,
    pub terminal: TerminalState,
}

fn cell(value: &str) -> SpreadsheetCell {
    SpreadsheetCell { value: value.to_string(), formula: None }
}

fn chat(id: &str, sender: &str, content: &str, timestamp: DateTime<Utc>) -> Message {
    Message {
        id: id.to_string(),
        sender: sender.to_string(),
        content: content.to_string(),
        timestamp,
        is_from_agent: false,
    }
}

impl AppState {
    /// Demo data the desktop boots with. Relative timestamps hang off `now`.
    pub fn seed(now: DateTime<Utc>) -> Self {
        let emails = vec![
            EmailMessage {
                id: "1".into(),
                from: "team@emergentlabs.ai".into(),
                to: "user@emergentlabs.ai".into(),
                subject: "Welcome to Emergent Labs!".into(),
                body: "We are excited to have you on board.".into(),
                timestamp: now,
                is_read: false,
                is_draft: false,
            },
            EmailMessage {
                id: "2".into(),
                from: "research@ai-conference.com".into(),
                to: "user@emergentlabs.ai".into(),
                subject: "AI Conference 202y - Speaker Invitation".into(),
                body: "We would be honored to have you speak at our upcoming conference about autonomous agents.".into(),
                timestamp: now - Duration::hours(2),
                is_read: true,
                is_draft: false,
            },
        ];

        let cells = [
            ("A1", "Company"),
            ("B1", "AI Focus"),
            ("C1", "Founded"),
            ("A2", "Emergent Labs"),
            ("B2", "Autonomous Agents"),
            ("C2", "2023"),
        ]
        .into_iter()
        .map(|(id, v)| (id.to_string(), cell(v)))
        .collect();

        let mut documents = BTreeMap::new();
        documents.insert(DEFAULT_DOCUMENT.to_string(), TextDocument::default());

        let mut conversations = BTreeMap::new();
        conversations.insert(
            "team".to_string(),
            vec![
                chat("1", "Alex", "Hey, have you seen the new AI agent demo?", now - Duration::minutes(30)),
                chat("2", "Sarah", "Yes! It's incredible how it can manage multiple apps.", now - Duration::minutes(20)),
            ],
        );

        Self {
            gmail: GmailState { emails, selected_email_id: None, composing: None },
            spreadsheet: SpreadsheetState { cells, selected_cell: None },
            text_edit: TextEditState {
                documents,
                active_document_id: DEFAULT_DOCUMENT.to_string(),
            },
            messages: MessagesState {
                conversations,
                active_conversation_id: Some("team".to_string()),
                composing_message: None,
            },
            calendar: CalendarState {
                events: vec![CalendarEvent {
                    id: "1".into(),
                    title: "AI Agent Demo".into(),
                    start_time: now + Duration::hours(1),
                    end_time: now + Duration::hours(2),
                    description: Some("Demonstrating the new autonomous agent capabilities".into()),
                }],
                selected_date: now,
            },
            notes: NotesState {
                notes: vec![Note {
                    id: "1".into(),
                    title: "Agent Architecture".into(),
                    content: "Key components:\n- State management\n- Action execution\n- Multi-app coordination".into(),
                    last_modified: now,
                }],
                selected_note_id: None,
            },
            terminal: TerminalState {
                commands: Vec::new(),
                current_directory: "~/projects/emergent-labs".to_string(),
            },
        }
    }

    pub fn cell_value(&self, id: &str) -> Option<&str> {
        self.spreadsheet.cells.get(id).map(|c| c.value.as_str())
    }

    pub fn selected_note(&self) -> Option<&Note> {
        let id = self.notes.selected_note_id.as_deref()?;
        self.notes.notes.iter().find(|n| n.id == id)
    }
}
