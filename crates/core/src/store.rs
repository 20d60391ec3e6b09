//! Observable store shared by the engine and every mock application view.
//!
//! Each mutator clones the current snapshot, applies its change, publishes
//! the result as a fresh `Arc<AppState>` and notifies every subscriber
//! before returning. Mutators are serialized by a write gate that covers
//! both the merge and the notification, so observers see mutations one at
//! a time and in order. Listeners must not call mutators themselves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use chrono::Utc;

use crate::logger;
use crate::state::*;

pub type Listener = Arc<dyn Fn(&Arc<AppState>) + Send + Sync>;

type ListenerList = Mutex<Vec<(u64, Listener)>>;

static ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp plus a process-wide sequence number, so ids
/// minted within the same millisecond still differ.
pub fn generate_id() -> String {
    let seq = ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", Utc::now().timestamp_millis(), seq)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// Handle returned by [`Store::subscribe`].
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(list) = self.listeners.upgrade() {
            lock(&list).retain(|(id, _)| *id != self.id);
        }
    }
}

pub struct Store {
    initial: Arc<AppState>,
    current: RwLock<Arc<AppState>>,
    listeners: Arc<ListenerList>,
    next_listener: AtomicU64,
    write_gate: Mutex<()>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Store seeded with the demo data, timestamps relative to now.
    pub fn new() -> Self {
        Self::with_seed(AppState::seed(Utc::now()))
    }

    pub fn with_seed(seed: AppState) -> Self {
        logger::register_prefix("store", logger::COLOR_MAGENTA);
        let initial = Arc::new(seed);
        Self {
            current: RwLock::new(Arc::clone(&initial)),
            initial,
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
            write_gate: Mutex::new(()),
        }
    }

    pub fn get_state(&self) -> Arc<AppState> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<AppState>) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, Arc::new(listener)));
        Subscription { id, listeners: Arc::downgrade(&self.listeners) }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn publish(&self, next: Arc<AppState>) {
        {
            let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
            *guard = Arc::clone(&next);
        }
        // Snapshot the list so a listener may unsubscribe while being notified.
        let listeners: Vec<Listener> = lock(&self.listeners).iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(&next);
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut AppState)) {
        let _gate = lock(&self.write_gate);
        let mut next = AppState::clone(&self.get_state());
        apply(&mut next);
        self.publish(Arc::new(next));
    }

    // -- gmail --

    /// Prepend to the inbox and discard the draft.
    pub fn send_email(&self, email: EmailMessage) {
        self.mutate(|s| {
            s.gmail.emails.insert(0, email);
            s.gmail.composing = None;
        });
    }

    pub fn update_composing_email(&self, patch: EmailPatch) {
        self.mutate(|s| {
            let draft = s.gmail.composing.get_or_insert_with(|| EmailMessage {
                id: generate_id(),
                from: AGENT_ADDRESS.to_string(),
                to: String::new(),
                subject: String::new(),
                body: String::new(),
                timestamp: Utc::now(),
                is_read: false,
                is_draft: true,
            });
            if let Some(to) = patch.to {
                draft.to = to;
            }
            if let Some(subject) = patch.subject {
                draft.subject = subject;
            }
            if let Some(body) = patch.body {
                draft.body = body;
            }
        });
    }

    pub fn select_email(&self, email_id: &str) {
        self.mutate(|s| s.gmail.selected_email_id = Some(email_id.to_string()));
    }

    // -- spreadsheet --

    /// Write a cell and make it the selection.
    pub fn update_cell(&self, cell_id: &str, value: &str, formula: Option<&str>) {
        self.mutate(|s| {
            s.spreadsheet.cells.insert(
                cell_id.to_string(),
                SpreadsheetCell { value: value.to_string(), formula: formula.map(str::to_string) },
            );
            s.spreadsheet.selected_cell = Some(cell_id.to_string());
        });
    }

    pub fn select_cell(&self, cell_id: &str) {
        self.mutate(|s| s.spreadsheet.selected_cell = Some(cell_id.to_string()));
    }

    // -- text edit --

    /// Replace a document's content; unseen ids become new documents.
    pub fn update_document(&self, document_id: &str, content: &str) {
        self.mutate(|s| {
            s.text_edit
                .documents
                .entry(document_id.to_string())
                .or_default()
                .content = content.to_string();
        });
    }

    // -- messages --

    /// Append to a conversation, creating it on first use, and clear the
    /// composing buffer.
    pub fn send_message(&self, conversation_id: &str, message: Message) {
        self.mutate(|s| {
            s.messages
                .conversations
                .entry(conversation_id.to_string())
                .or_default()
                .push(message);
            s.messages.composing_message = None;
        });
    }

    pub fn update_composing_message(&self, content: &str) {
        self.mutate(|s| s.messages.composing_message = Some(content.to_string()));
    }

    pub fn set_active_conversation(&self, conversation_id: &str) {
        self.mutate(|s| s.messages.active_conversation_id = Some(conversation_id.to_string()));
    }

    // -- calendar --

    pub fn add_event(&self, event: CalendarEvent) {
        self.mutate(|s| s.calendar.events.push(event));
    }

    // -- notes --

    /// Replace a note's content; unseen ids become new untitled notes.
    pub fn update_note(&self, note_id: &str, content: &str) {
        let now = Utc::now();
        self.mutate(|s| match s.notes.notes.iter_mut().find(|n| n.id == note_id) {
            Some(note) => {
                note.content = content.to_string();
                note.last_modified = now;
            }
            None => s.notes.notes.push(Note {
                id: note_id.to_string(),
                title: "Untitled".to_string(),
                content: content.to_string(),
                last_modified: now,
            }),
        });
    }

    pub fn select_note(&self, note_id: &str) {
        self.mutate(|s| s.notes.selected_note_id = Some(note_id.to_string()));
    }

    // -- terminal --

    pub fn execute_command(&self, command: &str, output: &str) {
        let entry = TerminalCommand {
            id: generate_id(),
            command: command.to_string(),
            output: output.to_string(),
            timestamp: Utc::now(),
        };
        self.mutate(|s| s.terminal.commands.push(entry));
    }

    /// Restore the seed captured at construction.
    pub fn reset(&self) {
        let _gate = lock(&self.write_gate);
        logger::info_p("store", "reset to seed state");
        self.publish(Arc::clone(&self.initial));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(store: &Store) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = store.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, sub)
    }

    fn agent_message(content: &str) -> Message {
        Message {
            id: generate_id(),
            sender: "Agent".into(),
            content: content.into(),
            timestamp: Utc::now(),
            is_from_agent: true,
        }
    }

    #[test]
    fn mutation_publishes_new_snapshot_to_every_subscriber() {
        let store = Store::new();
        let before = store.get_state();
        let seen: Arc<Mutex<Vec<Arc<AppState>>>> = Arc::default();
        let s1 = Arc::clone(&seen);
        let _a = store.subscribe(move |st| lock(&s1).push(Arc::clone(st)));
        let (hits, _b) = counting(&store);

        store.update_cell("D4", "42", None);

        let after = store.get_state();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let seen = lock(&seen);
        assert_eq!(seen.len(), 1);
        assert!(Arc::ptr_eq(&seen[0], &after));
        assert_eq!(after.cell_value("D4"), Some("42"));
        assert_eq!(after.spreadsheet.selected_cell.as_deref(), Some("D4"));
    }

    #[test]
    fn every_mutator_publishes_once() {
        fn noop(_: &Store) {}
        let cases: [(&str, fn(&Store), fn(&Store)); 14] = [
            ("send_email", noop, |s| {
                s.send_email(EmailMessage {
                    id: generate_id(),
                    from: AGENT_ADDRESS.into(),
                    to: "a@b.c".into(),
                    subject: "Hi".into(),
                    body: String::new(),
                    timestamp: Utc::now(),
                    is_read: false,
                    is_draft: false,
                })
            }),
            ("update_composing_email", noop, |s| {
                s.update_composing_email(EmailPatch { body: Some("x".into()), ..Default::default() })
            }),
            ("select_email", noop, |s| s.select_email("1")),
            ("update_cell", noop, |s| s.update_cell("F9", "1", None)),
            ("select_cell", noop, |s| s.select_cell("A1")),
            ("update_document", noop, |s| s.update_document("default", "x")),
            ("send_message", noop, |s| s.send_message("team", agent_message("x"))),
            ("update_composing_message", noop, |s| s.update_composing_message("x")),
            ("set_active_conversation", noop, |s| s.set_active_conversation("ops")),
            ("add_event", noop, |s| {
                s.add_event(CalendarEvent {
                    id: generate_id(),
                    title: "Sync".into(),
                    start_time: Utc::now(),
                    end_time: Utc::now(),
                    description: None,
                })
            }),
            ("update_note", noop, |s| s.update_note("1", "x")),
            ("select_note", noop, |s| s.select_note("1")),
            ("execute_command", noop, |s| s.execute_command("ls", "x")),
            ("reset", |s| s.select_cell("A1"), |s| s.reset()),
        ];

        for (name, prepare, mutate) in cases {
            let store = Store::new();
            prepare(&store);
            let before = store.get_state();
            let (hits, _sub) = counting(&store);
            mutate(&store);
            assert!(!Arc::ptr_eq(&before, &store.get_state()), "{} kept the old snapshot", name);
            assert_eq!(hits.load(Ordering::SeqCst), 1, "{} notification count", name);
        }
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new();
        let (hits, sub) = counting(&store);
        store.select_cell("A1");
        sub.unsubscribe();
        store.select_cell("B1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn reset_restores_seed_exactly() {
        let store = Store::new();
        let seed = AppState::clone(&store.get_state());
        store.update_cell("A1", "changed", Some("=1"));
        store.send_message("team", agent_message("hi"));
        store.execute_command("ls", "x");
        store.update_note("1", "rewritten");
        let (hits, _sub) = counting(&store);
        store.reset();
        assert_eq!(*store.get_state(), seed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn send_message_creates_unseen_conversation() {
        let store = Store::new();
        store.update_composing_message("draft");
        store.send_message("ops", agent_message("first"));
        let s = store.get_state();
        assert_eq!(s.messages.conversations["ops"].len(), 1);
        assert_eq!(s.messages.conversations["team"].len(), 2);
        assert!(s.messages.composing_message.is_none());
    }

    #[test]
    fn composing_email_starts_agent_draft_and_send_clears_it() {
        let store = Store::new();
        store.update_composing_email(EmailPatch { subject: Some("Hello".into()), ..Default::default() });
        store.update_composing_email(EmailPatch { to: Some("a@b.c".into()), ..Default::default() });
        let draft = store.get_state().gmail.composing.clone().unwrap();
        assert_eq!(draft.from, AGENT_ADDRESS);
        assert_eq!(draft.subject, "Hello");
        assert_eq!(draft.to, "a@b.c");
        assert!(draft.is_draft);

        store.send_email(EmailMessage { is_draft: false, ..draft });
        let s = store.get_state();
        assert!(s.gmail.composing.is_none());
        assert_eq!(s.gmail.emails[0].subject, "Hello");
        assert_eq!(s.gmail.emails.len(), 3);
    }

    #[test]
    fn unseen_document_and_note_are_created() {
        let store = Store::new();
        store.update_document("draft-2", "text");
        store.update_note("9", "fresh");
        let s = store.get_state();
        assert_eq!(s.text_edit.documents["draft-2"].content, "text");
        let note = s.notes.notes.iter().find(|n| n.id == "9").unwrap();
        assert_eq!(note.title, "Untitled");
        assert_eq!(note.content, "fresh");
    }

    #[test]
    fn commands_append_in_order() {
        let store = Store::new();
        store.execute_command("pwd", "~/projects/emergent-labs");
        store.execute_command("ls", "README.md");
        let cmds = &store.get_state().terminal.commands;
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1].command, "ls");
        assert_ne!(cmds[0].id, cmds[1].id);
    }

    #[test]
    fn listener_may_read_state_during_notify() {
        let store = Arc::new(Store::new());
        let reader = Arc::clone(&store);
        let observed = Arc::new(Mutex::new(None));
        let o = Arc::clone(&observed);
        let _sub = store.subscribe(move |st| {
            *lock(&o) = Some(Arc::ptr_eq(st, &reader.get_state()));
        });
        store.add_event(CalendarEvent {
            id: "2".into(),
            title: "Sync".into(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            description: None,
        });
        assert_eq!(*lock(&observed), Some(true));
    }
}
