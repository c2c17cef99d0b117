//! Chat session store
//!
//! Holds every conversation thread and the currently selected one.
//! Messages are append-only; only the current session receives appends.

use crate::models::{ChatMessage, ChatRole, ChatSession};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Vec<ChatSession>,
    current: Option<Uuid>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session and make it current. Newest first, matching
    /// the transcript sidebar ordering.
    pub fn create_session(&mut self) -> Uuid {
        let session = ChatSession::new();
        let id = session.id;
        self.sessions.insert(0, session);
        self.current = Some(id);
        debug!(session_id = %id, "Chat session created");
        id
    }

    /// Select an existing session. Unknown ids are ignored.
    pub fn select_session(&mut self, id: Uuid) {
        if self.sessions.iter().any(|s| s.id == id) {
            self.current = Some(id);
        }
    }

    pub fn rename_session(&mut self, id: Uuid, title: impl Into<String>) {
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
            session.title = title.into();
        }
    }

    /// Delete a session. When the current one is deleted, the first
    /// remaining session becomes current, or none at all — a fresh
    /// session is created lazily by `ensure_current`, never here.
    pub fn delete_session(&mut self, id: Uuid) {
        self.sessions.retain(|s| s.id != id);
        if self.current == Some(id) {
            self.current = self.sessions.first().map(|s| s.id);
        }
    }

    /// Id of the current session, creating one when none exists.
    pub fn ensure_current(&mut self) -> Uuid {
        match self.current {
            Some(id) => id,
            None => self.create_session(),
        }
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        let id = self.current?;
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Append a message to the current session. Silent no-op without one.
    /// Returns true when the caller should request an auto-title: this was
    /// the session's first message and the sender is the user.
    pub fn append_message(&mut self, msg: ChatMessage) -> bool {
        let Some(id) = self.current else {
            return false;
        };
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return false;
        };

        let needs_title = session.messages.is_empty() && msg.role == ChatRole::User;
        session.messages.push(msg);
        session.last_modified = chrono::Utc::now();
        needs_title
    }
}
