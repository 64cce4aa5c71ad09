//! Mutable client state shared by the engine's operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kisan_core::conversation::{ConversationStore, Message, RevealSlot, Role, ViewToken};
use kisan_core::session::{Session, SessionStore};
use tokio_util::sync::CancellationToken;

/// A send waiting on the backend; at most one per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    /// Local id of the session the send was started from
    pub session_id: String,
    /// Id the backend was asked to store the exchange under
    pub wire_session_id: String,
    pub text: String,
    pub started_at: DateTime<Utc>,
}

/// A reply that arrived while its session was re-mounted and still loading
/// history; attached once the history is in
#[derive(Debug, Clone, PartialEq)]
pub struct SettledExchange {
    pub text: String,
    pub reply: Message,
}

/// Everything the engine mutates. Only ever touched under the engine lock,
/// and never across an `.await`.
#[derive(Debug)]
pub struct ChatState {
    pub(crate) sessions: SessionStore,
    pub(crate) view: ConversationStore,
    pub(crate) pending: HashMap<String, PendingSend>,
    pub(crate) settled: HashMap<String, SettledExchange>,
    pub(crate) input: String,
    pub(crate) reveal_cancel: Option<CancellationToken>,
}

impl ChatState {
    pub fn new(sessions: SessionStore) -> Self {
        Self {
            sessions,
            view: ConversationStore::new(),
            pending: HashMap::new(),
            settled: HashMap::new(),
            input: String::new(),
            reveal_cancel: None,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn view(&self) -> &ConversationStore {
        &self.view
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Whether the active session is waiting on a reply
    pub fn is_loading(&self) -> bool {
        self.sessions
            .active_id()
            .is_some_and(|id| self.pending.contains_key(id))
    }

    pub fn pending(&self, session_id: &str) -> Option<&PendingSend> {
        self.pending.get(session_id)
    }

    /// Cancel the running reveal, if any, and drop its slot
    pub(crate) fn stop_reveal(&mut self) {
        if let Some(cancel) = self.reveal_cancel.take() {
            cancel.cancel();
        }
        self.view.cancel_reveal();
    }

    /// Mount the active session into the view
    pub(crate) fn mount_active(&mut self, fetch: bool) -> Option<(ViewToken, Session)> {
        self.stop_reveal();
        let session = self.sessions.active()?.clone();
        self.settled.retain(|id, _| *id == session.id);
        let token = if fetch {
            self.view.mount(&session.id)
        } else {
            self.view.mount_empty(&session.id)
        };
        Some((token, session))
    }

    /// Attach an exchange to a view that was re-mounted while it was in
    /// flight. The question is appended unless the view already ends with
    /// it; returns the index of the reply.
    pub(crate) fn restore_exchange(&mut self, text: &str, reply: Message) -> usize {
        if !self.ends_with_question(text) {
            self.view.append(Message::human(text));
        }
        self.view.append(reply)
    }

    /// Re-apply in-flight and settled sends of the mounted session after its
    /// history was installed
    pub(crate) fn resume_view(&mut self) -> Option<usize> {
        let session_id = self.view.session_id()?.to_string();
        if let Some(pending) = self.pending.get(&session_id) {
            let text = pending.text.clone();
            if !self.ends_with_question(&text) {
                self.view.append(Message::human(text));
            }
            return None;
        }

        let settled = self.settled.remove(&session_id)?;
        let messages = self.view.messages();
        let stored = messages.len() >= 2
            && messages[messages.len() - 1].role == Role::Bot
            && messages[messages.len() - 2].role == Role::Human
            && messages[messages.len() - 2].content == settled.text;
        if stored {
            return None;
        }
        Some(self.restore_exchange(&settled.text, settled.reply))
    }

    fn ends_with_question(&self, text: &str) -> bool {
        self.view
            .messages()
            .last()
            .is_some_and(|m| m.role == Role::Human && m.content == text)
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            user_id: self.sessions.user_id().to_string(),
            sessions: self.sessions.sessions().to_vec(),
            active_id: self.sessions.active_id().map(str::to_string),
            messages: self.view.messages().to_vec(),
            reveal: self.view.reveal().cloned(),
            loading: self.is_loading(),
            loading_history: self.view.is_loading_history(),
            input: self.input.clone(),
        }
    }
}

/// Owned copy of what a front end draws
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    pub user_id: String,
    pub sessions: Vec<Session>,
    pub active_id: Option<String>,
    pub messages: Vec<Message>,
    pub reveal: Option<RevealSlot>,
    pub loading: bool,
    pub loading_history: bool,
    pub input: String,
}

impl ChatSnapshot {
    pub fn active(&self) -> Option<&Session> {
        let id = self.active_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Content to show for message `index`, honoring a reveal in progress
    pub fn display_text(&self, index: usize) -> Option<&str> {
        let message = self.messages.get(index)?;
        match &self.reveal {
            Some(slot) if slot.message_index == index => Some(slot.visible.as_str()),
            _ => Some(message.content.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kisan_core::config::SessionConfig;

    fn state() -> ChatState {
        let mut sessions = SessionStore::new("u1", &SessionConfig::default());
        sessions.apply_listing(Ok(vec!["u1_a".to_string(), "u1_b".to_string()]));
        ChatState::new(sessions)
    }

    #[test]
    fn test_loading_follows_active_session() {
        let mut state = state();
        state.pending.insert(
            "u1_a".to_string(),
            PendingSend {
                session_id: "u1_a".to_string(),
                wire_session_id: "u1_a".to_string(),
                text: "q".to_string(),
                started_at: Utc::now(),
            },
        );
        assert!(state.is_loading());

        state.sessions.select("u1_b").unwrap();
        assert!(!state.is_loading());
    }

    #[test]
    fn test_mount_active_stops_reveal() {
        let mut state = state();
        state.mount_active(false);
        let index = state.view.append(Message::bot("a b"));
        state.view.begin_reveal(index);
        let cancel = CancellationToken::new();
        state.reveal_cancel = Some(cancel.clone());

        let (token, session) = state.mount_active(true).unwrap();
        assert!(cancel.is_cancelled());
        assert!(state.view.reveal().is_none());
        assert_eq!(token.session_id, session.id);
        assert!(state.snapshot().loading_history);
    }

    fn pending(text: &str) -> PendingSend {
        PendingSend {
            session_id: "u1_a".to_string(),
            wire_session_id: "u1_a".to_string(),
            text: text.to_string(),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_resume_view_shows_pending_question() {
        let mut state = state();
        state.pending.insert("u1_a".to_string(), pending("q"));
        let (token, _) = state.mount_active(true).unwrap();
        state.view.replace(&token, vec![Message::bot("old")]);

        assert_eq!(state.resume_view(), None);
        assert_eq!(state.resume_view(), None);
        let contents: Vec<_> = state.view.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["old", "q"]);
    }

    #[test]
    fn test_resume_view_attaches_settled_reply_once() {
        let mut state = state();
        let (token, _) = state.mount_active(true).unwrap();
        state.settled.insert(
            "u1_a".to_string(),
            SettledExchange {
                text: "q".to_string(),
                reply: Message::bot("a"),
            },
        );
        state.view.replace(&token, vec![Message::bot("old")]);

        assert_eq!(state.resume_view(), Some(2));
        assert_eq!(state.view.messages()[1].content, "q");
        assert!(state.settled.is_empty());
        assert_eq!(state.resume_view(), None);
    }

    #[test]
    fn test_resume_view_skips_exchange_already_in_history() {
        let mut state = state();
        let (token, _) = state.mount_active(true).unwrap();
        state.settled.insert(
            "u1_a".to_string(),
            SettledExchange {
                text: "q".to_string(),
                reply: Message::bot("a"),
            },
        );
        state
            .view
            .replace(&token, vec![Message::human("q"), Message::bot("a")]);

        assert_eq!(state.resume_view(), None);
        assert_eq!(state.view.messages().len(), 2);
    }

    #[test]
    fn test_mounting_other_session_drops_settled_replies() {
        let mut state = state();
        state.settled.insert(
            "u1_a".to_string(),
            SettledExchange {
                text: "q".to_string(),
                reply: Message::bot("a"),
            },
        );
        state.sessions.select("u1_b").unwrap();
        state.mount_active(true);
        assert!(state.settled.is_empty());
    }

    #[test]
    fn test_snapshot_display_text() {
        let mut state = state();
        state.mount_active(false);
        let index = state.view.append(Message::bot("a b c"));
        let id = state.view.begin_reveal(index).unwrap();
        state.view.advance_reveal(id, "a ");

        let snapshot = state.snapshot();
        assert_eq!(snapshot.display_text(index), Some("a "));
        assert_eq!(snapshot.active().unwrap().id, "u1_a");
    }
}
