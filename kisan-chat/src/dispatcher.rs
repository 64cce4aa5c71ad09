//! Send orchestration
//!
//! A send is split into two synchronous transitions around the network
//! call: [`ChatDispatcher::begin`] appends the human message and records the
//! pending send, [`ChatDispatcher::complete`] integrates the reply (or the
//! fallback) into whatever view is mounted by then. A reply is dropped only
//! when its session is no longer the mounted one.

use chrono::Utc;
use kisan_core::config::{MessagesConfig, SessionConfig};
use kisan_core::conversation::{Message, ViewToken};
use kisan_core::session::{backend_session_id, Session, SessionStore};
use kisan_core::utils::slug_title;
use kisan_core::{Error, Result};
use kisan_gateway::ChatReply;
use tracing::{debug, info, warn};

use crate::state::{ChatState, PendingSend, SettledExchange};

/// Title used when a message has nothing usable for a derived title
const FALLBACK_TITLE: &str = "session";

/// What happened to a call to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank text or no active session; nothing changed
    Ignored,
    /// The active session already has a send in flight
    Busy,
    /// The backend replied and the reply was appended
    Replied,
    /// The backend failed and the fallback message was appended
    FellBack,
    /// The user left the session before the reply arrived; nothing was
    /// appended
    Discarded,
}

/// A send accepted by [`ChatDispatcher::begin`]
#[derive(Debug, Clone)]
pub struct SendTicket {
    pub session_id: String,
    pub wire_session_id: String,
    pub text: String,
    pub token: ViewToken,
}

/// Result of [`ChatDispatcher::complete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub outcome: SendOutcome,
    /// Index of the appended bot message; `None` when it was discarded or
    /// is held until the re-mounted view has its history
    pub message_index: Option<usize>,
    /// Whether the backend accepted the message
    pub delivered: bool,
    /// New id of a promoted "new session"
    pub promoted_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatDispatcher {
    user_id: String,
    max_title_chars: usize,
    fallback_reply: String,
    empty_reply: String,
}

impl ChatDispatcher {
    pub fn new(
        user_id: impl Into<String>,
        session: &SessionConfig,
        messages: &MessagesConfig,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            max_title_chars: session.max_title_chars,
            fallback_reply: messages.fallback_reply.clone(),
            empty_reply: messages.empty_reply.clone(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Backend session id a message sent from `session` is stored under.
    ///
    /// A session still carrying the "new session" title gets a title derived
    /// from the message, made unique against the existing titles.
    pub fn wire_session_id(
        &self,
        sessions: &SessionStore,
        session: &Session,
        text: &str,
    ) -> String {
        if !sessions.is_unnamed(session) {
            return backend_session_id(&self.user_id, &session.title);
        }

        let base = slug_title(text, self.max_title_chars)
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());
        let mut title = base.clone();
        let mut suffix = 2;
        while sessions.has_title(&title) {
            title = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        backend_session_id(&self.user_id, &title)
    }

    /// Accept a send: append the human message, mark the session pending and
    /// consume the input buffer.
    pub fn begin(
        &self,
        state: &mut ChatState,
        text: &str,
    ) -> std::result::Result<SendTicket, SendOutcome> {
        if text.trim().is_empty() {
            debug!("Send ignored: {}", Error::EmptyInput);
            return Err(SendOutcome::Ignored);
        }
        let Some(session) = state.sessions.active().cloned() else {
            debug!("Send ignored: no active session");
            return Err(SendOutcome::Ignored);
        };
        if state.pending.contains_key(&session.id) {
            debug!("Send refused: {} already waiting on a reply", session.id);
            return Err(SendOutcome::Busy);
        }
        let Some(token) = state.view.token() else {
            return Err(SendOutcome::Ignored);
        };

        let wire_session_id = self.wire_session_id(&state.sessions, &session, text);
        state.view.append(Message::human(text));
        state.pending.insert(
            session.id.clone(),
            PendingSend {
                session_id: session.id.clone(),
                wire_session_id: wire_session_id.clone(),
                text: text.to_string(),
                started_at: Utc::now(),
            },
        );
        state.input.clear();

        info!("Sending message from {} as {}", session.id, wire_session_id);
        Ok(SendTicket {
            session_id: session.id,
            wire_session_id,
            text: text.to_string(),
            token,
        })
    }

    /// Integrate the backend result of `ticket`
    pub fn complete(
        &self,
        state: &mut ChatState,
        ticket: &SendTicket,
        result: Result<ChatReply>,
    ) -> Completion {
        if let Some(pending) = state.pending.remove(&ticket.session_id) {
            let elapsed = Utc::now() - pending.started_at;
            debug!(
                "Send from {} settled after {} ms",
                pending.session_id,
                elapsed.num_milliseconds()
            );
        }

        let (content, outcome) = match result {
            Ok(reply) if reply.reply.is_empty() => (self.empty_reply.clone(), SendOutcome::Replied),
            Ok(reply) => (reply.reply, SendOutcome::Replied),
            Err(e) => {
                warn!("Send from {} failed: {}", ticket.session_id, e);
                (self.fallback_reply.clone(), SendOutcome::FellBack)
            }
        };
        let delivered = outcome == SendOutcome::Replied;

        let promoted_to = if delivered {
            self.promote(state, ticket)
        } else {
            None
        };

        let session_id = promoted_to
            .clone()
            .unwrap_or_else(|| ticket.session_id.clone());
        let reply = Message::bot(content);
        let (outcome, message_index) = if state.view.is_current(&ticket.token) {
            (outcome, Some(state.view.append(reply)))
        } else if state.view.session_id() == Some(session_id.as_str()) {
            if state.view.is_loading_history() {
                debug!("Holding reply for {} until its history is in", session_id);
                state.settled.insert(
                    session_id,
                    SettledExchange {
                        text: ticket.text.clone(),
                        reply,
                    },
                );
                (outcome, None)
            } else {
                debug!("Attaching reply to re-mounted view {}", session_id);
                (outcome, Some(state.restore_exchange(&ticket.text, reply)))
            }
        } else {
            debug!(
                "Discarding reply for {}: session is no longer mounted",
                session_id
            );
            (SendOutcome::Discarded, None)
        };

        Completion {
            outcome,
            message_index,
            delivered,
            promoted_to,
        }
    }

    /// Re-key a session whose local id differs from the id the backend
    /// stored the exchange under: the "new session" sentinel and the
    /// synthesized default session
    fn promote(&self, state: &mut ChatState, ticket: &SendTicket) -> Option<String> {
        let session = state.sessions.get(&ticket.session_id)?;
        if session.id == ticket.wire_session_id {
            return None;
        }

        let title = Session::from_backend_id(&self.user_id, &ticket.wire_session_id).title;
        match state
            .sessions
            .promote(&ticket.session_id, &ticket.wire_session_id, &title)
        {
            Ok(true) => {
                state
                    .view
                    .rebind(&ticket.session_id, &ticket.wire_session_id);
                Some(ticket.wire_session_id.clone())
            }
            Ok(false) => {
                warn!(
                    "Not promoting {}: {} already listed",
                    ticket.session_id, ticket.wire_session_id
                );
                None
            }
            Err(e) => {
                warn!("Not promoting {}: {}", ticket.session_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kisan_core::conversation::Role;

    fn dispatcher() -> ChatDispatcher {
        ChatDispatcher::new("u1", &SessionConfig::default(), &MessagesConfig::default())
    }

    fn state_with(ids: &[&str]) -> ChatState {
        let mut sessions = SessionStore::new("u1", &SessionConfig::default());
        sessions.apply_listing(Ok(ids.iter().map(|s| s.to_string()).collect()));
        let mut state = ChatState::new(sessions);
        state.mount_active(false);
        state
    }

    #[test]
    fn test_blank_text_is_ignored() {
        let mut state = state_with(&["u1_a"]);
        state.input = "  ".to_string();
        assert_eq!(
            dispatcher().begin(&mut state, "  \n").unwrap_err(),
            SendOutcome::Ignored
        );
        assert!(state.view.is_empty());
        assert_eq!(state.input, "  ");
    }

    #[test]
    fn test_second_send_is_busy() {
        let mut state = state_with(&["u1_a"]);
        let d = dispatcher();
        d.begin(&mut state, "one").unwrap();
        assert_eq!(d.begin(&mut state, "two").unwrap_err(), SendOutcome::Busy);
        assert_eq!(state.view.messages().len(), 1);
    }

    #[test]
    fn test_named_session_wire_id() {
        let mut state = state_with(&["u1_धान"]);
        let ticket = dispatcher().begin(&mut state, "सवाल").unwrap();
        assert_eq!(ticket.wire_session_id, "u1_धान");
    }

    #[test]
    fn test_default_session_wire_id_uses_title() {
        let mut state = state_with(&[]);
        let ticket = dispatcher().begin(&mut state, "q").unwrap();
        assert_eq!(ticket.wire_session_id, "u1_सामान्य_चर्चा");
    }

    #[test]
    fn test_unnamed_session_derives_unique_title() {
        let mut state = state_with(&["u1_मिट्टी_की_जांच"]);
        state.sessions.create_new(1);
        state.mount_active(false);

        let ticket = dispatcher().begin(&mut state, "मिट्टी की  जांच").unwrap();
        assert_eq!(ticket.wire_session_id, "u1_मिट्टी_की_जांच_2");
    }

    #[test]
    fn test_unnamed_session_fallback_title() {
        let mut state = state_with(&[]);
        state.sessions.create_new(1);
        state.mount_active(false);

        let ticket = dispatcher().begin(&mut state, "???").unwrap();
        assert_eq!(ticket.wire_session_id, "u1_session");
    }

    #[test]
    fn test_failure_appends_fallback() {
        let mut state = state_with(&["u1_a"]);
        let d = dispatcher();
        let ticket = d.begin(&mut state, "test").unwrap();
        let done = d.complete(&mut state, &ticket, Err(Error::remote("send_message", "down")));

        assert_eq!(done.outcome, SendOutcome::FellBack);
        let messages = state.view.messages();
        assert_eq!(messages[0].role, Role::Human);
        assert_eq!(messages[0].content, "test");
        assert_eq!(messages[1].content, "सर्वर से उत्तर प्राप्त नहीं हो सका।");
        assert!(!state.is_loading());
    }

    #[test]
    fn test_empty_reply_is_replaced() {
        let mut state = state_with(&["u1_a"]);
        let d = dispatcher();
        let ticket = d.begin(&mut state, "q").unwrap();
        let done = d.complete(&mut state, &ticket, Ok(ChatReply::new("")));

        assert_eq!(done.outcome, SendOutcome::Replied);
        assert_eq!(state.view.messages()[1].content, "कोई उत्तर उपलब्ध नहीं है।");
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut state = state_with(&["u1_a", "u1_b"]);
        let d = dispatcher();
        let ticket = d.begin(&mut state, "q").unwrap();

        state.sessions.select("u1_b").unwrap();
        state.mount_active(true);
        let done = d.complete(&mut state, &ticket, Ok(ChatReply::new("late")));

        assert_eq!(done.outcome, SendOutcome::Discarded);
        assert!(done.delivered);
        assert!(state.view.is_empty());
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_success_promotes_unnamed_session() {
        let mut state = state_with(&["u1_a"]);
        let fresh = state.sessions.create_new(5);
        state.mount_active(false);
        let d = dispatcher();

        let ticket = d.begin(&mut state, "धान की सिंचाई").unwrap();
        let done = d.complete(&mut state, &ticket, Ok(ChatReply::new("ok")));

        assert_eq!(done.promoted_to.as_deref(), Some("u1_धान_की_सिंचाई"));
        assert!(state.sessions.get(&fresh.id).is_none());
        let active = state.sessions.active().unwrap();
        assert_eq!(active.title, "धान_की_सिंचाई");
        assert_eq!(state.view.session_id(), Some("u1_धान_की_सिंचाई"));
        assert_eq!(done.outcome, SendOutcome::Replied);
    }

    #[test]
    fn test_success_promotes_default_session() {
        let mut state = state_with(&[]);
        let d = dispatcher();

        let ticket = d.begin(&mut state, "नमस्ते").unwrap();
        let done = d.complete(&mut state, &ticket, Ok(ChatReply::new("ok")));

        assert_eq!(done.promoted_to.as_deref(), Some("u1_सामान्य_चर्चा"));
        assert!(state.sessions.get("u1_default").is_none());
        let active = state.sessions.active().unwrap();
        assert_eq!(active.id, "u1_सामान्य_चर्चा");
        assert_eq!(active.title, "सामान्य_चर्चा");
        assert_eq!(state.view.session_id(), Some("u1_सामान्य_चर्चा"));
        assert_eq!(state.view.messages().len(), 2);
    }

    #[test]
    fn test_remounted_session_keeps_reply() {
        let mut state = state_with(&["u1_a", "u1_b"]);
        let d = dispatcher();
        let ticket = d.begin(&mut state, "q").unwrap();

        state.sessions.select("u1_b").unwrap();
        state.mount_active(false);
        state.sessions.select("u1_a").unwrap();
        state.mount_active(false);
        let done = d.complete(&mut state, &ticket, Ok(ChatReply::new("a")));

        assert_eq!(done.outcome, SendOutcome::Replied);
        assert_eq!(done.message_index, Some(1));
        let contents: Vec<_> = state.view.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q", "a"]);
    }

    #[test]
    fn test_reply_during_history_load_is_held() {
        let mut state = state_with(&["u1_a", "u1_b"]);
        let d = dispatcher();
        let ticket = d.begin(&mut state, "q").unwrap();

        state.sessions.select("u1_b").unwrap();
        state.mount_active(true);
        state.sessions.select("u1_a").unwrap();
        state.mount_active(true);
        let done = d.complete(&mut state, &ticket, Err(Error::remote("send_message", "down")));

        assert_eq!(done.outcome, SendOutcome::FellBack);
        assert_eq!(done.message_index, None);
        assert!(state.view.is_empty());
        let held = state.settled.get("u1_a").unwrap();
        assert_eq!(held.text, "q");
        assert_eq!(held.reply.content, "सर्वर से उत्तर प्राप्त नहीं हो सका।");
    }

    #[test]
    fn test_failure_keeps_session_unnamed() {
        let mut state = state_with(&[]);
        let fresh = state.sessions.create_new(5);
        state.mount_active(false);
        let d = dispatcher();

        let ticket = d.begin(&mut state, "x").unwrap();
        d.complete(&mut state, &ticket, Err(Error::remote("send_message", "down")));
        assert!(state.sessions.get(&fresh.id).is_some());
    }
}
