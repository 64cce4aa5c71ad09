//! The conversation view of the active session

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::message::Message;

/// Identifies one mount of the conversation view.
///
/// Every mount bumps the epoch, so an operation started against an earlier
/// mount can tell its effect is stale. The session id is carried for logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewToken {
    pub session_id: String,
    pub epoch: u64,
}

/// Transient progressive-display state of one bot message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSlot {
    pub id: u64,
    pub message_index: usize,
    pub visible: String,
}

/// Ordered messages of the currently mounted session.
///
/// No caches are kept for other sessions: a session switch mounts a fresh,
/// empty view that is filled wholesale by the history fetch.
#[derive(Debug, Default)]
pub struct ConversationStore {
    session_id: Option<String>,
    messages: Vec<Message>,
    epoch: u64,
    loading_history: bool,
    reveal: Option<RevealSlot>,
    next_reveal_id: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `session_id`, blanking the view until its history arrives
    pub fn mount(&mut self, session_id: &str) -> ViewToken {
        self.epoch += 1;
        self.session_id = Some(session_id.to_string());
        self.messages.clear();
        self.reveal = None;
        self.loading_history = true;
        debug!("Mounted view {} (epoch {})", session_id, self.epoch);
        self.current_token_unchecked()
    }

    /// Mount a session that has no history yet; no fetch follows
    pub fn mount_empty(&mut self, session_id: &str) -> ViewToken {
        self.clear();
        self.session_id = Some(session_id.to_string());
        debug!("Mounted empty view {} (epoch {})", session_id, self.epoch);
        self.current_token_unchecked()
    }

    /// Install a fetched history if `token` still names the mounted view
    pub fn replace(&mut self, token: &ViewToken, messages: Vec<Message>) -> bool {
        if !self.is_current(token) {
            debug!(
                "Dropping stale history for {} (epoch {} != {})",
                token.session_id, token.epoch, self.epoch
            );
            return false;
        }
        self.messages = messages;
        self.reveal = None;
        self.loading_history = false;
        true
    }

    /// Empty the view. Invalidates everything in flight against it.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.messages.clear();
        self.reveal = None;
        self.loading_history = false;
    }

    /// Append to the end of the view; returns the message index
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Whether `token` was issued for the view that is mounted now
    pub fn is_current(&self, token: &ViewToken) -> bool {
        self.session_id.is_some() && token.epoch == self.epoch
    }

    /// Token for the mounted view
    pub fn token(&self) -> Option<ViewToken> {
        self.session_id.as_ref().map(|_| self.current_token_unchecked())
    }

    /// Follow a session that was re-keyed without changing its content
    pub fn rebind(&mut self, old_id: &str, new_id: &str) {
        if self.session_id.as_deref() == Some(old_id) {
            self.session_id = Some(new_id.to_string());
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_loading_history(&self) -> bool {
        self.loading_history
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Start revealing the message at `message_index`, replacing any
    /// reveal in progress
    pub fn begin_reveal(&mut self, message_index: usize) -> Option<u64> {
        if message_index >= self.messages.len() {
            return None;
        }
        self.next_reveal_id += 1;
        self.reveal = Some(RevealSlot {
            id: self.next_reveal_id,
            message_index,
            visible: String::new(),
        });
        Some(self.next_reveal_id)
    }

    /// Update the visible prefix of reveal `id`; false if it is gone
    pub fn advance_reveal(&mut self, id: u64, text: &str) -> bool {
        match self.reveal.as_mut() {
            Some(slot) if slot.id == id => {
                slot.visible.clear();
                slot.visible.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// End reveal `id` so the committed message shows in full
    pub fn finish_reveal(&mut self, id: u64) -> bool {
        if self.reveal.as_ref().is_some_and(|slot| slot.id == id) {
            self.reveal = None;
            true
        } else {
            false
        }
    }

    /// Drop whatever reveal is in progress; returns its id
    pub fn cancel_reveal(&mut self) -> Option<u64> {
        self.reveal.take().map(|slot| slot.id)
    }

    pub fn reveal(&self) -> Option<&RevealSlot> {
        self.reveal.as_ref()
    }

    fn current_token_unchecked(&self) -> ViewToken {
        ViewToken {
            session_id: self.session_id.clone().unwrap_or_default(),
            epoch: self.epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_blanks_view() {
        let mut store = ConversationStore::new();
        let token = store.mount("u1_a");
        store.append(Message::human("hi"));

        let next = store.mount("u1_b");
        assert!(store.is_empty());
        assert!(store.is_loading_history());
        assert!(!store.is_current(&token));
        assert!(store.is_current(&next));
    }

    #[test]
    fn test_replace_ignores_stale_token() {
        let mut store = ConversationStore::new();
        let stale = store.mount("u1_a");
        let current = store.mount("u1_b");

        assert!(!store.replace(&stale, vec![Message::bot("old")]));
        assert!(store.is_empty());

        assert!(store.replace(&current, vec![Message::bot("new")]));
        assert_eq!(store.messages()[0].content, "new");
        assert!(!store.is_loading_history());
    }

    #[test]
    fn test_clear_invalidates_tokens_and_reveal() {
        let mut store = ConversationStore::new();
        let token = store.mount_empty("u1_a");
        let index = store.append(Message::bot("a b"));
        let reveal = store.begin_reveal(index).unwrap();

        store.clear();
        assert!(!store.is_current(&token));
        assert!(store.reveal().is_none());
        assert!(!store.advance_reveal(reveal, "a "));
        assert!(!store.replace(&token, vec![Message::bot("late")]));
    }

    #[test]
    fn test_reveal_tracks_visible_prefix() {
        let mut store = ConversationStore::new();
        store.mount_empty("u1_a");
        let index = store.append(Message::bot("a b c"));
        let id = store.begin_reveal(index).unwrap();

        let visible = |store: &ConversationStore| store.reveal().map(|s| s.visible.clone());
        assert_eq!(visible(&store).as_deref(), Some(""));
        assert!(store.advance_reveal(id, "a b "));
        assert_eq!(visible(&store).as_deref(), Some("a b "));
        assert_eq!(store.reveal().map(|s| s.message_index), Some(index));
        assert_eq!(store.messages()[index].content, "a b c");

        assert!(store.finish_reveal(id));
        assert!(store.reveal().is_none());
        assert_eq!(store.messages()[index].content, "a b c");
    }

    #[test]
    fn test_mount_empty_clears_previous_view() {
        let mut store = ConversationStore::new();
        let old = store.mount_empty("u1_a");
        let index = store.append(Message::bot("a b"));
        let reveal = store.begin_reveal(index).unwrap();

        let token = store.mount_empty("u1_session_2");
        assert_eq!(token.epoch, old.epoch + 1);
        assert_eq!(store.session_id(), Some("u1_session_2"));
        assert!(store.is_empty());
        assert!(!store.is_loading_history());
        assert!(store.reveal().is_none());
        assert!(!store.advance_reveal(reveal, "a "));
        assert!(store.is_current(&token));
        assert!(!store.is_current(&old));
    }

    #[test]
    fn test_new_reveal_replaces_previous() {
        let mut store = ConversationStore::new();
        store.mount_empty("u1_a");
        let first = store.append(Message::bot("one"));
        let second = store.append(Message::bot("two"));

        let a = store.begin_reveal(first).unwrap();
        let b = store.begin_reveal(second).unwrap();
        assert!(!store.advance_reveal(a, "one "));
        assert!(store.advance_reveal(b, "two "));
        assert_eq!(store.reveal().map(|s| s.message_index), Some(second));

        assert_eq!(store.cancel_reveal(), Some(b));
        assert!(!store.finish_reveal(b));
    }

    #[test]
    fn test_rebind_keeps_token_valid() {
        let mut store = ConversationStore::new();
        let token = store.mount_empty("u1_session_1");
        store.rebind("u1_session_1", "u1_नमस्ते");

        assert_eq!(store.session_id(), Some("u1_नमस्ते"));
        assert!(store.is_current(&token));
    }
}
