//! Notifications emitted by the chat engine to its front end

use serde::{Deserialize, Serialize};

/// Something the front end should redraw or show.
///
/// Events carry just enough to locate the change; the full state is read
/// from the engine snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The session list or the active pointer changed
    SessionsChanged,
    /// The conversation view was remounted or replaced wholesale
    ViewReplaced { session_id: String },
    /// A message was committed to the mounted view
    MessageAppended {
        session_id: String,
        message_index: usize,
    },
    /// The mounted view started or stopped waiting on the backend
    LoadingChanged { loading: bool },
    /// A reveal advanced to a new cumulative prefix
    RevealProgress {
        session_id: String,
        message_index: usize,
        text: String,
    },
    /// A reveal ran to completion
    RevealFinished {
        session_id: String,
        message_index: usize,
    },
    /// The input buffer was replaced (dictation, send)
    InputChanged { text: String },
    /// A user-facing notice
    Notice { message: String },
}

impl ChatEvent {
    pub fn notice(message: impl Into<String>) -> Self {
        ChatEvent::Notice {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ChatEvent::LoadingChanged { loading: true };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"loading_changed","loading":true}"#);
    }

    #[test]
    fn test_notice_helper() {
        assert_eq!(
            ChatEvent::notice("x"),
            ChatEvent::Notice {
                message: "x".to_string()
            }
        );
    }
}
