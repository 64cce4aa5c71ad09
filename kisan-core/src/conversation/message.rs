//! Chat message data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::render::markdown::{self, Document};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The farmer using the client
    Human,
    /// The remote assistant
    Bot,
}

impl Role {
    /// Map a history role name; anything not written by the farmer is shown
    /// as the assistant
    pub fn from_wire(name: &str) -> Self {
        if name.eq_ignore_ascii_case("human") || name.eq_ignore_ascii_case("user") {
            Role::Human
        } else {
            Role::Bot
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Role::from_wire(&name))
    }
}

/// A committed chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message author; the history endpoint calls this `type` or `role`
    #[serde(rename = "type", alias = "role")]
    pub role: Role,
    /// Raw message text
    pub content: String,
    /// Message timestamp; history entries without one get the fetch time
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a human message stamped now
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    /// Create a bot message stamped now
    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Role::Bot, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.role == Role::Bot
    }

    /// Render the message as display fragments.
    ///
    /// Bot text goes through the markdown transformer; human text is shown
    /// verbatim.
    pub fn document(&self) -> Document {
        render_content(self.role, &self.content)
    }
}

/// Render `content` as if written by `role`; used for partially revealed text
pub fn render_content(role: Role, content: &str) -> Document {
    match role {
        Role::Bot => markdown::transform(content),
        Role::Human => Document::plain(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::markdown::{Block, Inline};

    #[test]
    fn test_deserialize_history_entry() {
        let msg: Message = serde_json::from_str(
            r#"{"type":"bot","content":"नमस्ते","timestamp":"2026-01-02T03:04:05Z"}"#,
        )
        .unwrap();
        assert_eq!(msg.role, Role::Bot);
        assert_eq!(msg.timestamp.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_deserialize_backend_role_shape() {
        let msgs: Vec<Message> = serde_json::from_str(
            r#"[{"role":"human","content":"q"},{"role":"assistant","content":"a"}]"#,
        )
        .unwrap();
        assert_eq!(msgs[0].role, Role::Human);
        assert_eq!(msgs[1].role, Role::Bot);
    }

    #[test]
    fn test_unknown_role_reads_as_bot() {
        let msgs: Vec<Message> = serde_json::from_str(
            r#"[{"type":"system","content":"s"},{"type":"User","content":"q"},{"type":"ai","content":"a"}]"#,
        )
        .unwrap();
        let roles: Vec<_> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Bot, Role::Human, Role::Bot]);
        assert_eq!(serde_json::to_string(&Role::Human).unwrap(), r#""human""#);
    }

    #[test]
    fn test_human_text_is_not_markdown() {
        let msg = Message::human("**not bold**");
        assert_eq!(
            msg.document().blocks,
            vec![Block::Line(vec![Inline::Text("**not bold**".to_string())])]
        );
    }

    #[test]
    fn test_bot_text_is_markdown() {
        let msg = Message::bot("**Hi**");
        assert_eq!(
            msg.document().blocks,
            vec![Block::Line(vec![Inline::Bold("Hi".to_string())])]
        );
    }
}
