//! Backend gateway trait

use async_trait::async_trait;
use kisan_core::conversation::Message;
use kisan_core::Result;
use serde::{Deserialize, Serialize};

/// Reply to a posted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Raw reply text; may be empty
    pub reply: String,
}

impl ChatReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

/// The three remote operations of the farmer query service.
///
/// Every transport or server failure surfaces as
/// [`kisan_core::Error::RemoteUnavailable`]. Implementations never retry
/// [`BackendGateway::send_message`].
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Session ids stored for `user_id`, in backend order
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>>;

    /// Full message history of a session
    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Post one user message and wait for the assistant reply
    async fn send_message(&self, user_id: &str, text: &str, session_id: &str)
        -> Result<ChatReply>;

    /// Human-readable target, for logs and `status`
    fn describe(&self) -> String;
}
