//! Conversation history of the active session

pub mod message;
pub mod store;

pub use message::{render_content, Message, Role};
pub use store::{ConversationStore, RevealSlot, ViewToken};
