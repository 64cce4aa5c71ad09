//! Chat sessions
//!
//! A session is a named conversation thread held by the remote service.
//! [`SessionStore`] keeps the ordered collection and the single active
//! pointer; nothing about a session is persisted locally.

pub mod model;
pub mod store;

pub use model::{backend_session_id, default_session_id, fresh_session_id, Session};
pub use store::SessionStore;
