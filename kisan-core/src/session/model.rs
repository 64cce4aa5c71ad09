//! Session data structures

use serde::{Deserialize, Serialize};

/// A named conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session id (`{user}_{title}` or `{user}_session_{millis}`)
    pub id: String,
    /// Display title
    pub title: String,
    /// Whether this is the active session
    pub is_active: bool,
}

impl Session {
    /// Create an inactive session
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            is_active: false,
        }
    }

    /// Build a session from a backend id, stripping the `{user}_` prefix
    /// for display.
    pub fn from_backend_id(user_id: &str, backend_id: &str) -> Self {
        let prefix = format!("{}_", user_id);
        let title = backend_id.strip_prefix(&prefix).unwrap_or(backend_id);
        Self::new(backend_id, title)
    }
}

/// Id the backend uses for a session with the given title
pub fn backend_session_id(user_id: &str, title: &str) -> String {
    format!("{}_{}", user_id, title)
}

/// Id of the synthesized default session
pub fn default_session_id(user_id: &str) -> String {
    format!("{}_default", user_id)
}

/// Time-derived id of a freshly created session
pub fn fresh_session_id(user_id: &str, unix_millis: i64) -> String {
    format!("{}_session_{}", user_id, unix_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_backend_id_strips_user_prefix() {
        let session = Session::from_backend_id("random_user1", "random_user1_धान की सिंचाई");
        assert_eq!(session.id, "random_user1_धान की सिंचाई");
        assert_eq!(session.title, "धान की सिंचाई");
        assert!(!session.is_active);
    }

    #[test]
    fn test_from_backend_id_without_prefix_keeps_id() {
        let session = Session::from_backend_id("u1", "other_thread");
        assert_eq!(session.title, "other_thread");
    }

    #[test]
    fn test_id_helpers() {
        assert_eq!(backend_session_id("u1", "गेहूं"), "u1_गेहूं");
        assert_eq!(default_session_id("u1"), "u1_default");
        assert_eq!(fresh_session_id("u1", 1700), "u1_session_1700");
    }
}
