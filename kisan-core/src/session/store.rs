//! Ordered session collection with a single active pointer

use tracing::{debug, info, warn};

use super::model::{default_session_id, fresh_session_id, Session};
use crate::config::SessionConfig;
use crate::{Error, Result};

/// Owns the ordered set of sessions for one user and which one is active.
///
/// Once initialized the collection is never empty and exactly one session
/// carries `is_active = true`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    user_id: String,
    default_title: String,
    new_title: String,
    sessions: Vec<Session>,
    active_id: Option<String>,
}

impl SessionStore {
    /// Create an empty store; call [`SessionStore::apply_listing`] to populate it
    pub fn new(user_id: impl Into<String>, config: &SessionConfig) -> Self {
        Self {
            user_id: user_id.into(),
            default_title: config.default_title.clone(),
            new_title: config.new_title.clone(),
            sessions: Vec::new(),
            active_id: None,
        }
    }

    /// The user whose sessions this store holds
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Sessions in display order
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Look up a session by id
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// The active session, if the store has been initialized
    pub fn active(&self) -> Option<&Session> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    /// Id of the active session
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// Whether a session still carries the "new session" sentinel title
    pub fn is_unnamed(&self, session: &Session) -> bool {
        session.title == self.new_title
    }

    /// Whether any session already uses `title`
    pub fn has_title(&self, title: &str) -> bool {
        self.sessions.iter().any(|s| s.title == title)
    }

    /// Replace the collection with a backend listing.
    ///
    /// A failed or empty listing synthesizes one default session. Otherwise
    /// the first id (backend order) becomes active.
    pub fn apply_listing(&mut self, listing: Result<Vec<String>>) -> &[Session] {
        let ids = match listing {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Session listing failed, using default session: {}", e);
                Vec::new()
            }
        };

        let mut sessions: Vec<Session> = Vec::with_capacity(ids.len());
        for id in ids {
            if sessions.iter().any(|s| s.id == id) {
                debug!("Skipping duplicate session id from backend: {}", id);
                continue;
            }
            sessions.push(Session::from_backend_id(&self.user_id, &id));
        }

        if sessions.is_empty() {
            sessions.push(Session::new(
                default_session_id(&self.user_id),
                self.default_title.clone(),
            ));
        }

        let first = sessions[0].id.clone();
        self.sessions = sessions;
        self.set_active(&first);
        info!(
            "Loaded {} session(s) for {}, active: {}",
            self.sessions.len(),
            self.user_id,
            first
        );
        &self.sessions
    }

    /// Make `id` the only active session.
    ///
    /// Returns `Ok(true)` when the active pointer moved, `Ok(false)` when the
    /// session was already active.
    pub fn select(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            return Err(Error::NotFound(id.to_string()));
        }
        if self.active_id.as_deref() == Some(id) {
            return Ok(false);
        }
        self.set_active(id);
        debug!("Selected session {}", id);
        Ok(true)
    }

    /// Insert a fresh, exclusively active session at the front
    pub fn create_new(&mut self, unix_millis: i64) -> Session {
        let mut millis = unix_millis;
        let mut id = fresh_session_id(&self.user_id, millis);
        while self.get(&id).is_some() {
            millis += 1;
            id = fresh_session_id(&self.user_id, millis);
        }

        let session = Session::new(id.clone(), self.new_title.clone());
        self.sessions.insert(0, session);
        self.set_active(&id);
        info!("Created session {}", id);
        self.sessions[0].clone()
    }

    /// Merge a fresh backend listing without moving the active pointer.
    ///
    /// Known ids keep their position, unknown ids are appended in backend
    /// order and local-only sessions are kept. Returns how many were added.
    pub fn refresh(&mut self, ids: &[String]) -> usize {
        let mut added = 0;
        for id in ids {
            if self.get(id).is_some() {
                continue;
            }
            self.sessions.push(Session::from_backend_id(&self.user_id, id));
            added += 1;
        }
        if added > 0 {
            debug!("Session refresh added {} session(s)", added);
        }
        added
    }

    /// Re-key a session once the backend knows it under another id.
    ///
    /// Returns `Ok(false)` and leaves the store unchanged if `new_id` already
    /// belongs to a different session.
    pub fn promote(&mut self, id: &str, new_id: &str, new_title: &str) -> Result<bool> {
        if id != new_id && self.get(new_id).is_some() {
            return Ok(false);
        }
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        session.id = new_id.to_string();
        session.title = new_title.to_string();
        if self.active_id.as_deref() == Some(id) {
            self.active_id = Some(new_id.to_string());
        }
        info!("Session {} is now {}", id, new_id);
        Ok(true)
    }

    fn set_active(&mut self, id: &str) {
        for session in &mut self.sessions {
            session.is_active = session.id == id;
        }
        self.active_id = Some(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new("u1", &SessionConfig::default())
    }

    fn assert_single_active(store: &SessionStore) {
        let active: Vec<_> = store.sessions().iter().filter(|s| s.is_active).collect();
        assert_eq!(active.len(), 1, "sessions: {:?}", store.sessions());
        assert_eq!(Some(active[0].id.as_str()), store.active_id());
    }

    #[test]
    fn test_listing_failure_synthesizes_default() {
        let mut store = store();
        store.apply_listing(Err(Error::remote("list_sessions", "timeout")));

        assert_eq!(store.sessions().len(), 1);
        let active = store.active().unwrap();
        assert_eq!(active.id, "u1_default");
        assert_eq!(active.title, "सामान्य_चर्चा");
        assert_single_active(&store);
    }

    #[test]
    fn test_empty_listing_synthesizes_default() {
        let mut store = store();
        store.apply_listing(Ok(Vec::new()));
        assert_eq!(store.active_id(), Some("u1_default"));
        assert_single_active(&store);
    }

    #[test]
    fn test_listing_first_entry_is_active() {
        let mut store = store();
        store.apply_listing(Ok(vec![
            "u1_धान".to_string(),
            "u1_गेहूं".to_string(),
            "u1_धान".to_string(),
        ]));

        let titles: Vec<_> = store.sessions().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["धान", "गेहूं"]);
        assert_eq!(store.active_id(), Some("u1_धान"));
        assert_single_active(&store);
    }

    #[test]
    fn test_select_moves_active_pointer() {
        let mut store = store();
        store.apply_listing(Ok(vec!["u1_a".to_string(), "u1_b".to_string()]));

        assert!(store.select("u1_b").unwrap());
        assert_eq!(store.active().unwrap().title, "b");
        assert_single_active(&store);

        assert!(!store.select("u1_b").unwrap());
    }

    #[test]
    fn test_select_unknown_leaves_state_unchanged() {
        let mut store = store();
        store.apply_listing(Ok(vec!["u1_a".to_string(), "u1_b".to_string()]));

        let err = store.select("u1_missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.active_id(), Some("u1_a"));
        assert_single_active(&store);
    }

    #[test]
    fn test_create_new_is_front_and_active() {
        let mut store = store();
        store.apply_listing(Ok(vec!["u1_a".to_string()]));

        let session = store.create_new(1_700_000_000_000);
        assert_eq!(session.id, "u1_session_1700000000000");
        assert_eq!(session.title, "नया_सत्र");
        assert!(store.is_unnamed(&session));
        assert_eq!(store.sessions()[0].id, session.id);
        assert_single_active(&store);
    }

    #[test]
    fn test_create_new_bumps_colliding_millis() {
        let mut store = store();
        store.apply_listing(Ok(Vec::new()));

        let first = store.create_new(42);
        let second = store.create_new(42);
        assert_ne!(first.id, second.id);
        assert_eq!(second.id, "u1_session_43");
        assert_single_active(&store);
    }

    #[test]
    fn test_refresh_keeps_active_and_local_sessions() {
        let mut store = store();
        store.apply_listing(Ok(vec!["u1_a".to_string()]));
        let fresh = store.create_new(1);

        let added = store.refresh(&["u1_b".to_string(), "u1_a".to_string()]);
        assert_eq!(added, 1);

        let ids: Vec<_> = store.sessions().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![fresh.id.as_str(), "u1_a", "u1_b"]);
        assert_eq!(store.active_id(), Some(fresh.id.as_str()));
        assert_single_active(&store);
    }

    #[test]
    fn test_promote_rekeys_active_session() {
        let mut store = store();
        store.apply_listing(Ok(vec!["u1_a".to_string()]));
        let fresh = store.create_new(7);

        assert!(store.promote(&fresh.id, "u1_नमस्ते", "नमस्ते").unwrap());
        let active = store.active().unwrap();
        assert_eq!(active.id, "u1_नमस्ते");
        assert_eq!(active.title, "नमस्ते");
        assert_single_active(&store);
    }

    #[test]
    fn test_promote_refuses_existing_target() {
        let mut store = store();
        store.apply_listing(Ok(vec!["u1_a".to_string()]));
        let fresh = store.create_new(7);

        assert!(!store.promote(&fresh.id, "u1_a", "a").unwrap());
        assert_eq!(store.active_id(), Some(fresh.id.as_str()));
    }
}
