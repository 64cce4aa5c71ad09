//! History loading for session transitions

use kisan_core::conversation::Message;
use kisan_core::session::{backend_session_id, Session};
use kisan_gateway::BackendGateway;
use tracing::{debug, warn};

/// Fetch the history of `session`, keyed by `{user}_{title}`.
///
/// Failures resolve to an empty history; the caller still replaces the view.
pub async fn load_history(
    gateway: &dyn BackendGateway,
    user_id: &str,
    session: &Session,
) -> Vec<Message> {
    let key = backend_session_id(user_id, &session.title);
    match gateway.fetch_history(&key).await {
        Ok(messages) => {
            debug!("Loaded {} message(s) for {}", messages.len(), key);
            messages
        }
        Err(e) => {
            warn!("History for {} unavailable, showing empty view: {}", key, e);
            Vec::new()
        }
    }
}
