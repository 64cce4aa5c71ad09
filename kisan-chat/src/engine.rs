//! The chat engine: one handle over sessions, the conversation view and
//! the dispatcher

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use kisan_core::config::Config;
use kisan_core::events::ChatEvent;
use kisan_core::render::RevealScheduler;
use kisan_core::session::{Session, SessionStore};
use kisan_core::Result;
use kisan_gateway::{BackendGateway, SpeechToText};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dispatcher::{ChatDispatcher, SendOutcome};
use crate::history::load_history;
use crate::reveal;
use crate::state::{ChatSnapshot, ChatState};

/// Notice shown when dictation cannot work on this setup
pub const VOICE_UNSUPPORTED_NOTICE: &str =
    "Voice input is not available: set GROQ_API_KEY or voice.api_key";

/// Optional event channel to the front end
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ChatEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn emit(&self, event: ChatEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Cheap-to-clone handle over the shared client state.
///
/// Every operation takes the state lock only for synchronous transitions;
/// network calls and reveal ticks run unlocked and re-validate their view
/// token before touching state. Events are emitted under the lock so their
/// order matches the order of the transitions.
#[derive(Clone)]
pub struct ChatEngine {
    state: Arc<Mutex<ChatState>>,
    gateway: Arc<dyn BackendGateway>,
    dispatcher: ChatDispatcher,
    scheduler: RevealScheduler,
    reveal_enabled: bool,
    events: EventSink,
}

impl ChatEngine {
    /// Create an engine for `config.backend.user_id`; call
    /// [`ChatEngine::init`] before use
    pub fn new(config: &Config, gateway: Arc<dyn BackendGateway>) -> Self {
        let user_id = config.backend.user_id.clone();
        let sessions = SessionStore::new(user_id.clone(), &config.session);
        Self {
            state: Arc::new(Mutex::new(ChatState::new(sessions))),
            gateway,
            dispatcher: ChatDispatcher::new(user_id, &config.session, &config.messages),
            scheduler: RevealScheduler::from_config(&config.reveal),
            reveal_enabled: config.reveal.enabled,
            events: EventSink::default(),
        }
    }

    /// Send [`ChatEvent`]s to `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ChatEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn user_id(&self) -> &str {
        self.dispatcher.user_id()
    }

    pub fn gateway(&self) -> &Arc<dyn BackendGateway> {
        &self.gateway
    }

    /// Load the session list, activate the first session and fetch its
    /// history. Never fails: an unreachable backend yields one default
    /// session with an empty view.
    pub async fn init(&self) -> Vec<Session> {
        let listing = self.gateway.list_sessions(self.user_id()).await;

        let mounted = {
            let mut state = self.state.lock();
            state.sessions.apply_listing(listing);
            let mounted = state.mount_active(true);
            self.events.emit(ChatEvent::SessionsChanged);
            if let Some((token, _)) = &mounted {
                self.emit_view(token.session_id.clone(), state.is_loading());
            }
            mounted
        };

        if let Some((token, session)) = mounted {
            self.fill_view(token, &session).await;
        }
        self.state.lock().sessions.sessions().to_vec()
    }

    /// Make `session_id` active and load its history.
    ///
    /// Returns `Ok(false)` without refetching when it already was active.
    pub async fn select(&self, session_id: &str) -> Result<bool> {
        let (token, session) = {
            let mut state = self.state.lock();
            if !state.sessions.select(session_id)? {
                return Ok(false);
            }
            let Some(mounted) = state.mount_active(true) else {
                return Ok(false);
            };
            self.events.emit(ChatEvent::SessionsChanged);
            self.emit_view(mounted.0.session_id.clone(), state.is_loading());
            mounted
        };

        self.fill_view(token, &session).await;
        Ok(true)
    }

    /// Select the session at `index` in display order
    pub async fn select_index(&self, index: usize) -> Result<bool> {
        let id = {
            let state = self.state.lock();
            state.sessions.sessions().get(index).map(|s| s.id.clone())
        };
        match id {
            Some(id) => self.select(&id).await,
            None => Err(kisan_core::Error::NotFound(format!("session #{}", index + 1))),
        }
    }

    /// Select the session after the active one, wrapping around
    pub async fn select_next(&self) -> Result<bool> {
        let next = {
            let state = self.state.lock();
            let sessions = state.sessions.sessions();
            let current = sessions.iter().position(|s| s.is_active).unwrap_or(0);
            if sessions.is_empty() {
                None
            } else {
                Some((current + 1) % sessions.len())
            }
        };
        match next {
            Some(index) => self.select_index(index).await,
            None => Ok(false),
        }
    }

    /// Start a fresh, empty session; no history is fetched
    pub fn create_new(&self) -> Session {
        let mut state = self.state.lock();
        let session = state.sessions.create_new(Utc::now().timestamp_millis());
        state.mount_active(false);
        self.events.emit(ChatEvent::SessionsChanged);
        self.emit_view(session.id.clone(), state.is_loading());
        session
    }

    /// Send `text` from the active session.
    ///
    /// The human message is visible before the network call starts; the
    /// reply (or the fallback message) follows it unless the user is on
    /// another session when it arrives.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let ticket = {
            let mut state = self.state.lock();
            match self.dispatcher.begin(&mut state, text) {
                Ok(ticket) => {
                    self.events.emit(ChatEvent::MessageAppended {
                        session_id: ticket.session_id.clone(),
                        message_index: state.view.messages().len() - 1,
                    });
                    self.events.emit(ChatEvent::InputChanged {
                        text: String::new(),
                    });
                    self.events.emit(ChatEvent::LoadingChanged { loading: true });
                    ticket
                }
                Err(outcome) => return outcome,
            }
        };

        let result = self
            .gateway
            .send_message(self.user_id(), &ticket.text, &ticket.wire_session_id)
            .await;

        let completion = {
            let mut state = self.state.lock();
            let completion = self.dispatcher.complete(&mut state, &ticket, result);

            if let Some(index) = completion.message_index {
                self.events.emit(ChatEvent::MessageAppended {
                    session_id: state.view.session_id().unwrap_or_default().to_string(),
                    message_index: index,
                });
                if completion.outcome == SendOutcome::Replied && self.reveal_enabled {
                    reveal::start(
                        &mut state,
                        self.state.clone(),
                        self.events.clone(),
                        self.scheduler,
                        index,
                    );
                }
            }
            if completion.promoted_to.is_some() {
                self.events.emit(ChatEvent::SessionsChanged);
            }
            self.events.emit(ChatEvent::LoadingChanged {
                loading: state.is_loading(),
            });
            completion
        };

        if completion.delivered {
            self.refresh_sessions().await;
        }
        info!("Send from {} finished: {:?}", ticket.session_id, completion.outcome);
        completion.outcome
    }

    /// Merge the backend's current session list without moving the active
    /// pointer
    pub async fn refresh_sessions(&self) -> usize {
        match self.gateway.list_sessions(self.user_id()).await {
            Ok(ids) => {
                let mut state = self.state.lock();
                let added = state.sessions.refresh(&ids);
                if added > 0 {
                    self.events.emit(ChatEvent::SessionsChanged);
                }
                added
            }
            Err(e) => {
                warn!("Session refresh failed, keeping current list: {}", e);
                0
            }
        }
    }

    /// Transcribe `audio` into the input buffer.
    ///
    /// When speech input is unavailable or fails, a notice is emitted and
    /// the buffer is left alone.
    pub async fn dictate(&self, stt: &dyn SpeechToText, audio: &Path) -> Option<String> {
        if !stt.is_available() {
            self.events.emit(ChatEvent::notice(VOICE_UNSUPPORTED_NOTICE));
            return None;
        }

        match stt.transcribe(audio).await {
            Ok(text) => {
                let mut state = self.state.lock();
                state.input = text.clone();
                self.events.emit(ChatEvent::InputChanged { text: text.clone() });
                debug!("Dictated {} chars into input", text.chars().count());
                Some(text)
            }
            Err(e) => {
                warn!("Dictation failed: {}", e);
                self.events
                    .emit(ChatEvent::notice(format!("Voice input failed: {}", e)));
                None
            }
        }
    }

    /// Replace the input buffer
    pub fn set_input(&self, text: impl Into<String>) {
        self.state.lock().input = text.into();
    }

    pub fn input(&self) -> String {
        self.state.lock().input.clone()
    }

    /// Send whatever is in the input buffer
    pub async fn submit_input(&self) -> SendOutcome {
        let text = self.input();
        self.send(&text).await
    }

    /// Whether the active session is waiting on a reply
    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.lock().snapshot()
    }

    async fn fill_view(&self, token: kisan_core::conversation::ViewToken, session: &Session) {
        let messages = load_history(self.gateway.as_ref(), self.user_id(), session).await;

        let mut state = self.state.lock();
        if state.view.replace(&token, messages) {
            if let Some(index) = state.resume_view() {
                debug!("Attached held reply at {} in {}", index, token.session_id);
            }
            let session_id = state.view.session_id().unwrap_or_default().to_string();
            self.emit_view(session_id, state.is_loading());
        }
    }

    fn emit_view(&self, session_id: String, loading: bool) {
        self.events.emit(ChatEvent::ViewReplaced { session_id });
        self.events.emit(ChatEvent::LoadingChanged { loading });
    }
}
