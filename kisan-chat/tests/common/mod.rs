#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use kisan_chat::{ChatEngine, ChatEvent};
use kisan_core::config::Config;
use kisan_core::conversation::Message;
use kisan_core::{Error, Result};
use kisan_gateway::{BackendGateway, ChatReply, SpeechToText, TranscriptionError};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

/// Scripted in-memory backend
#[derive(Default)]
pub struct MockGateway {
    /// `None` makes listing fail
    pub listing: Mutex<Option<Vec<String>>>,
    pub histories: Mutex<HashMap<String, Vec<Message>>>,
    /// Popped per send; an empty queue or `Err` makes the send fail
    pub replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    pub history_calls: Mutex<Vec<String>>,
    pub send_calls: Mutex<Vec<(String, String, String)>>,
    /// When set, sends wait for a permit before answering
    pub send_gate: Option<Arc<Notify>>,
}

impl MockGateway {
    pub fn with_sessions(ids: &[&str]) -> Self {
        let gateway = Self::default();
        *gateway.listing.lock() = Some(ids.iter().map(|s| s.to_string()).collect());
        gateway
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.send_gate = Some(gate);
        self
    }

    pub fn history(self, key: &str, messages: Vec<Message>) -> Self {
        self.histories.lock().insert(key.to_string(), messages);
        self
    }

    pub fn reply(&self, text: &str) {
        self.replies.lock().push_back(Ok(text.to_string()));
    }

    pub fn fail_next(&self) {
        self.replies.lock().push_back(Err("connection reset".to_string()));
    }

    pub fn history_calls(&self) -> Vec<String> {
        self.history_calls.lock().clone()
    }
}

#[async_trait]
impl BackendGateway for MockGateway {
    async fn list_sessions(&self, _user_id: &str) -> Result<Vec<String>> {
        self.listing
            .lock()
            .clone()
            .ok_or_else(|| Error::remote("list_sessions", "offline"))
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>> {
        self.history_calls.lock().push(session_id.to_string());
        Ok(self
            .histories
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, user_id: &str, text: &str, session_id: &str) -> Result<ChatReply> {
        self.send_calls
            .lock()
            .push((user_id.to_string(), text.to_string(), session_id.to_string()));
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        let next = self.replies.lock().pop_front();
        match next {
            Some(Ok(reply)) => Ok(ChatReply::new(reply)),
            Some(Err(reason)) => Err(Error::remote("send_message", reason)),
            None => Err(Error::remote("send_message", "no scripted reply")),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

/// Speech-to-text stub
pub struct FakeSpeech {
    pub available: bool,
    pub transcript: &'static str,
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn transcribe(&self, _path: &Path) -> std::result::Result<String, TranscriptionError> {
        if self.transcript.is_empty() {
            Err(TranscriptionError::EmptyTranscript)
        } else {
            Ok(self.transcript.to_string())
        }
    }
}

pub fn config() -> Config {
    let mut config = Config::default();
    config.backend.user_id = "u1".to_string();
    config
}

pub fn engine(gateway: Arc<MockGateway>) -> (ChatEngine, mpsc::UnboundedReceiver<ChatEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChatEngine::new(&config(), gateway).with_events(tx), rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
