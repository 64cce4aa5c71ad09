//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Title given to the session synthesized when the backend knows none
pub const DEFAULT_SESSION_TITLE: &str = "सामान्य_चर्चा";
/// Sentinel title of a freshly created, not yet named session
pub const NEW_SESSION_TITLE: &str = "नया_सत्र";
/// Bot message shown when the chat call fails
pub const FALLBACK_REPLY: &str = "सर्वर से उत्तर प्राप्त नहीं हो सका।";
/// Bot message shown when the backend answers with an empty reply
pub const EMPTY_REPLY: &str = "कोई उत्तर उपलब्ध नहीं है।";

/// Root configuration for the Kisan Mitra client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Session naming settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Fixed user-visible messages
    #[serde(default)]
    pub messages: MessagesConfig,
    /// Typing reveal settings
    #[serde(default)]
    pub reveal: RevealConfig,
    /// Speech-to-text settings
    #[serde(default)]
    pub voice: VoiceConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the farmer query service
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Stable user identifier
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://kisan-mitra-chatbot-2.onrender.com".to_string()
}

fn default_user_id() -> String {
    "random_user1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: default_user_id(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Session naming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Title of the synthesized default session
    #[serde(default = "default_session_title")]
    pub default_title: String,
    /// Sentinel title of a fresh session
    #[serde(default = "new_session_title")]
    pub new_title: String,
    /// Maximum characters kept when a title is derived from a message
    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,
}

fn default_session_title() -> String {
    DEFAULT_SESSION_TITLE.to_string()
}

fn new_session_title() -> String {
    NEW_SESSION_TITLE.to_string()
}

fn default_max_title_chars() -> usize {
    48
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_title: default_session_title(),
            new_title: new_session_title(),
            max_title_chars: default_max_title_chars(),
        }
    }
}

/// Fixed user-visible messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Substituted for a failed chat call
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
    /// Substituted for an empty backend reply
    #[serde(default = "default_empty_reply")]
    pub empty_reply: String,
}

fn default_fallback_reply() -> String {
    FALLBACK_REPLY.to_string()
}

fn default_empty_reply() -> String {
    EMPTY_REPLY.to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            fallback_reply: default_fallback_reply(),
            empty_reply: default_empty_reply(),
        }
    }
}

/// Typing reveal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Whether bot replies are revealed word by word
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delay between words in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_base_delay_ms() -> u64 {
    75
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Speech-to-text settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// API key for the transcription endpoint
    #[serde(default)]
    pub api_key: String,
    /// Transcription endpoint
    #[serde(default = "default_voice_url")]
    pub api_url: String,
    /// Transcription model
    #[serde(default = "default_voice_model")]
    pub model: String,
    /// Spoken language hint (ISO-639-1)
    #[serde(default = "default_voice_language")]
    pub language: String,
}

fn default_voice_url() -> String {
    "https://api.groq.com/openai/v1/audio/transcriptions".to_string()
}

fn default_voice_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_voice_language() -> String {
    "hi".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_voice_url(),
            model: default_voice_model(),
            language: default_voice_language(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
