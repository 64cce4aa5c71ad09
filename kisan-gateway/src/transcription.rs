//! Voice input through a Whisper-compatible transcription API

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use kisan_core::config::VoiceConfig;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

/// Transcription errors
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("voice input is not configured (missing API key)")]
    NoApiKey,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("no speech recognized")]
    EmptyTranscript,
}

/// One finalized transcript per recording
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Whether dictation can work at all on this setup
    fn is_available(&self) -> bool;

    /// Transcribe a recorded audio file
    async fn transcribe(&self, path: &Path) -> Result<String, TranscriptionError>;
}

/// Whisper API response
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Speech-to-text over Groq's (or any OpenAI-compatible) Whisper endpoint
#[derive(Clone)]
pub struct TranscriptionService {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    language: Option<String>,
}

impl TranscriptionService {
    /// Create a service with default endpoint, model and Hindi as language
    pub fn new(api_key: Option<String>) -> Self {
        Self::from_config(&VoiceConfig {
            api_key: api_key.unwrap_or_default(),
            ..VoiceConfig::default()
        })
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        let api_key = Some(config.api_key.clone()).filter(|k| !k.trim().is_empty());
        let language = Some(config.language.clone()).filter(|l| !l.trim().is_empty());
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            language,
        }
    }

    /// Check if the service is configured
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Transcribe an audio file (mp3, wav, ogg, flac, m4a, webm)
    pub async fn transcribe_file<P: AsRef<Path>>(
        &self,
        file_path: P,
    ) -> Result<String, TranscriptionError> {
        let api_key = self.api_key.as_ref().ok_or(TranscriptionError::NoApiKey)?;

        let path = file_path.as_ref();
        if !path.exists() {
            return Err(TranscriptionError::FileNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let file_bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();
        debug!("Transcribing {} ({} bytes)", file_name, file_bytes.len());

        let file_part = Part::bytes(file_bytes).file_name(file_name);
        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Transcription failed: {} - {}", status, error_text);
            return Err(TranscriptionError::ApiError(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let data: WhisperResponse = response.json().await?;
        let text = data.text.trim();
        if text.is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl SpeechToText for TranscriptionService {
    fn is_available(&self) -> bool {
        self.is_configured()
    }

    async fn transcribe(&self, path: &Path) -> Result<String, TranscriptionError> {
        self.transcribe_file(path).await
    }
}

impl Default for TranscriptionService {
    fn default() -> Self {
        Self::from_config(&VoiceConfig::default())
    }
}
