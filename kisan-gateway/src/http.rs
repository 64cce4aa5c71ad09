//! HTTP client for the farmer query service

use std::time::Duration;

use async_trait::async_trait;
use kisan_core::config::BackendConfig;
use kisan_core::conversation::Message;
use kisan_core::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::base::{BackendGateway, ChatReply};

const API_PREFIX: &str = "farmer_query";

/// `POST /farmer_query/chat` body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    user_id: &'a str,
    message: &'a str,
    session_id: &'a str,
    stream: bool,
}

/// `POST /farmer_query/chat` response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    response: Option<String>,
}

/// reqwest-backed [`BackendGateway`]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a gateway for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/farmer_query/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = format!("{}/{}", self.base_url, API_PREFIX);
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &'static str, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::remote(operation, e))?;
        Self::decode(operation, response).await
    }

    async fn decode<T: DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("{} failed: HTTP {} {}", operation, status, error_text);
            return Err(Error::remote(
                operation,
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::remote(operation, format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["allSession_user", user_id]);
        let ids: Vec<String> = self.get_json("list_sessions", &url).await?;
        debug!("Backend listed {} session(s) for {}", ids.len(), user_id);
        Ok(ids)
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let url = self.endpoint(&["session", session_id, "history"]);
        let messages: Vec<Message> = self.get_json("fetch_history", &url).await?;
        debug!("Fetched {} message(s) for {}", messages.len(), session_id);
        Ok(messages)
    }

    async fn send_message(
        &self,
        user_id: &str,
        text: &str,
        session_id: &str,
    ) -> Result<ChatReply> {
        let url = self.endpoint(&["chat"]);
        let request = ChatRequest {
            user_id,
            message: text,
            session_id,
            stream: false,
        };

        debug!("POST {} for session {}", url, session_id);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::remote("send_message", e))?;

        let body: ChatResponse = Self::decode("send_message", response).await?;
        Ok(ChatReply::new(body.response.unwrap_or_default()))
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::from_config(&BackendConfig::default())
    }
}
