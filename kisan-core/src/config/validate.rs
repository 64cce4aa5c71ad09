//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let base_url = config.backend.base_url.trim();
    if base_url.is_empty() {
        errors.push("backend.base_url must not be empty".to_string());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push("backend.base_url must start with http:// or https://".to_string());
    }
    if config.backend.user_id.trim().is_empty() {
        errors.push("backend.user_id must not be empty".to_string());
    }
    if config.backend.timeout_secs == 0 {
        errors.push("backend.timeout_secs must be > 0".to_string());
    }

    if config.session.default_title.trim().is_empty() {
        errors.push("session.default_title must not be empty".to_string());
    }
    if config.session.new_title.trim().is_empty() {
        errors.push("session.new_title must not be empty".to_string());
    }
    if config.session.default_title == config.session.new_title {
        errors.push("session.default_title and session.new_title must differ".to_string());
    }
    if config.session.max_title_chars == 0 {
        errors.push("session.max_title_chars must be > 0".to_string());
    }

    if config.messages.fallback_reply.trim().is_empty() {
        errors.push("messages.fallback_reply must not be empty".to_string());
    }

    if config.reveal.enabled && config.reveal.base_delay_ms > 10_000 {
        errors.push("reveal.base_delay_ms must be <= 10000".to_string());
    }

    if config.voice.api_url.trim().is_empty() {
        errors.push("voice.api_url must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
