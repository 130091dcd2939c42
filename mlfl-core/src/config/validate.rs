//! Configuration validation rules.

use super::schema::Config;
use crate::transcript::TranscriptFormat;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let api_base = config.backend.api_base.trim();
    if api_base.is_empty() {
        errors.push("backend.api_base must not be empty".to_string());
    } else if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
        errors.push("backend.api_base must be an http(s) URL".to_string());
    }
    if config.backend.timeout_secs == 0 {
        errors.push("backend.timeout_secs must be > 0".to_string());
    }

    if config.session.history_window == 0 {
        errors.push("session.history_window must be > 0".to_string());
    }
    if config.session.metadata_preview == 0 {
        errors.push("session.metadata_preview must be > 0".to_string());
    }
    if config.session.excerpt_chars < 4 {
        errors.push("session.excerpt_chars must be >= 4".to_string());
    }

    if config
        .export
        .default_format
        .parse::<TranscriptFormat>()
        .is_err()
    {
        errors.push("export.default_format must be markdown or plain-text".to_string());
    }

    match config.logging.format.to_lowercase().as_str() {
        "text" | "json" => {}
        _ => errors.push("logging.format must be text or json".to_string()),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
