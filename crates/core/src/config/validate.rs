use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Workflow batch size is at least 1
/// - Adapter URL is a non-empty http(s) URL
/// - Bidder keys are non-empty and unique
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.workflow.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "workflow.batch_size must be at least 1".to_string(),
        ));
    }

    if let Some(adapter) = &config.adapter {
        let url = adapter.url.trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError(
                "adapter.url cannot be empty".to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "adapter.url must be an http(s) URL, got '{}'",
                url
            )));
        }
    }

    let mut seen = HashSet::new();
    for bidder in &config.bidders {
        if bidder.key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bidders.key cannot be empty".to_string(),
            ));
        }
        if !seen.insert(bidder.key.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate bidder key '{}'",
                bidder.key
            )));
        }
    }

    Ok(())
}
