//! Workflow configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the order provisioning workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Creative associations created per remote call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Capacity of the progress channel handed out by the server.
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,
}

fn default_batch_size() -> usize {
    100
}

fn default_progress_buffer() -> usize {
    32
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            progress_buffer: default_progress_buffer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkflowConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.progress_buffer, 32);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: WorkflowConfig = toml::from_str("batch_size = 250").unwrap();
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.progress_buffer, 32);
    }
}
