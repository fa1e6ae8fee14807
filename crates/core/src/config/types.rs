use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::bidders::Bidder;
use crate::workflow::WorkflowConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Remote ad server. Provisioning is disabled when absent.
    #[serde(default)]
    pub adapter: Option<AdapterConfig>,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    /// Bidders known before the remote bidder list is fetched.
    #[serde(default)]
    pub bidders: Vec<Bidder>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("adprovision.db")
}

/// Remote ad server REST API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdapterConfig {
    /// Base URL of the REST namespace (e.g., "https://example.com/wp-json/newspack-ads/v1")
    pub url: String,
    /// Basic auth user name
    #[serde(default)]
    pub username: Option<String>,
    /// Basic auth password (application password)
    #[serde(default)]
    pub password: Option<String>,
    /// Request timeout in seconds. Unset means no client-side timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Ad settings storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingsConfig {
    /// Prefix for stored option names
    #[serde(default = "default_settings_prefix")]
    pub prefix: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            prefix: default_settings_prefix(),
        }
    }
}

fn default_settings_prefix() -> String {
    "_ads_".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<SanitizedAdapterConfig>,
    pub workflow: WorkflowConfig,
    pub settings: SettingsConfig,
    pub bidders: Vec<String>,
}

/// Sanitized adapter config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAdapterConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            adapter: config.adapter.as_ref().map(|a| SanitizedAdapterConfig {
                url: a.url.clone(),
                username: a.username.clone(),
                password_configured: a.password.as_ref().is_some_and(|p| !p.is_empty()),
                timeout_secs: a.timeout_secs,
            }),
            workflow: config.workflow.clone(),
            settings: config.settings.clone(),
            bidders: config.bidders.iter().map(|b| b.key.clone()).collect(),
        }
    }
}
