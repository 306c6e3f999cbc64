use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use super::ConfigError;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
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
    PathBuf::from("pokeindex.db")
}

/// Remote catalog API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API root (e.g., "https://pokeapi.co/api/v2")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Entries requested per catalog page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (unset: transport default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

impl ApiConfig {
    /// Catalog listing endpoint, without pagination.
    pub fn catalog_url(&self) -> String {
        format!("{}/pokemon/", self.base_url.trim_end_matches('/'))
    }

    /// URL of the first catalog page.
    pub fn first_page_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.catalog_url())
            .map_err(|e| ConfigError::ValidationError(format!("api.base_url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("offset", "0")
            .append_pair("limit", &self.page_size.to_string());
        Ok(url)
    }
}

fn default_base_url() -> String {
    "https://pokeapi.co/api/v2".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_user_agent() -> String {
    format!("PokeIndex/{}", env!("CARGO_PKG_VERSION"))
}

/// Sync controller configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Start the catalog sync when the server boots
    #[serde(default = "default_sync_on_startup")]
    pub sync_on_startup: bool,
    /// Capacity of the controller's command channel
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_on_startup: default_sync_on_startup(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

fn default_sync_on_startup() -> bool {
    true
}

fn default_channel_buffer() -> usize {
    256
}
