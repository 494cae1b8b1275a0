//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Game registry configuration.
    #[serde(default)]
    pub games: GamesConfig,
    /// Friend graph and messaging configuration.
    #[serde(default)]
    pub social: SocialConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
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

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Game registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GamesConfig {
    /// Maximum number of games returned by the public feed.
    #[serde(default = "default_feed_limit")]
    pub feed_limit: u64,
    /// Maximum number of games returned by a user's history.
    #[serde(default = "default_history_limit")]
    pub history_limit: u64,
    /// Display name used for synthetic chat announcements.
    #[serde(default = "default_system_sender_name")]
    pub system_sender_name: String,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            feed_limit: default_feed_limit(),
            history_limit: default_history_limit(),
            system_sender_name: default_system_sender_name(),
        }
    }
}

/// Friend graph and messaging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialConfig {
    /// Maximum number of users returned by a search.
    #[serde(default = "default_search_limit")]
    pub search_limit: u64,
    /// Queries shorter than this return no results.
    #[serde(default = "default_search_min_chars")]
    pub search_min_chars: usize,
    /// Only allow direct messages between accepted friends.
    #[serde(default)]
    pub require_friendship_for_messages: bool,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            search_min_chars: default_search_min_chars(),
            require_friendship_for_messages: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_feed_limit() -> u64 {
    50
}

const fn default_history_limit() -> u64 {
    50
}

fn default_system_sender_name() -> String {
    "Pickup".to_string()
}

const fn default_search_limit() -> u64 {
    20
}

const fn default_search_min_chars() -> usize {
    2
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `PICKUP_ENV`)
    /// 4. Environment variables with `PICKUP__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("PICKUP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PICKUP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PICKUP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
