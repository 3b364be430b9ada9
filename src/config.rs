use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// An API key mapped to the user it authenticates.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: Uuid,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Capacity of each outbound event queue. A full queue backpressures
    /// the publishing request after commit.
    pub event_queue_capacity: usize,
    /// Bearer keys accepted by the API
    pub api_keys: Vec<ApiKeyEntry>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            port: 8080,
            database_path: data_dir.join("shoply").join("shoply.db"),
            event_queue_capacity: 64,
            api_keys: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Read(path.clone(), e))?;
            config =
                serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))?;
        }

        if let Ok(port) = std::env::var("SHOPLY_PORT") {
            config.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port))?;
        }
        if let Ok(db_path) = std::env::var("SHOPLY_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }

        Ok(config)
    }

    /// Default config file path: `<config dir>/shoply/config.yaml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shoply")
            .join("config.yaml")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse config file '{0}': {1}")]
    Parse(PathBuf, serde_yaml::Error),
    #[error("SHOPLY_PORT is not a valid port: {0}")]
    InvalidPort(String),
}
