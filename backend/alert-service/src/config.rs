use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub websocket: WebSocketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON alert log per user
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// Idle interval after which a session emits a heartbeat
    pub heartbeat_secs: u64,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|e| AppError::Config(format!("APP_PORT: {}", e)))?,
            },
            storage: StorageConfig {
                data_dir: std::env::var("ALERT_DATA_DIR")
                    .unwrap_or_else(|_| "./data/alerts".to_string()),
            },
            websocket: WebSocketConfig {
                heartbeat_secs: std::env::var("WS_HEARTBEAT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|e| AppError::Config(format!("WS_HEARTBEAT_SECS: {}", e)))?,
            },
        })
    }
}
