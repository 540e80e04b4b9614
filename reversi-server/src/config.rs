//! 服务端配置
//!
//! 配置文件为 JSON 格式，缺省字段使用默认值。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use protocol::{NetworkConfig, DEFAULT_MAX_BOARD_SIZE, MIN_BOARD_SIZE};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid max board size: {0}")]
    InvalidMaxBoardSize(usize),
}

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub network: NetworkConfig,
    /// 允许的最大棋盘边长
    pub max_board_size: usize,
    /// 读空闲超时（秒），不设置则不超时
    pub idle_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                host: "0.0.0.0".to_string(),
                ..NetworkConfig::default()
            },
            max_board_size: DEFAULT_MAX_BOARD_SIZE,
            idle_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ServerConfig = serde_json::from_str(&content)?;
        config.validate()?;

        info!("已加载配置: {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_board_size < MIN_BOARD_SIZE || self.max_board_size % 2 != 0 {
            return Err(ConfigError::InvalidMaxBoardSize(self.max_board_size));
        }
        Ok(())
    }

    /// 读空闲超时，0 视为不超时
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
