use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 默认文件大小上限：50 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 根地址
    pub api_base_url: String,
    /// Bearer 凭证（由仪表盘登录流程获得）
    pub access_token: Option<String>,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 状态轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 上传文件大小上限（字节）
    pub max_file_size: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            access_token: None,
            request_timeout_secs: 60,
            poll_interval_ms: 3000,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides()
    }

    /// TOML 配置文件 + 环境变量（环境变量优先）
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        let config: Config = toml::from_str(&content).map_err(|source| {
            ConfigError::FileParseFailed {
                path: path.display().to_string(),
                source,
            }
        })?;

        config.with_env_overrides()
    }

    fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            api_base_url: std::env::var("DOCINGEST_API_URL").unwrap_or(self.api_base_url),
            access_token: std::env::var("DOCINGEST_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .or(self.access_token),
            request_timeout_secs: env_parse("DOCINGEST_REQUEST_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.request_timeout_secs),
            poll_interval_ms: env_parse("DOCINGEST_POLL_INTERVAL_MS", "u64")?
                .unwrap_or(self.poll_interval_ms),
            max_file_size: env_parse("DOCINGEST_MAX_FILE_SIZE", "u64")?
                .unwrap_or(self.max_file_size),
            verbose_logging: env_parse("DOCINGEST_VERBOSE", "bool")?
                .unwrap_or(self.verbose_logging),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}
