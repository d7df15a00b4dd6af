use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 本地校验失败（未发生任何网络请求）
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// 后端 API 调用错误
    #[error(transparent)]
    Api(#[from] ApiError),
    /// 对象存储写入错误
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// 配置错误
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// 本地文件错误
    #[error("file error: {0}")]
    File(#[from] FileError),
}

/// 文件校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 不支持的文件类型
    #[error("unsupported file type '{content_type}': accepted types are {accepted}")]
    UnsupportedType {
        content_type: String,
        accepted: String,
    },
    /// 文件过大
    #[error("file is {size} bytes, which exceeds the {max_mib} MB limit")]
    TooLarge { size: u64, max_mib: u64 },
    /// 标题为空
    #[error("document title must not be empty")]
    EmptyTitle,
}

/// 后端 API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（连接失败、超时等）
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 后端返回非 2xx 响应；message 为后端 detail 原文
    #[error("{message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 缺少或过期的 bearer 凭证
    #[error("unauthorized ({endpoint}): {message}")]
    Unauthorized { endpoint: String, message: String },
    /// 响应体解析失败
    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// HTTP 状态码（仅对后端响应类错误有意义）
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// 网络故障或 5xx，稍后重试可能成功
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Rejected { status, .. } => *status >= 500,
            ApiError::Unauthorized { .. } | ApiError::Decode { .. } => false,
        }
    }
}

/// 对象存储写入错误，三种失败各自独立描述
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload to object storage failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    #[error("upload to object storage was aborted")]
    Aborted,
    #[error("object storage rejected the upload with status {status}")]
    Rejected { status: u16 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("environment variable {var_name}: value '{value}' is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件解析失败
    #[error("failed to parse config file {path}: {source}")]
    FileParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 后端地址无法作为 URL 根路径
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// HTTP 客户端构建失败
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Api(ApiError::Transport {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建后端拒绝错误
    pub fn api_rejected(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        AppError::Api(ApiError::Rejected {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为本地校验错误
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    /// 后端是否返回 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Api(e) if e.is_not_found())
    }

    /// 是否为可重试的后端错误
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Api(e) if e.is_transient())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
