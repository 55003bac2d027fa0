//! 错误分类
//!
//! 按类别而不是实现细节划分：配置缺失、远端拒绝/不可达、本地持久化失败、表单校验失败。
//! 保存流水线的两个终态（部分失败 / 全部失败）不是错误，见 `service::SaveOutcome`。

use thiserror::Error;

/// 配置错误：没有用户操作无法恢复，会阻止任何网络调用
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Notion configuration not found: missing integration token. Please set up Notion integration first.")]
    MissingToken,
    #[error("Notion configuration not found: missing database ID. Please set up Notion integration first.")]
    MissingDatabaseId,
    #[error("Invalid Notion database URL or ID: {0}")]
    InvalidDatabaseLink(String),
}

/// 远端错误：Notion API 返回非 2xx，或传输层失败（此时 `status` 为 None）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notion API error: {message}")]
pub struct RemoteError {
    pub status: Option<u16>,
    /// Notion 错误码，例如 `unauthorized`、`object_not_found`
    pub code: Option<String>,
    pub message: String,
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::http(status.as_u16(), e.to_string()),
            None => Self::transport(e.to_string()),
        }
    }
}

/// 本地存储错误：始终原样上报，不会被吞掉
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 已存备份无法解析
    #[error("Corrupt backup entry {key}: {source}")]
    CorruptEntry {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// 存储拒绝写入（例如配额耗尽、导入的 key 不合法）
    #[error("{0}")]
    Rejected(String),
}

/// 表单校验错误（由交互层在提交前检查）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Question name is required")]
    MissingQuestionName,
    #[error("Problem URL is required")]
    MissingUrl,
}

/// 汇总错误，供门面层和 CLI 统一处理
#[derive(Debug, Error)]
pub enum NotesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type NotesResult<T> = std::result::Result<T, NotesError>;
