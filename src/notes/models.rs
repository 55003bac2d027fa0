//! 本地模型定义：保存记录、备份条目、Notion 配置

use crate::notes::error::ConfigError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// 备份条目 key 前缀，完整 key 为 `leetcode_<毫秒时间戳>`
pub const BACKUP_KEY_PREFIX: &str = "leetcode_";

/// ISO-8601 时间（毫秒精度，`Z` 结尾）
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 根据创建时刻生成备份 key
pub fn backup_key(at: DateTime<Utc>) -> String {
    format!("{}{}", BACKUP_KEY_PREFIX, at.timestamp_millis())
}

/// 是否为合法的备份 key：前缀后跟毫秒时间戳
pub fn is_backup_key(key: &str) -> bool {
    key.strip_prefix(BACKUP_KEY_PREFIX)
        .is_some_and(|ms| !ms.is_empty() && ms.bytes().all(|b| b.is_ascii_digit()))
}

/// 一次保存的数据单元（既写入本地，也发送到远端）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    #[serde(rename = "questionName")]
    pub question_name: String,
    /// 逗号分隔的标签，可为空
    #[serde(default)]
    pub topics: String,
    /// 解题思路，可为空
    #[serde(default)]
    pub intuition: String,
    pub url: String,
    /// 创建时刻（ISO-8601）
    pub timestamp: String,
}

impl SaveRecord {
    /// 以当前时间创建记录
    pub fn new(
        question_name: impl Into<String>,
        topics: impl Into<String>,
        intuition: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            question_name: question_name.into(),
            topics: topics.into(),
            intuition: intuition.into(),
            url: url.into(),
            timestamp: iso_timestamp(Utc::now()),
        }
    }
}

/// 本地备份条目 = 保存记录 + 持久化时间 + 同步标记
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBackupEntry {
    #[serde(flatten)]
    pub record: SaveRecord,
    #[serde(rename = "savedAt")]
    pub saved_at: String,
    /// 仅当对应的远端创建调用成功时为 true
    pub synced: bool,
}

/// 带 key 的备份条目，也是导出文件中数组元素的格式 `{key, ...entry}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRow {
    pub key: String,
    #[serde(flatten)]
    pub entry: LocalBackupEntry,
}

/// 按 savedAt 倒序（最新在前）
pub fn sort_newest_first(rows: &mut [BackupRow]) {
    rows.sort_by(|a, b| {
        b.entry
            .saved_at
            .cmp(&a.entry.saved_at)
            .then_with(|| b.key.cmp(&a.key))
    });
}

/// Notion 配置（同步分区中的 notionToken / notionDatabaseId）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(rename = "notionToken", default)]
    pub token: Option<String>,
    #[serde(rename = "notionDatabaseId", default)]
    pub database_id: Option<String>,
}

impl NotionConfig {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            database_id: Some(database_id.into()),
        }
    }

    /// 取出已校验的凭据；空字符串视为缺失
    pub fn credentials(&self) -> Result<NotionCredentials, ConfigError> {
        let token = non_empty(&self.token).ok_or(ConfigError::MissingToken)?;
        let database_id = non_empty(&self.database_id).ok_or(ConfigError::MissingDatabaseId)?;
        Ok(NotionCredentials {
            token: token.to_string(),
            database_id: database_id.to_string(),
        })
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// 校验通过的凭据，只在单次调用内传递
#[derive(Clone, PartialEq, Eq)]
pub struct NotionCredentials {
    pub token: String,
    pub database_id: String,
}

impl std::fmt::Debug for NotionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionCredentials")
            .field("token", &mask_secret(&self.token))
            .field("database_id", &self.database_id)
            .finish()
    }
}

/// 用于日志和展示的 token 脱敏
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
