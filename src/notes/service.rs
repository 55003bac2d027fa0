//! 保存流水线服务层
//!
//! 决定一次保存最终落在远端、本地、两者，还是全部失败：
//! 1. 配置缺失：直接返回配置错误，不发请求也不写备份；
//! 2. 远端成功：写入 synced=true 的备份（写透，失败只记日志），返回成功；
//! 3. 远端失败：写入 synced=false 的备份，成功则为部分失败，否则为全部失败。
//!
//! 不做任何自动重试，再次保存会生成一条新的独立备份。

use crate::notes::api::RemoteClient;
use crate::notes::dao::LocalStore;
use crate::notes::error::{ConfigError, RemoteError};
use crate::notes::models::{NotionConfig, SaveRecord};
use crate::notes::types::build_document;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 一次保存的终态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// 远端创建成功；写透失败时 `backup_key` 为 None，`backup_error` 为存储错误原文
    Success {
        remote_page_id: String,
        backup_key: Option<String>,
        backup_error: Option<String>,
    },
    /// 远端失败，但本地备份已写入（synced=false）
    PartialFailure {
        message: String,
        backup_key: String,
        remote: RemoteError,
    },
    /// 远端和本地都失败，没有任何新数据落盘
    TotalFailure {
        message: String,
        remote: RemoteError,
        storage: String,
    },
}

impl SaveOutcome {
    /// 面向用户的提示文字
    pub fn message(&self) -> String {
        match self {
            SaveOutcome::Success {
                backup_error: Some(storage),
                ..
            } => format!(
                "Saved successfully to Notion! (local backup failed: {})",
                storage
            ),
            SaveOutcome::Success { .. } => "Saved successfully to Notion!".to_string(),
            SaveOutcome::PartialFailure { message, .. } => message.clone(),
            SaveOutcome::TotalFailure { message, .. } => message.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SaveOutcome::Success { .. })
    }

    /// 数据是否至少在一处落盘
    pub fn is_persisted(&self) -> bool {
        !matches!(self, SaveOutcome::TotalFailure { .. })
    }
}

/// 保存流水线
pub struct NoteSaver {
    remote: Arc<dyn RemoteClient>,
    store: Arc<dyn LocalStore>,
}

impl NoteSaver {
    pub fn new(remote: Arc<dyn RemoteClient>, store: Arc<dyn LocalStore>) -> Self {
        Self { remote, store }
    }

    /// 以今天（UTC）为 Date Added 执行保存
    pub async fn save(
        &self,
        config: &NotionConfig,
        record: &SaveRecord,
    ) -> Result<SaveOutcome, ConfigError> {
        self.save_on(config, record, Utc::now().date_naive()).await
    }

    /// 执行保存，`today` 写入文档的 Date Added
    pub async fn save_on(
        &self,
        config: &NotionConfig,
        record: &SaveRecord,
        today: NaiveDate,
    ) -> Result<SaveOutcome, ConfigError> {
        let creds = config.credentials().map_err(|e| {
            error!("[NoteSaver] 配置缺失，放弃保存: {}", e);
            e
        })?;

        info!(
            "[NoteSaver] 💾 开始保存: {} ({})",
            record.question_name, record.url
        );
        let doc = build_document(&creds.database_id, record, today);

        match self.remote.create_page(&creds, &doc).await {
            Ok(remote_page_id) => {
                let (backup_key, backup_error) =
                    match self.store.append_backup(record, true).await {
                        Ok(key) => (Some(key), None),
                        Err(e) => {
                            warn!("[NoteSaver] 远端已保存，但本地写透失败: {}", e);
                            (None, Some(e.to_string()))
                        }
                    };
                info!("[NoteSaver] ✅ 保存成功，页面ID: {}", remote_page_id);
                Ok(SaveOutcome::Success {
                    remote_page_id,
                    backup_key,
                    backup_error,
                })
            }
            Err(remote) => {
                error!("[NoteSaver] 远端保存失败: {}", remote);
                match self.store.append_backup(record, false).await {
                    Ok(backup_key) => {
                        warn!("[NoteSaver] 已保存到本地备份: {}", backup_key);
                        Ok(SaveOutcome::PartialFailure {
                            message: format!(
                                "Notion save failed but saved locally: {}",
                                remote.message
                            ),
                            backup_key,
                            remote,
                        })
                    }
                    Err(storage) => {
                        error!("[NoteSaver] ❌ 本地备份也失败: {}", storage);
                        let storage = storage.to_string();
                        Ok(SaveOutcome::TotalFailure {
                            message: format!(
                                "Failed to save to Notion and locally: {}; local storage error: {}",
                                remote.message, storage
                            ),
                            remote,
                            storage,
                        })
                    }
                }
            }
        }
    }
}
