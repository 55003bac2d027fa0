//! 本地存储数据访问层（DAO）
//!
//! 两个分区：`sync_settings` 保存 Notion 配置，`local_entries` 保存每次保存尝试的备份。
//! 备份 key 为 `leetcode_<毫秒时间戳>`，同一毫秒内的两次保存会互相覆盖。

use crate::notes::error::StorageError;
use crate::notes::models::{backup_key, iso_timestamp, BackupRow, LocalBackupEntry, NotionConfig, SaveRecord};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, error, info, warn};

/// 同步分区中的配置 key
pub const TOKEN_KEY: &str = "notionToken";
pub const DATABASE_ID_KEY: &str = "notionDatabaseId";

/// 本地存储接口，保存流水线只依赖此接口，测试中可以注入假实现
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// 读取配置，未设置的字段为 None
    async fn get_configuration(&self) -> Result<NotionConfig, StorageError>;

    /// 整体覆盖配置（两个字段在同一事务中写入）
    async fn set_configuration(&self, config: &NotionConfig) -> Result<(), StorageError>;

    /// 追加一条备份，返回生成的 key
    async fn append_backup(&self, record: &SaveRecord, synced: bool) -> Result<String, StorageError>;

    /// 以指定 key 写入完整备份条目
    async fn put_backup(&self, key: &str, entry: &LocalBackupEntry) -> Result<(), StorageError>;

    /// 批量写入备份（用于导入）；默认逐条写入，NoteDao 在单个事务中全部写入或全部回滚
    async fn put_backups(&self, rows: &[BackupRow]) -> Result<(), StorageError> {
        for row in rows {
            self.put_backup(&row.key, &row.entry).await?;
        }
        Ok(())
    }

    /// 列出所有备份（存储顺序，不保证有序）；任一条目无法解析时返回错误
    async fn list_backups(&self) -> Result<Vec<BackupRow>, StorageError>;

    /// 清空本地分区中的全部备份，不可恢复
    async fn clear_all(&self) -> Result<(), StorageError>;
}

/// 基于 sqlx 的本地存储 DAO
pub struct NoteDao {
    db: Pool<Sqlite>,
}

impl NoteDao {
    /// 创建新的 DAO
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM sync_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }
}

async fn write_setting(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    key: &str,
    value: Option<&str>,
) -> Result<(), StorageError> {
    match value {
        Some(v) => {
            sqlx::query(
                r#"
                INSERT INTO sync_settings (key, value) VALUES (?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(key)
            .bind(v)
            .execute(&mut **tx)
            .await?;
        }
        None => {
            sqlx::query("DELETE FROM sync_settings WHERE key = ?")
                .bind(key)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

async fn write_entry<'e, E>(exec: E, key: &str, entry: &LocalBackupEntry) -> Result<(), StorageError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let value = serde_json::to_string(entry)?;
    sqlx::query(
        r#"
        INSERT INTO local_entries (key, value, saved_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(key)
    .bind(&value)
    .bind(&entry.saved_at)
    .execute(exec)
    .await?;
    Ok(())
}

#[async_trait]
impl LocalStore for NoteDao {
    async fn get_configuration(&self) -> Result<NotionConfig, StorageError> {
        let config = NotionConfig {
            token: self.get_setting(TOKEN_KEY).await?,
            database_id: self.get_setting(DATABASE_ID_KEY).await?,
        };
        debug!(
            "[NoteDAO] 读取配置: token={}, databaseId={:?}",
            if config.token.is_some() { "已设置" } else { "未设置" },
            config.database_id
        );
        Ok(config)
    }

    async fn set_configuration(&self, config: &NotionConfig) -> Result<(), StorageError> {
        let mut tx = self.db.begin().await?;
        write_setting(&mut tx, TOKEN_KEY, config.token.as_deref()).await?;
        write_setting(&mut tx, DATABASE_ID_KEY, config.database_id.as_deref()).await?;
        tx.commit().await?;
        info!("[NoteDAO] 配置已保存，databaseId: {:?}", config.database_id);
        Ok(())
    }

    async fn append_backup(&self, record: &SaveRecord, synced: bool) -> Result<String, StorageError> {
        let now = Utc::now();
        let key = backup_key(now);
        let entry = LocalBackupEntry {
            record: record.clone(),
            saved_at: iso_timestamp(now),
            synced,
        };
        self.put_backup(&key, &entry).await?;
        info!("[NoteDAO] 备份已写入: {}，synced: {}", key, synced);
        Ok(key)
    }

    async fn put_backup(&self, key: &str, entry: &LocalBackupEntry) -> Result<(), StorageError> {
        write_entry(&self.db, key, entry).await?;
        debug!("[NoteDAO] 写入备份条目: {}", key);
        Ok(())
    }

    async fn put_backups(&self, rows: &[BackupRow]) -> Result<(), StorageError> {
        let mut tx = self.db.begin().await?;
        for row in rows {
            write_entry(&mut *tx, &row.key, &row.entry).await?;
        }
        tx.commit().await?;
        info!("[NoteDAO] 批量写入备份 {} 条", rows.len());
        Ok(())
    }

    async fn list_backups(&self) -> Result<Vec<BackupRow>, StorageError> {
        let rows = sqlx::query("SELECT key, value FROM local_entries")
            .fetch_all(&self.db)
            .await?;

        let mut backups = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.get("key");
            let value: String = row.get("value");
            match serde_json::from_str::<LocalBackupEntry>(&value) {
                Ok(entry) => backups.push(BackupRow { key, entry }),
                Err(source) => {
                    error!("[NoteDAO] 备份无法解析 {}: {}", key, source);
                    return Err(StorageError::CorruptEntry { key, source });
                }
            }
        }
        debug!("[NoteDAO] 获取本地备份列表，共 {} 条", backups.len());
        Ok(backups)
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM local_entries")
            .execute(&self.db)
            .await?;
        warn!("[NoteDAO] 已清空本地备份，共删除 {} 条", result.rows_affected());
        Ok(())
    }
}
