//! LeetNote 客户端门面
//!
//! 把本地存储、Notion API 和保存流水线组装在一起，供 CLI 等交互层调用。
//! 配置始终从本地存储读出后显式传入下层，不使用全局状态。

use crate::notes::api::{NotionApi, RemoteClient};
use crate::notes::collection_id::normalize_collection_id;
use crate::notes::dao::{LocalStore, NoteDao};
use crate::notes::db::create_sqlite_pool_with_migration;
use crate::notes::error::{ConfigError, NotesResult};
use crate::notes::export;
use crate::notes::models::{sort_newest_first, BackupRow, NotionConfig, SaveRecord};
use crate::notes::page::{NoteForm, PageContext};
use crate::notes::service::{NoteSaver, SaveOutcome};
use crate::notes::types::{DatabaseInfo, PageSummary, NOTION_API_BASE_URL, NOTION_VERSION};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Notion API 基础地址
    pub api_base_url: String,
    /// Notion-Version 请求头
    pub notion_version: String,
    /// 本地 SQLite 数据库 URL
    ///
    /// 例如：`sqlite://leetnote.db?mode=rwc`
    pub db_url: String,
    /// 表单标题为空时是否用页面标题预填
    pub prefill_title: bool,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(db_url: impl Into<String>) -> Self {
        Self {
            api_base_url: NOTION_API_BASE_URL.to_string(),
            notion_version: NOTION_VERSION.to_string(),
            db_url: db_url.into(),
            prefill_title: true,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("sqlite://leetnote.db?mode=rwc")
    }
}

/// LeetNote 客户端
pub struct LeetNoteClient {
    config: ClientConfig,
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteClient>,
    saver: NoteSaver,
}

impl LeetNoteClient {
    /// 连接本地数据库并创建 HTTP 客户端
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let pool = create_sqlite_pool_with_migration(&config.db_url).await?;
        let http_client = reqwest::ClientBuilder::new()
            .build()
            .context("创建 HTTP 客户端失败")?;
        let api = NotionApi::new(
            http_client,
            config.api_base_url.clone(),
            config.notion_version.clone(),
        );
        info!(
            "[Client] 客户端已创建，API: {}, 数据库: {}",
            config.api_base_url, config.db_url
        );
        Ok(Self::with_parts(
            config,
            Arc::new(api),
            Arc::new(NoteDao::new(pool)),
        ))
    }

    /// 使用外部提供的远端和本地实现（测试或自定义传输）
    pub fn with_parts(
        config: ClientConfig,
        remote: Arc<dyn RemoteClient>,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            saver: NoteSaver::new(remote.clone(), store.clone()),
            config,
            store,
            remote,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 保存配置；数据库输入可以是分享链接或原始 ID，会被规范化
    pub async fn configure(&self, token: &str, database_input: &str) -> NotesResult<NotionConfig> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingToken.into());
        }
        let database_input = database_input.trim();
        if database_input.is_empty() {
            return Err(ConfigError::MissingDatabaseId.into());
        }
        let database_id = normalize_collection_id(database_input)
            .ok_or_else(|| ConfigError::InvalidDatabaseLink(database_input.to_string()))?;

        let config = NotionConfig::new(token, database_id);
        self.store.set_configuration(&config).await?;
        info!("[Client] 配置已更新，数据库ID: {:?}", config.database_id);
        Ok(config)
    }

    /// 读取当前配置
    pub async fn configuration(&self) -> NotesResult<NotionConfig> {
        Ok(self.store.get_configuration().await?)
    }

    /// 检查数据库连通性
    pub async fn test_connection(&self) -> NotesResult<DatabaseInfo> {
        let config = self.configuration().await?;
        self.remote.test_connection(&config).await
    }

    /// 保存一条记录
    pub async fn save_note(&self, record: &SaveRecord) -> NotesResult<SaveOutcome> {
        let config = self.configuration().await?;
        Ok(self.saver.save(&config, record).await?)
    }

    /// 校验表单后保存
    pub async fn submit(&self, form: NoteForm, page: &PageContext) -> NotesResult<SaveOutcome> {
        let record = form.into_record(page, self.config.prefill_title)?;
        self.save_note(&record).await
    }

    /// 列出本地备份（最新在前）
    pub async fn list_backups(&self) -> NotesResult<Vec<BackupRow>> {
        let mut rows = self.store.list_backups().await?;
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    /// 导出本地备份到目录
    pub async fn export_backups(&self, dir: &Path) -> NotesResult<PathBuf> {
        Ok(export::export_backups(self.store.as_ref(), dir, Utc::now().date_naive()).await?)
    }

    /// 从导出文件导入备份
    pub async fn import_backups(&self, path: &Path) -> NotesResult<usize> {
        Ok(export::import_backups(self.store.as_ref(), path).await?)
    }

    /// 清空本地备份（不影响配置）
    pub async fn clear_backups(&self) -> NotesResult<()> {
        Ok(self.store.clear_all().await?)
    }

    /// 数据库中最近的页面
    pub async fn recent_pages(&self, limit: u32) -> NotesResult<Vec<PageSummary>> {
        let creds = self.configuration().await?.credentials()?;
        Ok(self.remote.query_pages(&creds, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::error::{NotesError, RemoteError, ValidationError};
    use crate::notes::models::NotionCredentials;
    use crate::notes::types::RemoteDocument;
    use async_trait::async_trait;

    /// 固定返回 401 的远端
    struct RejectingRemote;

    #[async_trait]
    impl RemoteClient for RejectingRemote {
        async fn create_page(
            &self,
            _creds: &NotionCredentials,
            _doc: &RemoteDocument,
        ) -> Result<String, RemoteError> {
            Err(RemoteError::http(401, "API token is invalid."))
        }

        async fn test_connection(
            &self,
            config: &NotionConfig,
        ) -> Result<DatabaseInfo, NotesError> {
            config.credentials()?;
            Err(RemoteError::http(401, "API token is invalid.").into())
        }

        async fn query_pages(
            &self,
            _creds: &NotionCredentials,
            _page_size: u32,
        ) -> Result<Vec<PageSummary>, RemoteError> {
            Err(RemoteError::http(401, "API token is invalid."))
        }
    }

    async fn client(prefill_title: bool) -> LeetNoteClient {
        let mut config = ClientConfig::new("sqlite::memory:");
        config.prefill_title = prefill_title;
        let pool = create_sqlite_pool_with_migration(&config.db_url)
            .await
            .unwrap();
        LeetNoteClient::with_parts(
            config,
            Arc::new(RejectingRemote),
            Arc::new(NoteDao::new(pool)),
        )
    }

    #[tokio::test]
    async fn configure_normalizes_sharing_link() {
        let client = client(true).await;
        let cfg = client
            .configure(
                " secret_token ",
                "https://www.notion.so/a1b2c3d4e5f67890a1b2c3d4e5f67890?v=1&source=copy_link",
            )
            .await
            .unwrap();
        assert_eq!(
            cfg.database_id.as_deref(),
            Some("a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890")
        );
        assert_eq!(client.configuration().await.unwrap(), cfg);
    }

    #[tokio::test]
    async fn configure_rejects_unrecognized_link() {
        let client = client(true).await;
        let err = client
            .configure("secret_token", "https://www.notion.so/my-page")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotesError::Config(ConfigError::InvalidDatabaseLink(_))
        ));
        assert_eq!(client.configuration().await.unwrap(), NotionConfig::default());
    }

    #[tokio::test]
    async fn unconfigured_save_is_config_error() {
        let client = client(true).await;
        let record = SaveRecord::new("Two Sum", "", "", "https://x/two-sum");
        let err = client.save_note(&record).await.unwrap_err();
        assert!(matches!(err, NotesError::Config(ConfigError::MissingToken)));
        assert!(client.list_backups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_save_falls_back_to_local() {
        let client = client(true).await;
        client
            .configure("secret_token", "a1b2c3d4e5f67890a1b2c3d4e5f67890")
            .await
            .unwrap();

        let page = PageContext::from_url("https://leetcode.com/problems/two-sum/");
        let outcome = client.submit(NoteForm::default(), &page).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::PartialFailure { .. }));
        assert!(outcome.message().contains("API token is invalid."));

        let rows = client.list_backups().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry.record.question_name, "Two Sum");
        assert!(!rows[0].entry.synced);

        client.clear_backups().await.unwrap();
        assert!(client.list_backups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_without_prefill_requires_title() {
        let client = client(false).await;
        let page = PageContext::from_url("https://leetcode.com/problems/two-sum/");
        let err = client.submit(NoteForm::default(), &page).await.unwrap_err();
        assert!(matches!(
            err,
            NotesError::Validation(ValidationError::MissingQuestionName)
        ));
    }

    #[tokio::test]
    async fn recent_pages_needs_configuration() {
        let client = client(true).await;
        let err = client.recent_pages(10).await.unwrap_err();
        assert!(matches!(err, NotesError::Config(ConfigError::MissingToken)));
    }
}
