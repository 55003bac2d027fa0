//! LeetCode 题解笔记保存
//!
//! - `api`：Notion HTTP 客户端
//! - `dao` / `db`：SQLite 本地存储（配置 + 备份）
//! - `service`：保存流水线，远端失败时回退到本地备份
//! - `client`：组装以上模块的门面

pub mod api;
pub mod client;
pub mod collection_id;
pub mod dao;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod page;
pub mod service;
pub mod types;

pub use client::{ClientConfig, LeetNoteClient};
pub use collection_id::normalize_collection_id;
pub use error::{ConfigError, NotesError, NotesResult, RemoteError, StorageError, ValidationError};
pub use models::{BackupRow, LocalBackupEntry, NotionConfig, SaveRecord};
pub use page::{NoteForm, PageContext};
pub use service::{NoteSaver, SaveOutcome};
