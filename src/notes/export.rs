//! 本地备份导出 / 导入
//!
//! 导出文件名为 `leetcode-notes-<YYYY-MM-DD>.json`，内容是 `{key, ...entry}` 的 JSON 数组。

use crate::notes::dao::LocalStore;
use crate::notes::error::StorageError;
use crate::notes::models::{is_backup_key, sort_newest_first, BackupRow};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// 导出文件名
pub fn export_file_name(day: NaiveDate) -> String {
    format!("leetcode-notes-{}.json", day.format("%Y-%m-%d"))
}

/// 把全部备份（最新在前）写入 `dir` 下的导出文件，返回文件路径
pub async fn export_backups(
    store: &dyn LocalStore,
    dir: &Path,
    day: NaiveDate,
) -> Result<PathBuf, StorageError> {
    let mut rows = store.list_backups().await?;
    sort_newest_first(&mut rows);

    let content = serde_json::to_string_pretty(&rows)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_file_name(day));
    tokio::fs::write(&path, content).await?;

    info!("[Export] 已导出 {} 条备份到 {}", rows.len(), path.display());
    Ok(path)
}

/// 读取导出文件
pub async fn read_export(path: &Path) -> Result<Vec<BackupRow>, StorageError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// 导入导出文件，每条备份按原 key 写回，返回导入条数
///
/// 先校验全部 key，再整体写入；任一条失败时不写入任何条目。
pub async fn import_backups(store: &dyn LocalStore, path: &Path) -> Result<usize, StorageError> {
    let rows = read_export(path).await?;
    if let Some(bad) = rows.iter().find(|r| !is_backup_key(&r.key)) {
        return Err(StorageError::Rejected(format!(
            "Invalid backup key in {}: {}",
            path.display(),
            bad.key
        )));
    }
    store.put_backups(&rows).await?;
    info!("[Export] 已从 {} 导入 {} 条备份", path.display(), rows.len());
    Ok(rows.len())
}
