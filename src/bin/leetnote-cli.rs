//! LeetNote CLI 客户端
//!
//! 非交互式 CLI：配置 Notion 集成、保存题解笔记、管理本地备份。
//! 日志输出到 stderr（可选追加到文件），结果输出到 stdout。

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use leetnote_sdk_rust::notes::client::{ClientConfig, LeetNoteClient};
use leetnote_sdk_rust::notes::models::mask_secret;
use leetnote_sdk_rust::notes::page::{NoteForm, PageContext};
use leetnote_sdk_rust::notes::service::SaveOutcome;
use leetnote_sdk_rust::notes::types::{NOTION_API_BASE_URL, NOTION_VERSION};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// LeetNote CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "leetnote-cli")]
#[command(about = "LeetNote CLI - 保存 LeetCode 题解笔记到 Notion", long_about = None)]
struct Args {
    /// 本地 SQLite 数据库 URL
    #[arg(
        long,
        global = true,
        env = "LEETNOTE_DB_URL",
        default_value = "sqlite://leetnote.db?mode=rwc"
    )]
    db_url: String,

    /// Notion API 基础地址
    #[arg(long, global = true, env = "LEETNOTE_API_BASE_URL", default_value = NOTION_API_BASE_URL)]
    api_base_url: String,

    /// 日志级别（默认: info,leetnote_sdk_rust=debug）
    #[arg(long, global = true, default_value = "info,leetnote_sdk_rust=debug")]
    log_level: String,

    /// 额外把日志追加到该文件
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 管理 Notion 配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// 检查数据库连通性和属性结构
    Test,
    /// 保存一条笔记
    Save(SaveArgs),
    /// 管理本地备份
    Backups {
        #[command(subcommand)]
        action: BackupAction,
    },
    /// 列出数据库中最近的页面
    Recent {
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// 设置 token 和数据库（分享链接或 ID）
    Set {
        #[arg(long, env = "NOTION_TOKEN")]
        token: String,
        #[arg(long)]
        database: String,
    },
    /// 显示当前配置（token 脱敏）
    Show,
}

#[derive(clap::Args, Debug)]
struct SaveArgs {
    /// 题目页面 URL
    #[arg(long)]
    url: String,
    /// 题目名称（为空时按 --prefill-title 处理）
    #[arg(long)]
    name: Option<String>,
    /// 题目标签，逗号分隔
    #[arg(long)]
    topics: Option<String>,
    /// 解题思路
    #[arg(long, default_value = "")]
    intuition: String,
    /// 页面抓取到的标题
    #[arg(long)]
    title: Option<String>,
    /// 页面抓取到的标签（可重复）
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// 名称为空时用页面标题或 URL 预填
    #[arg(long)]
    prefill_title: bool,
}

#[derive(Subcommand, Debug)]
enum BackupAction {
    /// 列出本地备份（最新在前）
    List,
    /// 导出为 leetcode-notes-YYYY-MM-DD.json
    Export {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// 从导出文件导入
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// 清空本地备份（不可恢复）
    Clear {
        /// 确认清空
        #[arg(long)]
        yes: bool,
    },
}

/// 初始化日志（输出到 stderr，可选追加到文件）
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法创建日志文件 {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        info!("[CLI] 📝 日志已同时输出到控制台和文件: {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level, args.log_file.as_ref())?;

    let mut config = ClientConfig::new(args.db_url.clone());
    config.api_base_url = args.api_base_url.clone();
    config.notion_version = NOTION_VERSION.to_string();
    if let Command::Save(save) = &args.command {
        config.prefill_title = save.prefill_title;
    }

    let client = LeetNoteClient::connect(config)
        .await
        .context("初始化客户端失败")?;
    info!(
        "[CLI] 🚀 LeetNote CLI，数据库: {}，预填标题: {}",
        client.config().db_url,
        client.config().prefill_title
    );

    match args.command {
        Command::Config { action } => run_config(&client, action).await,
        Command::Test => run_test(&client).await,
        Command::Save(save) => run_save(&client, save).await,
        Command::Backups { action } => run_backups(&client, action).await,
        Command::Recent { limit } => {
            let pages = client.recent_pages(limit).await?;
            info!("[CLI] 📋 最近页面（共 {} 个）", pages.len());
            for page in pages {
                println!(
                    "{} | {} | {}",
                    page.title,
                    page.topics,
                    page.url.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
    }
}

async fn run_config(client: &LeetNoteClient, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { token, database } => {
            let config = client.configure(&token, &database).await?;
            println!(
                "Settings saved. Database ID: {}",
                config.database_id.as_deref().unwrap_or_default()
            );
        }
        ConfigAction::Show => {
            let config = client.configuration().await?;
            println!(
                "notionToken: {}",
                config
                    .token
                    .as_deref()
                    .map(mask_secret)
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!(
                "notionDatabaseId: {}",
                config.database_id.as_deref().unwrap_or("(not set)")
            );
        }
    }
    Ok(())
}

async fn run_test(client: &LeetNoteClient) -> Result<()> {
    let info = client.test_connection().await?;
    println!("Connected to database \"{}\" ({})", info.title, info.id);

    let issues = info.schema_issues();
    if issues.is_empty() {
        println!("Database properties look good.");
    } else {
        for issue in &issues {
            warn!("[CLI] ⚠️ 数据库属性问题: {}", issue);
            println!("warning: {}", issue);
        }
    }
    Ok(())
}

async fn run_save(client: &LeetNoteClient, save: SaveArgs) -> Result<()> {
    let page = PageContext {
        title: save.title,
        tags: save.tags,
        url: save.url,
    };
    let form = NoteForm {
        question_name: save.name,
        topics: save.topics,
        intuition: save.intuition,
    };

    let outcome = client.submit(form, &page).await?;
    println!("{}", outcome.message());
    match outcome {
        SaveOutcome::Success {
            remote_page_id,
            backup_error,
            ..
        } => {
            info!("[CLI] ✅ 已保存到 Notion，页面ID: {}", remote_page_id);
            if let Some(storage) = backup_error {
                warn!("[CLI] ⚠️ 本地备份写入失败: {}", storage);
            }
            Ok(())
        }
        SaveOutcome::PartialFailure {
            backup_key, remote, ..
        } => {
            warn!("[CLI] ⚠️ 已保存到本地备份: {}", backup_key);
            if remote.is_unauthorized() {
                eprintln!("hint: the integration token was rejected, run `leetnote-cli config set`");
            }
            bail!("saved locally only ({})", backup_key)
        }
        SaveOutcome::TotalFailure { .. } => {
            error!("[CLI] ❌ 远端和本地均保存失败");
            bail!("save failed")
        }
    }
}

async fn run_backups(client: &LeetNoteClient, action: BackupAction) -> Result<()> {
    match action {
        BackupAction::List => {
            let rows = client.list_backups().await?;
            info!("[CLI] 📋 本地备份（共 {} 条）", rows.len());
            for row in rows {
                println!(
                    "{} | {} | {} | synced: {}",
                    row.key, row.entry.saved_at, row.entry.record.question_name, row.entry.synced
                );
            }
        }
        BackupAction::Export { dir } => {
            let path = client.export_backups(&dir).await?;
            println!("Exported to {}", path.display());
        }
        BackupAction::Import { file } => {
            let count = client.import_backups(&file).await?;
            println!("Imported {} entries", count);
        }
        BackupAction::Clear { yes } => {
            if !yes {
                bail!("refusing to clear local backups without --yes");
            }
            client.clear_backups().await?;
            println!("Local backups cleared.");
        }
    }
    Ok(())
}
