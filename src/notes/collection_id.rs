//! Notion 数据库 ID 规范化
//!
//! 接受 32 位十六进制原始 ID 或完整的分享链接，统一为 8-4-4-4-12 的 UUID 形式。

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static ORIGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^/]+/").expect("origin pattern"));

static RAW_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[a-f0-9]{32}").expect("raw id pattern"));

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}")
        .expect("uuid pattern")
});

/// 提取并规范化数据库 ID，无法识别时返回 None
///
/// 先去掉协议和域名，取路径中第一段连续的 32 位十六进制字符并按 8-4-4-4-12 分组；
/// 若输入本身已是带横线的 UUID，则原样返回。大小写保持不变。
pub fn normalize_collection_id(input: &str) -> Option<String> {
    let input = input.trim();
    let path = ORIGIN_RE.replace(input, "");

    if let Some(m) = RAW_ID_RE.find(&path) {
        let raw = m.as_str();
        let formatted = format!(
            "{}-{}-{}-{}-{}",
            &raw[0..8],
            &raw[8..12],
            &raw[12..16],
            &raw[16..20],
            &raw[20..32]
        );
        debug!("[CollectionId] 从输入中提取数据库ID: {}", formatted);
        return Some(formatted);
    }

    if let Some(m) = UUID_RE.find(input) {
        return Some(m.as_str().to_string());
    }

    debug!("[CollectionId] 无法从输入中提取数据库ID: {}", input);
    None
}
