//! Notion API DTO（请求和响应结构体）
//!
//! 页面文档的结构是固定的外部契约，字段名必须与已有数据库完全一致。

use crate::notes::models::SaveRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 固定的 API 版本
pub const NOTION_VERSION: &str = "2022-06-28";

/// 默认 API 基础地址
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

/// 思路为空时写入段落的占位文字
pub const EMPTY_INTUITION_TEXT: &str = "No notes provided.";

/// 思路小节标题
pub const INTUITION_HEADING: &str = "Intuition/Trick";

/// 目标数据库必须预先存在的属性（名称, 类型）
pub const REQUIRED_PROPERTIES: [(&str, &str); 4] = [
    ("Question Name", "title"),
    ("Topics", "rich_text"),
    ("URL", "url"),
    ("Date Added", "date"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

/// 属性中的文本片段 `{ text: { content } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyText {
    pub text: TextContent,
}

impl PropertyText {
    fn new(content: impl Into<String>) -> Self {
        Self {
            text: TextContent {
                content: content.into(),
            },
        }
    }
}

/// 块中的文本片段 `{ type: "text", text: { content } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockText {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: TextContent,
}

impl BlockText {
    fn new(content: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: TextContent {
                content: content.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    pub database_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleProperty {
    pub title: Vec<PropertyText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextProperty {
    pub rich_text: Vec<PropertyText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlProperty {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    pub start: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateProperty {
    pub date: DateValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProperties {
    #[serde(rename = "Question Name")]
    pub question_name: TitleProperty,
    #[serde(rename = "Topics")]
    pub topics: RichTextProperty,
    #[serde(rename = "URL")]
    pub url: UrlProperty,
    #[serde(rename = "Date Added")]
    pub date_added: DateProperty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextBody {
    pub rich_text: Vec<BlockText>,
}

/// 块内容，`type` 字段与同名内容字段并列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlockKind {
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: RichTextBody },
    #[serde(rename = "paragraph")]
    Paragraph { paragraph: RichTextBody },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub object: String,
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl Block {
    fn heading_2(content: impl Into<String>) -> Self {
        Self {
            object: "block".to_string(),
            kind: BlockKind::Heading2 {
                heading_2: RichTextBody {
                    rich_text: vec![BlockText::new(content)],
                },
            },
        }
    }

    fn paragraph(content: impl Into<String>) -> Self {
        Self {
            object: "block".to_string(),
            kind: BlockKind::Paragraph {
                paragraph: RichTextBody {
                    rich_text: vec![BlockText::new(content)],
                },
            },
        }
    }

    /// 块中第一个文本片段的内容
    pub fn plain_text(&self) -> Option<&str> {
        let body = match &self.kind {
            BlockKind::Heading2 { heading_2 } => heading_2,
            BlockKind::Paragraph { paragraph } => paragraph,
        };
        body.rich_text.first().map(|t| t.text.content.as_str())
    }
}

/// 页面创建请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub parent: Parent,
    pub properties: PageProperties,
    pub children: Vec<Block>,
}

impl RemoteDocument {
    /// 思路段落的文本
    pub fn intuition_text(&self) -> Option<&str> {
        self.children
            .iter()
            .find(|b| matches!(b.kind, BlockKind::Paragraph { .. }))
            .and_then(Block::plain_text)
    }
}

/// 将保存记录映射为固定结构的页面文档（纯函数）
///
/// 只有空思路会被替换为占位文字，其余字段原样写入。
pub fn build_document(database_id: &str, record: &SaveRecord, today: NaiveDate) -> RemoteDocument {
    let intuition = if record.intuition.is_empty() {
        EMPTY_INTUITION_TEXT
    } else {
        record.intuition.as_str()
    };

    RemoteDocument {
        parent: Parent {
            database_id: database_id.to_string(),
        },
        properties: PageProperties {
            question_name: TitleProperty {
                title: vec![PropertyText::new(record.question_name.clone())],
            },
            topics: RichTextProperty {
                rich_text: vec![PropertyText::new(record.topics.clone())],
            },
            url: UrlProperty {
                url: record.url.clone(),
            },
            date_added: DateProperty {
                date: DateValue {
                    start: today.format("%Y-%m-%d").to_string(),
                },
            },
        },
        children: vec![Block::heading_2(INTUITION_HEADING), Block::paragraph(intuition)],
    }
}

/// 页面创建响应（只关心 id 和 url）
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePageResp {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// 错误响应体 `{ object: "error", status, code, message }`
#[derive(Debug, Clone, Deserialize)]
pub struct NotionErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// 数据库查询请求
#[derive(Debug, Clone, Serialize)]
pub struct QueryDatabaseReq {
    pub page_size: u32,
}

/// 数据库查询响应（页面属性保持为原始 JSON）
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDatabaseResp {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

/// 数据库元信息（连通性检查的结果）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub id: String,
    pub title: String,
    /// 属性名 -> 属性类型
    pub properties: BTreeMap<String, String>,
}

impl DatabaseInfo {
    /// 从 `GET /databases/{id}` 的响应解析
    pub fn from_json(value: &serde_json::Value) -> Self {
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let title = value
            .get("title")
            .and_then(|v| v.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("plain_text").and_then(|t| t.as_str()))
                    .collect::<String>()
            })
            .unwrap_or_default();
        let properties = value
            .get("properties")
            .and_then(|v| v.as_object())
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| {
                        let kind = prop
                            .get("type")
                            .and_then(|t| t.as_str())
                            .unwrap_or("unknown");
                        (name.clone(), kind.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            id,
            title,
            properties,
        }
    }

    /// 检查必需属性，返回缺失或类型不符的描述
    pub fn schema_issues(&self) -> Vec<String> {
        REQUIRED_PROPERTIES
            .iter()
            .filter_map(|(name, kind)| match self.properties.get(*name) {
                None => Some(format!("missing property \"{}\" ({})", name, kind)),
                Some(actual) if actual != kind => Some(format!(
                    "property \"{}\" should be {} but is {}",
                    name, kind, actual
                )),
                Some(_) => None,
            })
            .collect()
    }
}

/// 数据库中已保存页面的摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub topics: String,
    pub url: Option<String>,
}

impl PageSummary {
    /// 从查询结果中的单个页面解析
    pub fn from_page(page: &serde_json::Value) -> Self {
        let props = &page["properties"];
        let title = props["Question Name"]["title"][0]["text"]["content"]
            .as_str()
            .unwrap_or("No title")
            .to_string();
        let topics = props["Topics"]["rich_text"][0]["text"]["content"]
            .as_str()
            .unwrap_or("No topics")
            .to_string();
        Self {
            id: page["id"].as_str().unwrap_or_default().to_string(),
            title,
            topics,
            url: props["URL"]["url"].as_str().map(str::to_string),
        }
    }
}
