//! 题目页面上下文与提交表单
//!
//! 页面抓取（DOM 选择器）不在本 crate 内；这里只接收抓取结果，
//! 并提供按 URL slug 推断标题的兜底逻辑以及表单到保存记录的转换。

use crate::notes::error::ValidationError;
use crate::notes::models::SaveRecord;
use serde::{Deserialize, Serialize};

/// 标签最大长度（超过视为抓取噪音）
const MAX_TAG_LEN: usize = 50;

/// 页面抓取器的原始输出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub url: String,
}

impl PageContext {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// 页面标题，缺失时按 URL slug 推断
    pub fn question_name(&self) -> Option<String> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| title_from_url(&self.url))
    }

    pub fn topics(&self) -> String {
        topics_from_tags(&self.tags)
    }
}

/// 由题目 URL 推断标题：`/problems/two-sum/description/` -> `Two Sum`
pub fn title_from_url(url: &str) -> Option<String> {
    let path = url
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
        .unwrap_or(url);
    let path = path.split(['?', '#']).next().unwrap_or("");
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let slug = segments
        .iter()
        .position(|s| *s == "problems")
        .and_then(|i| segments.get(i + 1))
        .or_else(|| segments.last())?;

    let title = slug
        .split('-')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 标签去重后以 `, ` 拼接，过滤空白和过长的标签
pub fn topics_from_tags(tags: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || tag.chars().count() >= MAX_TAG_LEN || seen.contains(&tag) {
            continue;
        }
        seen.push(tag);
    }
    seen.join(", ")
}

/// 用户在表单中填写的内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteForm {
    pub question_name: Option<String>,
    pub topics: Option<String>,
    pub intuition: String,
}

impl NoteForm {
    /// 转换为保存记录
    ///
    /// `prefill_title` 为 true 时，空标题回退为页面标题（再回退为 URL slug）；
    /// 为 false 时标题必须由用户填写。
    pub fn into_record(
        self,
        page: &PageContext,
        prefill_title: bool,
    ) -> Result<SaveRecord, ValidationError> {
        if page.url.trim().is_empty() {
            return Err(ValidationError::MissingUrl);
        }

        let typed = self
            .question_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let question_name = match typed {
            Some(name) => name,
            None if prefill_title => page
                .question_name()
                .ok_or(ValidationError::MissingQuestionName)?,
            None => return Err(ValidationError::MissingQuestionName),
        };

        let topics = self
            .topics
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| page.topics());

        Ok(SaveRecord::new(
            question_name,
            topics,
            self.intuition,
            page.url.clone(),
        ))
    }
}
