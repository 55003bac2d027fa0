//! Notion HTTP API 客户端
//!
//! 负责页面创建、数据库连通性检查和数据库查询。所有请求只发起一次，不重试，
//! 超时使用传输层默认值。

use crate::notes::error::{ConfigError, NotesError, RemoteError};
use crate::notes::models::{mask_secret, NotionConfig, NotionCredentials};
use crate::notes::types::{
    CreatePageResp, DatabaseInfo, NotionErrorBody, PageSummary, QueryDatabaseReq,
    QueryDatabaseResp, RemoteDocument, NOTION_API_BASE_URL, NOTION_VERSION,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

/// 远端客户端接口，保存流水线只依赖此接口，测试中可以注入假实现
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// 创建页面，返回远端页面 ID
    async fn create_page(
        &self,
        creds: &NotionCredentials,
        doc: &RemoteDocument,
    ) -> Result<String, RemoteError>;

    /// 只读查询配置的数据库；token 或 ID 缺失时直接返回配置错误，不发起网络请求
    async fn test_connection(&self, config: &NotionConfig) -> Result<DatabaseInfo, NotesError>;

    /// 查询数据库中最近的页面
    async fn query_pages(
        &self,
        creds: &NotionCredentials,
        page_size: u32,
    ) -> Result<Vec<PageSummary>, RemoteError>;
}

/// 基于 reqwest 的 Notion API 客户端
pub struct NotionApi {
    client: reqwest::Client,
    api_base_url: String,
    notion_version: String,
}

impl NotionApi {
    /// 创建新的 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String, notion_version: String) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            notion_version,
        }
    }

    /// 使用官方地址和固定版本
    pub fn with_defaults() -> Self {
        Self::new(
            reqwest::Client::new(),
            NOTION_API_BASE_URL.to_string(),
            NOTION_VERSION.to_string(),
        )
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.api_base_url, path);
        debug!("[NotionAPI]   {} {}", method, url);
        debug!("[NotionAPI]   token: {}", mask_secret(token));
        self.client
            .request(method, url)
            .bearer_auth(token)
            .header("Notion-Version", &self.notion_version)
    }

    /// 读取响应：非 2xx 时转换为远端错误，成功时返回 body 字节
    async fn read_response(
        response: reqwest::Response,
        operation_name: &str,
    ) -> Result<Vec<u8>, RemoteError> {
        let status = response.status();
        // 读取 body bytes（只能读取一次）
        let body_bytes = response.bytes().await.map_err(RemoteError::from)?;
        let body_str = String::from_utf8_lossy(&body_bytes);
        debug!("[NotionAPI] {}响应 Body: {}", operation_name, body_str);

        if !status.is_success() {
            error!(
                "[NotionAPI] {}请求失败，HTTP状态: {}, 响应: {}",
                operation_name, status, body_str
            );
            return Err(remote_error_from(status, &body_bytes));
        }
        Ok(body_bytes.to_vec())
    }
}

/// 将失败响应转换为远端错误：优先使用 body 中的 message，否则使用状态文本
pub fn remote_error_from(status: StatusCode, body: &[u8]) -> RemoteError {
    let parsed = serde_json::from_slice::<NotionErrorBody>(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code.clone());
    let message = parsed
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string())
        });
    let err = RemoteError::http(status.as_u16(), message);
    match code {
        Some(code) => err.with_code(code),
        None => err,
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(
    body: &[u8],
    operation_name: &str,
) -> Result<T, RemoteError> {
    serde_json::from_slice(body).map_err(|e| {
        error!("[NotionAPI] {}反序列化失败: {:?}", operation_name, e);
        RemoteError::transport(format!("Invalid response body: {}", e))
    })
}

#[async_trait]
impl RemoteClient for NotionApi {
    async fn create_page(
        &self,
        creds: &NotionCredentials,
        doc: &RemoteDocument,
    ) -> Result<String, RemoteError> {
        info!("[NotionAPI] 📡 创建页面，数据库ID: {}", creds.database_id);

        let response = self
            .request(reqwest::Method::POST, "/pages", &creds.token)
            .json(doc)
            .send()
            .await
            .map_err(|e| {
                error!("[NotionAPI] 创建页面请求发送失败: {}", e);
                RemoteError::from(e)
            })?;

        let body = Self::read_response(response, "创建页面").await?;
        let created: CreatePageResp = parse_json(&body, "创建页面")?;

        info!(
            "[NotionAPI] ✅ 页面创建成功，页面ID: {}, URL: {}",
            created.id,
            created.url.as_deref().unwrap_or("-")
        );
        Ok(created.id)
    }

    async fn test_connection(&self, config: &NotionConfig) -> Result<DatabaseInfo, NotesError> {
        let creds = config.credentials().map_err(|e: ConfigError| {
            error!("[NotionAPI] 连通性检查缺少配置: {}", e);
            e
        })?;
        info!("[NotionAPI] 📡 检查数据库连通性: {}", creds.database_id);

        let path = format!("/databases/{}", creds.database_id);
        let response = self
            .request(reqwest::Method::GET, &path, &creds.token)
            .send()
            .await
            .map_err(RemoteError::from)?;

        let body = Self::read_response(response, "连通性检查").await?;
        // 成功与否只看状态码；body 无法解析时返回只带 ID 的空结构
        let info = match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(value) => DatabaseInfo::from_json(&value),
            Err(e) => {
                warn!("[NotionAPI] 连通性检查响应不是 JSON，忽略属性结构: {}", e);
                DatabaseInfo {
                    id: creds.database_id.clone(),
                    ..Default::default()
                }
            }
        };

        info!(
            "[NotionAPI] ✅ 数据库可访问: {}，属性数: {}",
            info.title,
            info.properties.len()
        );
        Ok(info)
    }

    async fn query_pages(
        &self,
        creds: &NotionCredentials,
        page_size: u32,
    ) -> Result<Vec<PageSummary>, RemoteError> {
        info!("[NotionAPI] 📡 查询数据库页面，page_size: {}", page_size);

        let path = format!("/databases/{}/query", creds.database_id);
        let response = self
            .request(reqwest::Method::POST, &path, &creds.token)
            .json(&QueryDatabaseReq { page_size })
            .send()
            .await
            .map_err(RemoteError::from)?;

        let body = Self::read_response(response, "查询数据库").await?;
        let resp: QueryDatabaseResp = parse_json(&body, "查询数据库")?;
        let pages: Vec<PageSummary> = resp.results.iter().map(PageSummary::from_page).collect();

        info!("[NotionAPI] ✅ 查询到 {} 个页面", pages.len());
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::models::SaveRecord;
    use crate::notes::types::build_document;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    /// 单次请求的本地 HTTP 桩：记录收到的原始请求并返回固定响应
    async fn serve_once(status_line: &str, body: &str) -> (String, Arc<Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = Arc::new(Mutex::new(String::new()));
        let captured_clone = captured.clone();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if request_complete(&buf) {
                    break;
                }
            }
            *captured_clone.lock().await = String::from_utf8_lossy(&buf).to_string();
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        });

        (format!("http://{}/v1", addr), captured)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        buf.len() >= header_end + 4 + content_length
    }

    fn api(base_url: String) -> NotionApi {
        NotionApi::new(reqwest::Client::new(), base_url, NOTION_VERSION.to_string())
    }

    fn creds() -> NotionCredentials {
        NotionConfig::new("secret_token", "a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890")
            .credentials()
            .unwrap()
    }

    fn doc() -> RemoteDocument {
        let record = SaveRecord::new("Two Sum", "Array", "", "https://x/two-sum");
        build_document(
            "a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890",
            &record,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        )
    }

    #[test]
    fn error_message_prefers_body_message() {
        let e = remote_error_from(
            StatusCode::UNAUTHORIZED,
            br#"{"object":"error","status":401,"code":"unauthorized","message":"API token is invalid."}"#,
        );
        assert_eq!(
            e,
            RemoteError::http(401, "API token is invalid.").with_code("unauthorized")
        );
        assert!(e.is_unauthorized());
        assert_eq!(e.to_string(), "Notion API error: API token is invalid.");
    }

    #[test]
    fn error_message_falls_back_to_status_text() {
        let e = remote_error_from(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert_eq!(e, RemoteError::http(502, "Bad Gateway"));
    }

    #[tokio::test]
    async fn create_page_sends_headers_and_document() {
        let (base, captured) = serve_once(
            "200 OK",
            r#"{"object":"page","id":"page-123","url":"https://www.notion.so/page-123"}"#,
        )
        .await;

        let page_id = api(base).create_page(&creds(), &doc()).await.unwrap();
        assert_eq!(page_id, "page-123");

        let raw = captured.lock().await.clone();
        let lower = raw.to_lowercase();
        assert!(raw.starts_with("POST /v1/pages "));
        assert!(lower.contains("authorization: bearer secret_token"));
        assert!(lower.contains("notion-version: 2022-06-28"));
        assert!(lower.contains("content-type: application/json"));
        assert!(raw.contains(r#""Question Name""#));
        assert!(raw.contains("No notes provided."));
    }

    #[tokio::test]
    async fn create_page_maps_unauthorized() {
        let (base, _) = serve_once(
            "401 Unauthorized",
            r#"{"object":"error","status":401,"code":"unauthorized","message":"API token is invalid."}"#,
        )
        .await;

        let err = api(base).create_page(&creds(), &doc()).await.unwrap_err();
        assert_eq!(err.status, Some(401));
        assert_eq!(err.message, "API token is invalid.");
    }

    #[tokio::test]
    async fn transport_failure_has_no_status() {
        // 先占用端口再释放，保证连接被拒绝
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = api(format!("http://{}", addr))
            .create_page(&creds(), &doc())
            .await
            .unwrap_err();
        assert_eq!(err.status, None);
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn test_connection_without_config_skips_network() {
        // 指向不可达地址：若发起请求会得到远端错误而不是配置错误
        let client = api("http://127.0.0.1:9".to_string());
        let err = client
            .test_connection(&NotionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NotesError::Config(ConfigError::MissingToken)));
    }

    #[tokio::test]
    async fn test_connection_reads_database_schema() {
        let (base, captured) = serve_once(
            "200 OK",
            r#"{"object":"database","id":"a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890",
                "title":[{"plain_text":"LeetCode"}],
                "properties":{"Question Name":{"type":"title"},"Topics":{"type":"rich_text"},
                              "URL":{"type":"url"},"Date Added":{"type":"date"}}}"#,
        )
        .await;

        let cfg = NotionConfig::new("secret_token", "a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890");
        let info = api(base).test_connection(&cfg).await.unwrap();
        assert_eq!(info.title, "LeetCode");
        assert!(info.schema_issues().is_empty());

        let raw = captured.lock().await.clone();
        assert!(raw.starts_with("GET /v1/databases/a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890 "));
    }

    #[tokio::test]
    async fn test_connection_succeeds_on_status_alone() {
        let (base, _) = serve_once("200 OK", "ok").await;

        let cfg = NotionConfig::new("secret_token", "a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890");
        let info = api(base).test_connection(&cfg).await.unwrap();
        assert_eq!(info.id, "a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890");
        assert!(info.properties.is_empty());
        assert_eq!(info.schema_issues().len(), 4);
    }

    #[tokio::test]
    async fn test_connection_maps_not_found() {
        let (base, _) = serve_once(
            "404 Not Found",
            r#"{"object":"error","status":404,"code":"object_not_found","message":"Could not find database."}"#,
        )
        .await;

        let cfg = NotionConfig::new("secret_token", "a1b2c3d4-e5f6-7890-a1b2-c3d4e5f67890");
        let err = api(base).test_connection(&cfg).await.unwrap_err();
        let NotesError::Remote(remote) = err else {
            panic!("expected remote error, got {:?}", err);
        };
        assert_eq!(remote.status, Some(404));
        assert_eq!(remote.code.as_deref(), Some("object_not_found"));
    }

    #[tokio::test]
    async fn query_pages_returns_summaries() {
        let (base, captured) = serve_once(
            "200 OK",
            r#"{"object":"list","results":[{"id":"p1","properties":{
                "Question Name":{"title":[{"text":{"content":"Two Sum"}}]},
                "Topics":{"rich_text":[{"text":{"content":"Array"}}]},
                "URL":{"url":"https://x/two-sum"}}}]}"#,
        )
        .await;

        let pages = api(base).query_pages(&creds(), 10).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Two Sum");
        assert_eq!(pages[0].topics, "Array");

        let raw = captured.lock().await.clone();
        assert!(raw.contains(r#"{"page_size":10}"#));
    }
}
