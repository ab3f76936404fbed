use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const API_BASE_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";
const MAX_RETRIES: u32 = 3;
const MAX_RETRY_AFTER_SECS: u64 = 60;

// Notion API structures

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertySchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: PropertyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Status,
    Date,
    People,
    Files,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    Formula,
    Relation,
    Rollup,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
    UniqueId,
    #[serde(other)]
    Unsupported,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Title => "title",
            PropertyType::RichText => "rich_text",
            PropertyType::Number => "number",
            PropertyType::Select => "select",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Status => "status",
            PropertyType::Date => "date",
            PropertyType::People => "people",
            PropertyType::Files => "files",
            PropertyType::Checkbox => "checkbox",
            PropertyType::Url => "url",
            PropertyType::Email => "email",
            PropertyType::PhoneNumber => "phone_number",
            PropertyType::Formula => "formula",
            PropertyType::Relation => "relation",
            PropertyType::Rollup => "rollup",
            PropertyType::CreatedTime => "created_time",
            PropertyType::CreatedBy => "created_by",
            PropertyType::LastEditedTime => "last_edited_time",
            PropertyType::LastEditedBy => "last_edited_by",
            PropertyType::UniqueId => "unique_id",
            PropertyType::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<PageObject>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A database row. Properties stay raw here and are decoded per page into
/// [`PagePropertyValue`] by the fetcher.
#[derive(Debug, Clone, Deserialize)]
pub struct PageObject {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

/// Property value of a page, tagged by its `type` field. Only the types the
/// sync reads back are modelled; anything else fails to decode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PagePropertyValue {
    Title { title: Vec<PlainText> },
    Number { number: Option<f64> },
}

impl PagePropertyValue {
    pub fn kind(&self) -> PropertyType {
        match self {
            PagePropertyValue::Title { .. } => PropertyType::Title,
            PagePropertyValue::Number { .. } => PropertyType::Number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlainText {
    pub plain_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePageRequest {
    pub parent: Parent,
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parent {
    #[serde(rename = "type")]
    pub kind: String,
    pub database_id: String,
}

impl Parent {
    pub fn database(database_id: &str) -> Self {
        Parent {
            kind: "database_id".to_string(),
            database_id: database_id.to_string(),
        }
    }
}

/// Value written to a page property. Serializes as `{"<type>": <value>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Title(Vec<RichText>),
    RichText(Vec<RichText>),
    Number(i64),
    Url(String),
    Select(SelectOption),
    MultiSelect(Vec<SelectOption>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichText {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: TextContent,
}

impl RichText {
    pub fn text(content: impl Into<String>) -> Self {
        RichText {
            kind: "text".to_string(),
            text: TextContent {
                content: content.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub name: String,
}

impl SelectOption {
    pub fn named(name: impl Into<String>) -> Self {
        SelectOption { name: name.into() }
    }
}

#[derive(Debug, Deserialize)]
struct NotionErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Read/write access to the structured document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_database(&self, database_id: &str) -> Result<Database>;

    async fn query_database(
        &self,
        database_id: &str,
        start_cursor: Option<&str>,
        page_size: u32,
    ) -> Result<QueryResponse>;

    async fn create_page(&self, request: &CreatePageRequest) -> Result<()>;

    /// Flags the page as archived. Pages are never hard-deleted.
    async fn archive_page(&self, page_id: &str) -> Result<()>;
}

pub struct NotionClient {
    client: Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(token, API_BASE_URL)
    }

    pub fn with_base_url(token: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("github-stars-notion-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(NotionClient {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends a request, waiting out 429s. Server errors are only retried when
    /// `idempotent` is set.
    async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        idempotent: bool,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.token)
                .header("Notion-Version", NOTION_VERSION);

            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;

            match response.status() {
                status if status.is_success() => return Ok(response),
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(1);

                    if retries >= MAX_RETRIES || retry_after > MAX_RETRY_AFTER_SECS {
                        let body = error_body(response).await;
                        return Err(SyncError::RateLimitExceeded(body.message));
                    }

                    warn!("Notion rate limit reached. Waiting {} seconds", retry_after);
                    sleep(Duration::from_secs(retry_after)).await;
                    retries += 1;
                }
                status if status.is_server_error() && idempotent && retries < MAX_RETRIES => {
                    warn!("Notion server error ({}). Retrying in 2 seconds", status);
                    sleep(Duration::from_secs(2)).await;
                    retries += 1;
                }
                StatusCode::UNAUTHORIZED => {
                    let body = error_body(response).await;
                    return Err(SyncError::AuthError(body.message));
                }
                StatusCode::NOT_FOUND => {
                    let body = error_body(response).await;
                    return Err(SyncError::NotFound(body.message));
                }
                status => {
                    let body = error_body(response).await;
                    return Err(SyncError::ApiError(format!(
                        "Notion request failed with status {} ({}): {}",
                        status, body.code, body.message
                    )));
                }
            }
        }
    }
}

async fn error_body(response: Response) -> NotionErrorBody {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(NotionErrorBody {
        code: String::new(),
        message: text,
    })
}

#[async_trait]
impl DocumentStore for NotionClient {
    async fn get_database(&self, database_id: &str) -> Result<Database> {
        let response = self
            .make_request(Method::GET, &format!("/v1/databases/{}", database_id), None, true)
            .await?;
        Ok(response.json().await?)
    }

    async fn query_database(
        &self,
        database_id: &str,
        start_cursor: Option<&str>,
        page_size: u32,
    ) -> Result<QueryResponse> {
        let body = serde_json::to_value(QueryRequest {
            page_size,
            start_cursor,
        })?;
        let response = self
            .make_request(
                Method::POST,
                &format!("/v1/databases/{}/query", database_id),
                Some(&body),
                true,
            )
            .await?;

        let page: QueryResponse = response.json().await?;
        debug!(
            count = page.results.len(),
            has_more = page.has_more,
            "Queried Notion database page"
        );
        Ok(page)
    }

    async fn create_page(&self, request: &CreatePageRequest) -> Result<()> {
        let body = serde_json::to_value(request)?;
        self.make_request(Method::POST, "/v1/pages", Some(&body), false).await?;
        Ok(())
    }

    async fn archive_page(&self, page_id: &str) -> Result<()> {
        let body = serde_json::json!({ "archived": true });
        let path = format!("/v1/pages/{}", page_id);
        self.make_request(Method::PATCH, &path, Some(&body), true).await?;
        Ok(())
    }
}
