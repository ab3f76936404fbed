#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use github_stars_notion_sync::error::{Result, SyncError};
use github_stars_notion_sync::github::{StarredPage, StarsSource};
use github_stars_notion_sync::models::{PROPERTY_REPO_ID, PROPERTY_TITLE};
use github_stars_notion_sync::notion::{
    CreatePageRequest, Database, DocumentStore, PageObject, PropertyValue, QueryResponse,
};
use github_stars_notion_sync::types::{GitHubRepo, GitHubStarredRepo};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub const DATABASE_ID: &str = "705baa92-0ea9-4a4f-bb97-4916d1cb45bc";

pub fn starred(id: i64, name: &str) -> GitHubStarredRepo {
    GitHubStarredRepo {
        starred_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
        repo: GitHubRepo {
            id,
            name: name.to_string(),
            description: Some(format!("{} description", name)),
            html_url: format!("https://github.com/octo/{}", name),
            topics: vec!["rust".to_string()],
            language: Some("Rust".to_string()),
        },
    }
}

pub fn complete_schema() -> Value {
    json!({
        "Name": { "id": "title", "type": "title", "title": {} },
        "Created time": { "id": "a", "type": "created_time", "created_time": {} },
        "Description": { "id": "b", "type": "rich_text", "rich_text": {} },
        "Language": { "id": "c", "type": "select", "select": { "options": [] } },
        "Topics": { "id": "d", "type": "multi_select", "multi_select": { "options": [] } },
        "Repository ID": { "id": "e", "type": "number", "number": { "format": "number" } },
        "Repository URL": { "id": "f", "type": "url", "url": {} }
    })
}

pub fn database_json(properties: Value) -> Value {
    json!({ "object": "database", "id": DATABASE_ID, "properties": properties })
}

pub fn page_json(page_id: &str, title: &str, repo_id: i64) -> Value {
    json!({
        "object": "page",
        "id": page_id,
        "archived": false,
        "properties": {
            "Name": { "id": "title", "type": "title", "title": [
                { "type": "text", "text": { "content": title }, "plain_text": title }
            ]},
            "Repository ID": { "id": "e", "type": "number", "number": repo_id }
        }
    })
}

/// Source that serves canned pages and can fail on a given page number.
pub struct FakeStars {
    pages: Vec<Vec<GitHubStarredRepo>>,
    fail_on_page: Option<u32>,
    pub calls: AtomicUsize,
}

impl FakeStars {
    pub fn new(pages: Vec<Vec<GitHubStarredRepo>>) -> Self {
        Self {
            pages,
            fail_on_page: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_ids(ids: &[i64]) -> Self {
        Self::new(vec![ids.iter().map(|id| starred(*id, &format!("repo-{}", id))).collect()])
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StarsSource for FakeStars {
    async fn starred_page(&self, page: u32, _per_page: u32) -> Result<StarredPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_on_page == Some(page) {
            return Err(SyncError::ApiError("API request failed with status 502".to_string()));
        }

        let index = page as usize - 1;
        let repos = self.pages.get(index).cloned().unwrap_or_default();
        let next_page = if index + 1 < self.pages.len() {
            Some(page + 1)
        } else {
            None
        };

        Ok(StarredPage { repos, next_page })
    }
}

#[derive(Debug, Clone)]
pub struct StoredPage {
    pub id: String,
    pub title: String,
    pub repo_id: i64,
    pub archived: bool,
    pub raw: Option<Value>,
}

/// In-memory database that records every call made against it.
pub struct FakeStore {
    schema: Value,
    pages: Mutex<Vec<StoredPage>>,
    failing_creates: HashSet<String>,
    failing_archives: HashSet<String>,
    failing_query: Option<String>,
    cancel_on_create: Mutex<Option<CancellationToken>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            pages: Mutex::new(Vec::new()),
            failing_creates: HashSet::new(),
            failing_archives: HashSet::new(),
            failing_query: None,
            cancel_on_create: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_repo_ids(ids: &[i64]) -> Self {
        let store = Self::new(complete_schema());
        for id in ids {
            store.insert(&format!("page-{}", id), &format!("repo-{}", id), *id);
        }
        store
    }

    pub fn insert(&self, page_id: &str, title: &str, repo_id: i64) {
        self.pages.lock().unwrap().push(StoredPage {
            id: page_id.to_string(),
            title: title.to_string(),
            repo_id,
            archived: false,
            raw: None,
        });
    }

    pub fn insert_raw(&self, page: Value) {
        self.pages.lock().unwrap().push(StoredPage {
            id: page["id"].as_str().unwrap_or_default().to_string(),
            title: String::new(),
            repo_id: 0,
            archived: false,
            raw: Some(page),
        });
    }

    pub fn failing_create(mut self, name: &str) -> Self {
        self.failing_creates.insert(name.to_string());
        self
    }

    pub fn failing_archive(mut self, page_id: &str) -> Self {
        self.failing_archives.insert(page_id.to_string());
        self
    }

    /// Fails the query that starts at `cursor` ("" is the first page).
    pub fn failing_query(mut self, cursor: &str) -> Self {
        self.failing_query = Some(cursor.to_string());
        self
    }

    pub fn cancel_on_first_create(&self, token: CancellationToken) {
        *self.cancel_on_create.lock().unwrap() = Some(token);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    pub fn live_repo_ids(&self) -> Vec<i64> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .filter(|page| !page.archived)
            .map(|page| page.repo_id)
            .collect()
    }

    pub fn archived_ids(&self) -> Vec<String> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .filter(|page| page.archived)
            .map(|page| page.id.clone())
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn created_title(request: &CreatePageRequest) -> String {
    match request.properties.get(PROPERTY_TITLE) {
        Some(PropertyValue::Title(runs)) => runs
            .first()
            .map(|run| run.text.content.clone())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn created_repo_id(request: &CreatePageRequest) -> i64 {
    match request.properties.get(PROPERTY_REPO_ID) {
        Some(PropertyValue::Number(id)) => *id,
        _ => 0,
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn get_database(&self, database_id: &str) -> Result<Database> {
        self.record("get_database".to_string());
        Ok(serde_json::from_value(json!({
            "id": database_id,
            "properties": self.schema.clone()
        }))?)
    }

    async fn query_database(
        &self,
        _database_id: &str,
        start_cursor: Option<&str>,
        page_size: u32,
    ) -> Result<QueryResponse> {
        self.record(format!("query:{}", start_cursor.unwrap_or("")));

        if self.failing_query.as_deref() == Some(start_cursor.unwrap_or("")) {
            return Err(SyncError::ApiError(
                "Notion request failed with status 502 Bad Gateway (): upstream error".to_string(),
            ));
        }

        let live: Vec<Value> = self
            .pages
            .lock()
            .unwrap()
            .iter()
            .filter(|page| !page.archived)
            .map(|page| match &page.raw {
                Some(raw) => raw.clone(),
                None => page_json(&page.id, &page.title, page.repo_id),
            })
            .collect();

        let start: usize = start_cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + page_size as usize).min(live.len());
        let results: Vec<PageObject> = live[start..end]
            .iter()
            .map(|page| serde_json::from_value(page.clone()))
            .collect::<std::result::Result<_, _>>()?;
        let has_more = end < live.len();

        Ok(QueryResponse {
            results,
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    async fn create_page(&self, request: &CreatePageRequest) -> Result<()> {
        let title = created_title(request);
        self.record(format!("create:{}", title));

        if let Some(token) = self.cancel_on_create.lock().unwrap().take() {
            token.cancel();
        }

        if self.failing_creates.contains(&title) {
            return Err(SyncError::ApiError(
                "Notion request failed with status 409 Conflict (conflict_error): Conflict occurred while saving".to_string(),
            ));
        }

        let mut pages = self.pages.lock().unwrap();
        let id = format!("created-{}", pages.len());
        pages.push(StoredPage {
            id,
            title,
            repo_id: created_repo_id(request),
            archived: false,
            raw: None,
        });
        Ok(())
    }

    async fn archive_page(&self, page_id: &str) -> Result<()> {
        self.record(format!("archive:{}", page_id));

        if self.failing_archives.contains(page_id) {
            return Err(SyncError::RateLimitExceeded("Rate limited".to_string()));
        }

        let mut pages = self.pages.lock().unwrap();
        match pages.iter_mut().find(|page| page.id == page_id) {
            Some(page) => {
                page.archived = true;
                Ok(())
            }
            None => Err(SyncError::NotFound(format!("Could not find page with ID: {}", page_id))),
        }
    }
}
