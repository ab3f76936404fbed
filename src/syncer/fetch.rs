use std::future::Future;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::collection::{SourceCollection, TargetCollection};
use crate::error::{Result, SyncError};
use crate::github::StarsSource;
use crate::logger::SyncLogger;
use crate::models::{SourceItem, TargetRecord, PROPERTY_REPO_ID, PROPERTY_TITLE};
use crate::notion::{DocumentStore, PageObject, PagePropertyValue};

pub const GITHUB_REPOS_PER_PAGE: u32 = 100;
pub const NOTION_PAGES_PER_PAGE: u32 = 50;

/// What to do with a database page whose properties do not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedRecordPolicy {
    /// Fail the whole fetch.
    #[default]
    Abort,
    /// Log the page and leave it out of the collection.
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct FetchedPages {
    pub pages: TargetCollection,
    pub skipped: usize,
}

/// Races `future` against the token.
pub async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = future => result,
    }
}

/// Collects every repository starred by the authenticated user.
pub async fn fetch_starred_repos(
    source: &dyn StarsSource,
    cancel: &CancellationToken,
) -> Result<SourceCollection> {
    let mut repos = SourceCollection::new();
    let mut page = 1;

    loop {
        let response =
            cancellable(cancel, source.starred_page(page, GITHUB_REPOS_PER_PAGE)).await?;
        repos.extend(response.repos.into_iter().map(SourceItem::from));

        match response.next_page {
            Some(next) if next > page => page = next,
            _ => break,
        }
    }

    Ok(repos)
}

/// Collects every page of the database, following the store's cursor.
pub async fn fetch_database_pages(
    store: &dyn DocumentStore,
    database_id: &str,
    policy: MalformedRecordPolicy,
    logger: &dyn SyncLogger,
    cancel: &CancellationToken,
) -> Result<FetchedPages> {
    let mut fetched = FetchedPages::default();
    let mut cursor: Option<String> = None;

    loop {
        let response = cancellable(
            cancel,
            store.query_database(database_id, cursor.as_deref(), NOTION_PAGES_PER_PAGE),
        )
        .await?;

        for page in &response.results {
            match decode_page(page) {
                Ok(record) => fetched.pages.push(record),
                Err(e) if policy == MalformedRecordPolicy::Skip => {
                    let error = e.to_string();
                    logger.error(
                        "skipping malformed notion page",
                        &[("page", page.id.as_str()), ("error", error.as_str())],
                    );
                    fetched.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        match response.next_cursor {
            Some(next) if response.has_more => cursor = Some(next),
            _ => break,
        }
    }

    Ok(fetched)
}

/// Reads the title and mirrored repository id from a database page.
pub fn decode_page(page: &PageObject) -> Result<TargetRecord> {
    let title = match property(page, PROPERTY_TITLE)? {
        PagePropertyValue::Title { title } => title
            .into_iter()
            .next()
            .map(|run| run.plain_text)
            .unwrap_or_default(),
        other => return Err(mismatched(page, PROPERTY_TITLE, "title", &other)),
    };

    let repo_id = match property(page, PROPERTY_REPO_ID)? {
        PagePropertyValue::Number { number: Some(number) } => number as i64,
        PagePropertyValue::Number { number: None } => {
            return Err(malformed(page, PROPERTY_REPO_ID, "number is empty"));
        }
        other => return Err(mismatched(page, PROPERTY_REPO_ID, "number", &other)),
    };

    Ok(TargetRecord {
        id: page.id.clone(),
        title,
        repo_id,
    })
}

fn property(page: &PageObject, name: &str) -> Result<PagePropertyValue> {
    let value = page
        .properties
        .get(name)
        .ok_or_else(|| malformed(page, name, "property is missing"))?;

    PagePropertyValue::deserialize(value).map_err(|e| malformed(page, name, &e.to_string()))
}

fn mismatched(
    page: &PageObject,
    name: &str,
    expected: &str,
    found: &PagePropertyValue,
) -> SyncError {
    malformed(page, name, &format!("expected {} but found {}", expected, found.kind()))
}

fn malformed(page: &PageObject, property: &str, detail: &str) -> SyncError {
    SyncError::SchemaViolation(format!(
        "notion page {} has malformed property {}: {}",
        page.id, property, detail
    ))
}
