use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SyncError};
use crate::logger::SyncLogger;
use crate::models::{
    SourceItem, TargetRecord, PROPERTY_DESCRIPTION, PROPERTY_LANGUAGE, PROPERTY_REPO_ID,
    PROPERTY_REPO_URL, PROPERTY_TITLE, PROPERTY_TOPICS,
};
use crate::notion::{
    CreatePageRequest, DocumentStore, Parent, PropertyValue, RichText, SelectOption,
};

use super::diff::SyncPlan;
use super::fetch::cancellable;

/// Notion rejects rich text runs longer than this.
pub const MAX_RICH_TEXT_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationFailure {
    /// Repository name for creates, page title for archives.
    pub target: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: usize,
    pub archived: usize,
    pub failures: Vec<MutationFailure>,
}

/// Maps a starred repository onto the database columns.
pub fn build_create_page_request(database_id: &str, repo: &SourceItem) -> CreatePageRequest {
    let mut properties = BTreeMap::new();

    properties.insert(
        PROPERTY_TITLE.to_string(),
        PropertyValue::Title(vec![RichText::text(repo.name.as_str())]),
    );

    let description = match repo.description.as_deref() {
        Some(text) if !text.is_empty() => {
            vec![RichText::text(text.chars().take(MAX_RICH_TEXT_CHARS).collect::<String>())]
        }
        _ => Vec::new(),
    };
    properties.insert(PROPERTY_DESCRIPTION.to_string(), PropertyValue::RichText(description));

    properties.insert(PROPERTY_REPO_URL.to_string(), PropertyValue::Url(repo.url.clone()));
    properties.insert(PROPERTY_REPO_ID.to_string(), PropertyValue::Number(repo.id));
    properties.insert(
        PROPERTY_TOPICS.to_string(),
        PropertyValue::MultiSelect(repo.topics.iter().map(SelectOption::named).collect()),
    );

    // an empty select is rejected by the API, so the column is left unset
    if let Some(language) = repo.language.as_deref().filter(|l| !l.is_empty()) {
        properties.insert(
            PROPERTY_LANGUAGE.to_string(),
            PropertyValue::Select(SelectOption::named(language)),
        );
    }

    CreatePageRequest {
        parent: Parent::database(database_id),
        properties,
    }
}

/// Issues create and archive calls. A failed call is logged and recorded,
/// and never stops the remaining calls.
pub struct MutationApplier<'a> {
    store: &'a dyn DocumentStore,
    logger: &'a dyn SyncLogger,
    cancel: &'a CancellationToken,
    concurrency: usize,
}

impl<'a> MutationApplier<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        logger: &'a dyn SyncLogger,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            store,
            logger,
            cancel,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Only returns an error when the run is cancelled.
    pub async fn apply(&self, database_id: &str, plan: &SyncPlan) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        self.logger
            .info(&format!("found {} pages to create", plan.to_create.len()), &[]);
        self.create_pages(database_id, &plan.to_create, &mut report).await?;

        self.logger
            .info(&format!("found {} pages to archive", plan.to_archive.len()), &[]);
        self.archive_pages(&plan.to_archive, &mut report).await?;

        Ok(report)
    }

    async fn create_pages(
        &self,
        database_id: &str,
        repos: &[SourceItem],
        report: &mut ApplyReport,
    ) -> Result<()> {
        let mut results = stream::iter(repos)
            .map(|repo| async move {
                let request = build_create_page_request(database_id, repo);
                let result = cancellable(self.cancel, self.store.create_page(&request)).await;
                (repo, result)
            })
            .buffered(self.concurrency);

        while let Some((repo, result)) = results.next().await {
            match result {
                Ok(()) => {
                    report.created += 1;
                    self.logger.info("notion page created", &[("repo", repo.name.as_str())]);
                }
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    let error = e.to_string();
                    self.logger.error(
                        "error creating notion page",
                        &[("repo", repo.name.as_str()), ("error", error.as_str())],
                    );
                    report.failures.push(MutationFailure {
                        target: repo.name.clone(),
                        error,
                    });
                }
            }
        }

        Ok(())
    }

    async fn archive_pages(&self, pages: &[TargetRecord], report: &mut ApplyReport) -> Result<()> {
        let mut results = stream::iter(pages)
            .map(|page| async move {
                let result = cancellable(self.cancel, self.store.archive_page(&page.id)).await;
                (page, result)
            })
            .buffered(self.concurrency);

        while let Some((page, result)) = results.next().await {
            match result {
                Ok(()) => {
                    report.archived += 1;
                    self.logger.info("notion page archived", &[("page", page.title.as_str())]);
                }
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    let error = e.to_string();
                    self.logger.error(
                        "error archiving notion page",
                        &[("page", page.title.as_str()), ("error", error.as_str())],
                    );
                    report.failures.push(MutationFailure {
                        target: page.title.clone(),
                        error,
                    });
                }
            }
        }

        Ok(())
    }
}
