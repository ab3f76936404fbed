pub mod apply;
pub mod diff;
pub mod fetch;
pub mod schema;

pub use apply::{build_create_page_request, ApplyReport, MutationApplier, MutationFailure};
pub use diff::{diff, SyncPlan};
pub use fetch::{
    fetch_database_pages, fetch_starred_repos, FetchedPages, MalformedRecordPolicy,
    GITHUB_REPOS_PER_PAGE, NOTION_PAGES_PER_PAGE,
};
pub use schema::validate_database;

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::github::StarsSource;
use crate::logger::{SyncLogger, TracingLogger};
use crate::notion::DocumentStore;
use fetch::cancellable;

/// Steps of a sync run, in order. `Failed` can follow any step before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    ValidatingSchema,
    FetchingTarget,
    FetchingSource,
    Diffing,
    Applying,
    Done,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::ValidatingSchema => "validating_schema",
            SyncPhase::FetchingTarget => "fetching_target",
            SyncPhase::FetchingSource => "fetching_source",
            SyncPhase::Diffing => "diffing",
            SyncPhase::Applying => "applying",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Mutation calls in flight at once. 1 keeps them sequential.
    pub concurrency: usize,
    pub malformed_records: MalformedRecordPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            malformed_records: MalformedRecordPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub starred_repos: usize,
    pub database_pages: usize,
    pub skipped_pages: usize,
    pub planned_creates: usize,
    pub planned_archives: usize,
    pub created: usize,
    pub archived: usize,
    pub failures: Vec<MutationFailure>,
}

/// Mirrors the authenticated user's starred repositories into a Notion database.
///
/// Each run re-fetches both sides, creates a page for every newly starred
/// repository and archives pages of repositories that are no longer starred.
/// Existing pages are never updated.
pub struct Syncer {
    source: Arc<dyn StarsSource>,
    store: Arc<dyn DocumentStore>,
    logger: Arc<dyn SyncLogger>,
    options: SyncOptions,
}

impl Syncer {
    pub fn new(source: Arc<dyn StarsSource>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            source,
            store,
            logger: Arc::new(TracingLogger),
            options: SyncOptions::default(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn SyncLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Runs one reconciliation against `database_id`.
    ///
    /// Fetch and validation failures abort the run and come back wrapped with
    /// the phase they happened in. Failed creates or archives are only logged
    /// and listed in the report. Cancelling the token stops the run without
    /// undoing mutations already made.
    pub async fn sync(&self, cancel: &CancellationToken, database_id: &str) -> Result<SyncReport> {
        self.logger.info("starting syncer", &[("database_id", database_id)]);

        let result = self.run(cancel, database_id).await;

        match &result {
            Ok(report) => {
                self.enter(SyncPhase::Done);
                self.logger.info(
                    "sync finished",
                    &[
                        ("created", report.created.to_string().as_str()),
                        ("archived", report.archived.to_string().as_str()),
                        ("failed", report.failures.len().to_string().as_str()),
                    ],
                );
            }
            Err(e) => {
                self.enter(SyncPhase::Failed);
                self.logger.error("sync failed", &[("error", e.to_string().as_str())]);
            }
        }

        result
    }

    async fn run(&self, cancel: &CancellationToken, database_id: &str) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        self.enter(SyncPhase::ValidatingSchema);
        let database = cancellable(cancel, self.store.get_database(database_id))
            .await
            .map_err(|e| e.during(SyncPhase::ValidatingSchema, "error getting notion database"))?;

        validate_database(&database).map_err(|e| {
            e.during(SyncPhase::ValidatingSchema, "error validating notion database")
        })?;
        let properties = database.properties.len().to_string();
        self.logger.debug(
            "notion database schema is valid",
            &[("database_id", database.id.as_str()), ("properties", properties.as_str())],
        );

        self.enter(SyncPhase::FetchingTarget);
        self.logger.info(
            "fetching pages from notion database. Depending on the size of the database, this might take a while.",
            &[],
        );
        let fetched = fetch_database_pages(
            self.store.as_ref(),
            database_id,
            self.options.malformed_records,
            self.logger.as_ref(),
            cancel,
        )
        .await
        .map_err(|e| e.during(SyncPhase::FetchingTarget, "error getting notion pages"))?;

        report.database_pages = fetched.pages.len();
        report.skipped_pages = fetched.skipped;
        self.logger
            .info(&format!("found {} pages in notion", fetched.pages.len()), &[]);

        self.enter(SyncPhase::FetchingSource);
        self.logger.info(
            "fetching starred repos from github. Depending on the number of starred repos, this might take a while.",
            &[],
        );
        let starred = fetch_starred_repos(self.source.as_ref(), cancel)
            .await
            .map_err(|e| e.during(SyncPhase::FetchingSource, "error getting starred repos"))?;

        report.starred_repos = starred.len();
        self.logger
            .info(&format!("found {} starred repos in github", starred.len()), &[]);

        self.enter(SyncPhase::Diffing);
        let plan = diff(&starred, &fetched.pages);
        report.planned_creates = plan.to_create.len();
        report.planned_archives = plan.to_archive.len();

        self.enter(SyncPhase::Applying);
        let applied = MutationApplier::new(self.store.as_ref(), self.logger.as_ref(), cancel)
            .with_concurrency(self.options.concurrency)
            .apply(database_id, &plan)
            .await
            .map_err(|e| e.during(SyncPhase::Applying, "error syncing notion database"))?;

        report.created = applied.created;
        report.archived = applied.archived;
        report.failures = applied.failures;

        Ok(report)
    }

    fn enter(&self, phase: SyncPhase) {
        self.logger.debug("sync phase", &[("phase", phase.as_str())]);
    }
}
