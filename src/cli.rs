use clap::{Args, Parser, Subcommand};
use std::fmt;

use crate::error::{Result, SyncError};
use crate::syncer::{MalformedRecordPolicy, SyncOptions};
use crate::{github, notion};

#[derive(Parser, Debug)]
#[command(name = "stars-sync")]
#[command(about = "Sync your GitHub stars with a Notion database")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync your github stars with a notion database
    Sync(SyncArgs),
    /// Print the application version
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// A github token to authenticate with the github api
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// A notion token to authenticate with the notion api
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    pub notion_token: Option<String>,

    /// The id of the notion database to sync with
    #[arg(long, env = "NOTION_DATABASE_ID")]
    pub notion_database_id: Option<String>,

    /// Number of create/archive calls sent at once
    #[arg(long, env = "SYNC_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Skip database pages with malformed properties instead of failing
    #[arg(long, env = "SYNC_SKIP_MALFORMED")]
    pub skip_malformed: bool,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = github::API_BASE_URL)]
    pub github_api_url: String,

    /// Notion API base URL
    #[arg(long, env = "NOTION_API_URL", default_value = notion::API_BASE_URL)]
    pub notion_api_url: String,
}

/// Validated settings for one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub github_token: String,
    pub notion_token: String,
    pub database_id: String,
    pub github_api_url: String,
    pub notion_api_url: String,
    pub options: SyncOptions,
}

impl SyncArgs {
    pub fn into_config(self) -> Result<SyncConfig> {
        let github_token = required(self.github_token, "github-token")?;
        let notion_token = required(self.notion_token, "notion-token")?;
        let database_id = required(self.notion_database_id, "notion-database-id")?;

        if self.concurrency == 0 {
            return Err(SyncError::ConfigError(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let malformed_records = if self.skip_malformed {
            MalformedRecordPolicy::Skip
        } else {
            MalformedRecordPolicy::Abort
        };

        Ok(SyncConfig {
            github_token,
            notion_token,
            database_id,
            github_api_url: self.github_api_url,
            notion_api_url: self.notion_api_url,
            options: SyncOptions {
                concurrency: self.concurrency,
                malformed_records,
            },
        })
    }
}

fn required(value: Option<String>, flag: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SyncError::ConfigError(format!("{} is required", flag))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub git_commit: String,
    pub build_date: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_commit: option_env!("GIT_COMMIT").unwrap_or("none").to_string(),
            build_date: option_env!("BUILD_DATE").unwrap_or("unknown").to_string(),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Git commit: {}", self.git_commit)?;
        writeln!(f, "Build date: {}", self.build_date)
    }
}
