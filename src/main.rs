use anyhow::Context;
use clap::Parser;
use colored::*;
use github_stars_notion_sync::cli::{Cli, Command, SyncArgs, VersionInfo};
use github_stars_notion_sync::github::GitHubClient;
use github_stars_notion_sync::notion::NotionClient;
use github_stars_notion_sync::{SyncReport, Syncer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Sync(args) => run_sync(args).await,
        Command::Version => {
            print!("{}", VersionInfo::current());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_sync(args: SyncArgs) -> anyhow::Result<()> {
    let config = args.into_config()?;

    let github = GitHubClient::with_base_url(config.github_token, &config.github_api_url)
        .context("Failed to create GitHub client")?;
    let notion = NotionClient::with_base_url(config.notion_token, &config.notion_api_url)
        .context("Failed to create Notion client")?;

    let syncer = Syncer::new(Arc::new(github), Arc::new(notion)).with_options(config.options);

    println!("{}", "GitHub Stars -> Notion Sync".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "Interrupted, stopping sync...".yellow());
            on_interrupt.cancel();
        }
    });

    let report = syncer.sync(&cancel, &config.database_id).await?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("\n📊 Sync summary:");
    println!("Starred repos: {}", report.starred_repos);
    println!("Notion pages: {}", report.database_pages);
    if report.skipped_pages > 0 {
        println!("Skipped malformed pages: {}", report.skipped_pages.to_string().yellow());
    }
    println!("Created: {} / {}", report.created.to_string().green(), report.planned_creates);
    println!("Archived: {} / {}", report.archived.to_string().green(), report.planned_archives);

    if !report.failures.is_empty() {
        println!("{}", format!("{} operations failed:", report.failures.len()).red());
        for failure in &report.failures {
            println!("  {} {}", failure.target.bold(), failure.error.dimmed());
        }
    }
}
