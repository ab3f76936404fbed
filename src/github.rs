use crate::error::{Result, SyncError};
use crate::types::GitHubStarredRepo;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::{Duration, SystemTime};
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

pub const API_BASE_URL: &str = "https://api.github.com";
const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";
const MAX_RETRIES: u32 = 3;

/// One page of the authenticated user's starred repositories.
#[derive(Debug, Clone, Default)]
pub struct StarredPage {
    pub repos: Vec<GitHubStarredRepo>,
    /// Page number announced by the `Link` header, `None` on the last page.
    pub next_page: Option<u32>,
}

/// Read access to the code-hosting platform.
#[async_trait]
pub trait StarsSource: Send + Sync {
    async fn starred_page(&self, page: u32, per_page: u32) -> Result<StarredPage>;
}

pub struct GitHubClient {
    client: Client,
    token: String,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(token, API_BASE_URL)
    }

    pub fn with_base_url(token: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("github-stars-notion-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(GitHubClient {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn make_request(&self, url: &str) -> Result<Response> {
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(url)
                .header("Accept", STAR_MEDIA_TYPE)
                .header("Authorization", format!("token {}", self.token))
                .send()
                .await?;

            let rate_limit_remaining = header_value::<u32>(&response, "X-RateLimit-Remaining");
            let rate_limit_reset = header_value::<u64>(&response, "X-RateLimit-Reset").unwrap_or(0);

            match response.status() {
                StatusCode::OK => {
                    if matches!(rate_limit_remaining, Some(remaining) if remaining < 10) {
                        warn!(
                            remaining = ?rate_limit_remaining,
                            "GitHub rate limit low, adding delay"
                        );
                        sleep(Duration::from_secs(1)).await;
                    }
                    return Ok(response);
                }
                StatusCode::UNAUTHORIZED => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(SyncError::AuthError(format!(
                        "GitHub rejected the token: {}",
                        error_text
                    )));
                }
                StatusCode::NOT_FOUND => {
                    return Err(SyncError::NotFound(format!("Resource not found: {}", url)));
                }
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                    if rate_limit_remaining == Some(0) =>
                {
                    let reset_time = SystemTime::UNIX_EPOCH + Duration::from_secs(rate_limit_reset);
                    let wait_time = reset_time
                        .duration_since(SystemTime::now())
                        .unwrap_or(Duration::from_secs(0));

                    if wait_time > Duration::from_secs(60) || retries >= MAX_RETRIES {
                        return Err(SyncError::RateLimitExceeded(format!(
                            "API rate limit exceeded. Reset at: {:?}",
                            reset_time
                        )));
                    }

                    warn!("GitHub rate limit reached. Waiting {} seconds", wait_time.as_secs() + 1);
                    sleep(wait_time + Duration::from_secs(1)).await;
                    retries += 1;
                }
                status if status.is_server_error() && retries < MAX_RETRIES => {
                    warn!("GitHub server error ({}). Retrying in 2 seconds", status);
                    sleep(Duration::from_secs(2)).await;
                    retries += 1;
                }
                status => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(SyncError::ApiError(format!(
                        "API request failed with status {}: {}",
                        status, error_text
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl StarsSource for GitHubClient {
    async fn starred_page(&self, page: u32, per_page: u32) -> Result<StarredPage> {
        let url = format!(
            "{}/user/starred?per_page={}&page={}",
            self.base_url, per_page, page
        );

        let response = self.make_request(&url).await?;
        let next_page = response
            .headers()
            .get("Link")
            .and_then(|h| h.to_str().ok())
            .and_then(next_page_from_link);

        let repos: Vec<GitHubStarredRepo> = response.json().await?;
        debug!(page, count = repos.len(), ?next_page, "Fetched starred repos page");

        Ok(StarredPage { repos, next_page })
    }
}

fn header_value<T: std::str::FromStr>(response: &Response, name: &str) -> Option<T> {
    response
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<T>().ok())
}

/// Extracts the `page` query parameter of the `rel="next"` entry of a `Link` header.
pub fn next_page_from_link(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let mut segments = entry.split(';');
        let target = segments
            .next()?
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');

        if !segments.any(|s| s.trim() == r#"rel="next""#) {
            return None;
        }

        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}
