use chrono::{DateTime, Utc};
use serde::Deserialize;

// GitHub API response structures

/// Element of `GET /user/starred` when requested with the `star+json` media type.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubStarredRepo {
    pub starred_at: DateTime<Utc>,
    pub repo: GitHubRepo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}
