use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::Keyed;
use crate::notion::PropertyType;
use crate::types::GitHubStarredRepo;

pub const PROPERTY_TITLE: &str = "Name";
pub const PROPERTY_CREATED_TIME: &str = "Created time";
pub const PROPERTY_DESCRIPTION: &str = "Description";
pub const PROPERTY_LANGUAGE: &str = "Language";
pub const PROPERTY_TOPICS: &str = "Topics";
pub const PROPERTY_REPO_URL: &str = "Repository URL";
pub const PROPERTY_REPO_ID: &str = "Repository ID";

/// A column the target database must expose, with its expected type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredProperty {
    pub name: &'static str,
    pub kind: PropertyType,
}

pub const REQUIRED_PROPERTIES: [RequiredProperty; 7] = [
    RequiredProperty {
        name: PROPERTY_CREATED_TIME,
        kind: PropertyType::CreatedTime,
    },
    RequiredProperty {
        name: PROPERTY_DESCRIPTION,
        kind: PropertyType::RichText,
    },
    RequiredProperty {
        name: PROPERTY_LANGUAGE,
        kind: PropertyType::Select,
    },
    RequiredProperty {
        name: PROPERTY_TOPICS,
        kind: PropertyType::MultiSelect,
    },
    RequiredProperty {
        name: PROPERTY_TITLE,
        kind: PropertyType::Title,
    },
    RequiredProperty {
        name: PROPERTY_REPO_ID,
        kind: PropertyType::Number,
    },
    RequiredProperty {
        name: PROPERTY_REPO_URL,
        kind: PropertyType::Url,
    },
];

/// A starred repository, trimmed to what gets mirrored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub url: String,
    pub starred_at: DateTime<Utc>,
}

impl From<GitHubStarredRepo> for SourceItem {
    fn from(starred: GitHubStarredRepo) -> Self {
        let repo = starred.repo;
        SourceItem {
            id: repo.id,
            name: repo.name,
            description: repo.description,
            language: repo.language,
            topics: repo.topics,
            url: repo.html_url,
            starred_at: starred.starred_at,
        }
    }
}

impl Keyed for SourceItem {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

/// A database page mirroring one starred repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Store-assigned page id.
    pub id: String,
    pub title: String,
    /// Id of the repository this page mirrors.
    pub repo_id: i64,
}

impl Keyed for TargetRecord {
    type Key = i64;

    fn key(&self) -> i64 {
        self.repo_id
    }
}
