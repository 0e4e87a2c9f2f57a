use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::IgnoredAny};

/// Repository as returned by the REST `users/{user}/repos` listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GithubRepo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub languages_url: String,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub fork: bool,
}

impl GithubRepo {
    pub fn is_public(&self) -> bool {
        self.visibility.as_deref() == Some("public")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    #[serde(default)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub commits: Option<Vec<IgnoredAny>>,
}

impl GithubEvent {
    pub fn commit_count(&self) -> u32 {
        self.payload
            .commits
            .as_ref()
            .map(|commits| commits.len() as u32)
            .unwrap_or(0)
    }
}

/// One week of the heatmap; `week` is the bucket start in epoch milliseconds
/// and `days` runs Sunday through Saturday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitActivityWeek {
    pub total: u32,
    pub week: i64,
    pub days: [u32; 7],
}

pub type LanguageStats = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GithubStats {
    pub total_repos: usize,
    pub total_stars: i64,
    pub total_forks: i64,
    pub commit_activity: Vec<CommitActivityWeek>,
    pub languages: LanguageStats,
    pub top_repos: Vec<GithubRepo>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DisplayRepo {
    #[serde(flatten)]
    pub repo: GithubRepo,
    #[serde(rename = "githubImageUrl")]
    pub github_image_url: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub total_repos: usize,
    pub total_stars: i64,
    pub total_forks: i64,
    pub total_languages: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RepositorySummary {
    pub repositories: Vec<DisplayRepo>,
    pub stats: RepositoryStats,
}
