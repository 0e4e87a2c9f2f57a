mod activity;
mod client;
mod models;

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::Utc;
use moka::future::Cache;
use tracing::{info, warn};

pub use activity::{aggregate_commit_activity, synthesize_commit_pattern};
pub use client::GithubClient;
pub use models::{
    CommitActivityWeek, DisplayRepo, GithubRepo, GithubStats, LanguageStats,
    RepositoryStats, RepositorySummary,
};

use crate::{
    catalog::{Catalog, Project},
    config::AppConfig,
    constants::{
        GITHUB_DISPLAY_REPO_LIMIT, GITHUB_LANGUAGE_REPO_LIMIT, GITHUB_OPENGRAPH_BASE,
        GITHUB_REPOSITORIES_CACHE_TTL_SECS, GITHUB_STATS_CACHE_TTL_SECS, GITHUB_TOP_REPO_LIMIT,
    },
    error::ServiceError,
};

/// Keeps repositories worth showing: public, with a default branch, and not
/// dot-prefixed profile/config repos.
pub fn filter_public_repos(repos: Vec<GithubRepo>) -> Vec<GithubRepo> {
    repos
        .into_iter()
        .filter(|repo| {
            !repo.name.starts_with('.')
                && repo.is_public()
                && repo
                    .default_branch
                    .as_deref()
                    .is_some_and(|branch| !branch.is_empty())
        })
        .collect()
}

pub fn top_repos(repos: &[GithubRepo], limit: usize) -> Vec<GithubRepo> {
    let mut sorted = repos.to_vec();
    sorted.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
    sorted.truncate(limit);
    sorted
}

/// The named repositories, or the most starred ones when none match.
pub fn pinned_repos(repos: &[GithubRepo], names: &[String]) -> Vec<GithubRepo> {
    if names.is_empty() {
        return top_repos(repos, GITHUB_TOP_REPO_LIMIT);
    }

    let pinned: Vec<GithubRepo> = repos
        .iter()
        .filter(|repo| names.contains(&repo.name))
        .cloned()
        .collect();
    if pinned.is_empty() {
        top_repos(repos, GITHUB_TOP_REPO_LIMIT)
    } else {
        pinned
    }
}

pub fn merge_language_stats(stats: impl IntoIterator<Item = LanguageStats>) -> LanguageStats {
    let mut merged = LanguageStats::new();
    for languages in stats {
        for (language, bytes) in languages {
            *merged.entry(language).or_insert(0) += bytes;
        }
    }
    merged
}

pub fn repo_to_project(repo: &GithubRepo) -> Project {
    let technologies = repo
        .language
        .iter()
        .chain(repo.topics.iter())
        .filter(|tech| !tech.is_empty())
        .cloned()
        .collect();

    Project {
        id: repo.name.clone(),
        name: title_case(&repo.name.replace('-', " ")),
        description: repo
            .description
            .clone()
            .filter(|description| !description.is_empty())
            .unwrap_or_else(|| "No description available".to_string()),
        url: repo
            .homepage
            .clone()
            .filter(|homepage| !homepage.is_empty())
            .unwrap_or_else(|| repo.html_url.clone()),
        github_url: Some(repo.html_url.clone()),
        image_url: Some(format!("/images/projects/{}.jpg", repo.name)),
        image_alt: None,
        github_image_url: None,
        technologies,
        featured: repo.stargazers_count > 10,
        pinned: repo.stargazers_count > 20,
        stars: Some(repo.stargazers_count),
        forks: Some(repo.forks_count),
        updated_at: Some(repo.updated_at.clone()),
    }
}

pub fn summarize_repositories(
    repos: Vec<GithubRepo>,
    username: &str,
    image_hash: Option<&str>,
) -> RepositorySummary {
    let public: Vec<GithubRepo> = repos
        .into_iter()
        .filter(|repo| !repo.fork && repo.is_public())
        .collect();

    let stats = RepositoryStats {
        total_repos: public.len(),
        total_stars: public.iter().map(|repo| repo.stargazers_count).sum(),
        total_forks: public.iter().map(|repo| repo.forks_count).sum(),
        total_languages: public
            .iter()
            .filter_map(|repo| repo.language.as_deref())
            .filter(|language| !language.is_empty())
            .collect::<HashSet<_>>()
            .len(),
    };

    let repositories = top_repos(&public, GITHUB_DISPLAY_REPO_LIMIT)
        .into_iter()
        .map(|repo| {
            let github_image_url = match image_hash {
                Some(hash) => format!("{GITHUB_OPENGRAPH_BASE}/{hash}/{username}/{}", repo.name),
                None => format!("{GITHUB_OPENGRAPH_BASE}/{username}/{}", repo.name),
            };
            DisplayRepo {
                repo,
                github_image_url,
            }
        })
        .collect();

    RepositorySummary {
        repositories,
        stats,
    }
}

fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_is_word = false;
    for ch in input.chars() {
        let is_word = ch.is_alphanumeric() || ch == '_';
        if is_word && !previous_is_word {
            output.extend(ch.to_uppercase());
        } else {
            output.push(ch);
        }
        previous_is_word = is_word;
    }
    output
}

/// GitHub-backed views with their own time-to-live caches.
#[derive(Clone)]
pub struct GithubService {
    client: GithubClient,
    username: String,
    image_hash: Option<String>,
    pinned: Vec<String>,
    stats_cache: Cache<String, Arc<GithubStats>>,
    repositories_cache: Cache<String, Arc<RepositorySummary>>,
}

impl GithubService {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let client = GithubClient::new(&config.github_api, config.github_token.as_deref())?;
        if config.github_token.is_none() {
            warn!("No GitHub token found. Set GITHUB_TOKEN to raise the REST API rate limit.");
        }

        Ok(Self {
            client,
            username: config.github_username.clone(),
            image_hash: config.github_image_hash.clone(),
            pinned: config.pinned_repos.clone(),
            stats_cache: Cache::builder()
                .max_capacity(16)
                .time_to_live(Duration::from_secs(GITHUB_STATS_CACHE_TTL_SECS))
                .build(),
            repositories_cache: Cache::builder()
                .max_capacity(16)
                .time_to_live(Duration::from_secs(GITHUB_REPOSITORIES_CACHE_TTL_SECS))
                .build(),
        })
    }

    /// Each component degrades to empty on upstream failure, so this never
    /// fails as a whole.
    pub async fn stats(&self) -> Arc<GithubStats> {
        if let Some(cached) = self.stats_cache.get(&self.username).await {
            return cached;
        }

        let (repos, events, languages) = tokio::join!(
            self.client.user_repos(&self.username),
            self.client.public_events(&self.username),
            self.language_stats(),
        );

        let repos = match repos {
            Ok(repos) => filter_public_repos(repos),
            Err(err) => {
                warn!("failed to fetch repositories for '{}': {err}", self.username);
                Vec::new()
            }
        };
        let commit_activity = match events {
            Ok(events) => aggregate_commit_activity(&events, Utc::now()),
            Err(err) => {
                warn!("failed to fetch events for '{}': {err}", self.username);
                Vec::new()
            }
        };

        let stats = Arc::new(GithubStats {
            total_repos: repos.len(),
            total_stars: repos.iter().map(|repo| repo.stargazers_count).sum(),
            total_forks: repos.iter().map(|repo| repo.forks_count).sum(),
            commit_activity,
            languages,
            top_repos: top_repos(&repos, GITHUB_TOP_REPO_LIMIT),
        });

        info!(
            "cached GitHub stats for '{}' ({} repos)",
            self.username, stats.total_repos
        );
        self.stats_cache
            .insert(self.username.clone(), stats.clone())
            .await;
        stats
    }

    pub async fn repositories(&self) -> Result<Arc<RepositorySummary>, ServiceError> {
        if let Some(cached) = self.repositories_cache.get(&self.username).await {
            return Ok(cached);
        }

        let repos = self.client.user_repos(&self.username).await?;
        let summary = Arc::new(summarize_repositories(
            repos,
            &self.username,
            self.image_hash.as_deref(),
        ));

        self.repositories_cache
            .insert(self.username.clone(), summary.clone())
            .await;
        Ok(summary)
    }

    /// Pinned repositories as projects, falling back to the pinned projects
    /// listed in the data files.
    pub async fn projects(&self, catalog: &Catalog) -> Result<Vec<Project>, ServiceError> {
        let projects = match self.client.user_repos(&self.username).await {
            Ok(repos) => {
                let repos = filter_public_repos(repos);
                pinned_repos(&repos, &self.pinned)
                    .iter()
                    .map(repo_to_project)
                    .collect()
            }
            Err(err) => {
                warn!("failed to fetch GitHub projects: {err}");
                Vec::new()
            }
        };

        if projects.is_empty() {
            return Ok(catalog.pinned_projects().await?);
        }
        Ok(projects)
    }

    /// Lists repositories on its own so it can run alongside the other fetches.
    async fn language_stats(&self) -> LanguageStats {
        let repos = match self.client.user_repos(&self.username).await {
            Ok(repos) => filter_public_repos(repos),
            Err(err) => {
                warn!("failed to fetch repositories for languages: {err}");
                return LanguageStats::default();
            }
        };

        let mut stats = Vec::new();
        for repo in repos.iter().take(GITHUB_LANGUAGE_REPO_LIMIT) {
            match self.client.languages(&repo.languages_url).await {
                Ok(languages) => stats.push(languages),
                Err(err) => warn!("failed to fetch languages for '{}': {err}", repo.name),
            }
        }
        merge_language_stats(stats)
    }
}
