use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{GithubEvent, GithubRepo, LanguageStats};
use crate::{
    constants::{GITHUB_EVENTS_PER_PAGE, GITHUB_REPOS_PER_PAGE},
    error::ServiceError,
};

/// Thin REST v3 client scoped to the endpoints the portfolio reads.
#[derive(Clone)]
pub struct GithubClient {
    http_client: reqwest::Client,
    github_api: String,
}

impl GithubClient {
    pub fn new(github_api: &str, token: Option<&str>) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("portfolio-server"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {token}"))
                .map_err(|err| ServiceError::Internal(format!("invalid GitHub token: {err}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            http_client,
            github_api: github_api.trim_end_matches('/').to_string(),
        })
    }

    pub async fn user_repos(&self, username: &str) -> Result<Vec<GithubRepo>, ServiceError> {
        let url = format!(
            "{}/users/{username}/repos?sort=updated&per_page={GITHUB_REPOS_PER_PAGE}&type=owner",
            self.github_api
        );
        self.get_json(&url).await
    }

    pub async fn public_events(&self, username: &str) -> Result<Vec<GithubEvent>, ServiceError> {
        let url = format!(
            "{}/users/{username}/events/public?per_page={GITHUB_EVENTS_PER_PAGE}",
            self.github_api
        );
        self.get_json(&url).await
    }

    pub async fn languages(&self, languages_url: &str) -> Result<LanguageStats, ServiceError> {
        self.get_json(languages_url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ServiceError> {
        debug!("GET {url}");
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Upstream(format!(
                "GitHub API error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )));
        }

        Ok(response.json().await?)
    }
}
