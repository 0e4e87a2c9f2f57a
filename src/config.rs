use std::{env, path::PathBuf};

use crate::constants::{
    DEFAULT_CONTENT_DIR, DEFAULT_CRYPTO_PORTFOLIO_URL, DEFAULT_DATA_DIR, DEFAULT_DATABASE_URL,
    DEFAULT_GITHUB_API, DEFAULT_GITHUB_USERNAME, DEFAULT_PORT, DEFAULT_PUBLIC_BASE_URL,
    DEFAULT_RESEND_FROM_EMAIL, DEFAULT_RESEND_TO_EMAIL,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub content_dir: PathBuf,
    pub database_url: String,
    pub public_base_url: String,
    pub github_username: String,
    pub github_token: Option<String>,
    pub github_api: String,
    pub github_image_hash: Option<String>,
    pub pinned_repos: Vec<String>,
    pub openai_api_key: Option<String>,
    pub turnstile_secret_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub resend_from_email: String,
    pub resend_to_email: String,
    pub lastfm_api_key: Option<String>,
    pub lastfm_username: Option<String>,
    pub crypto_portfolio_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let value_or = |key: &str, default: &str| value(key).unwrap_or_else(|| default.to_string());

        Self {
            port: value("PORT")
                .and_then(|port| port.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            data_dir: PathBuf::from(value_or("DATA_DIR", DEFAULT_DATA_DIR)),
            content_dir: PathBuf::from(value_or("CONTENT_DIR", DEFAULT_CONTENT_DIR)),
            database_url: value_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            public_base_url: value_or("PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            github_username: value_or("GITHUB_USERNAME", DEFAULT_GITHUB_USERNAME),
            github_token: value("GITHUB_TOKEN"),
            github_api: value_or("GITHUB_API", DEFAULT_GITHUB_API)
                .trim_end_matches('/')
                .to_string(),
            github_image_hash: value("GITHUB_IMAGE_HASH"),
            pinned_repos: value("PINNED_REPOS")
                .map(|names| {
                    names
                        .split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            openai_api_key: value("OPENAI_API_KEY"),
            turnstile_secret_key: value("TURNSTILE_SECRET_KEY"),
            resend_api_key: value("RESEND_API_KEY"),
            resend_from_email: value_or("RESEND_FROM_EMAIL", DEFAULT_RESEND_FROM_EMAIL),
            resend_to_email: value_or("RESEND_TO_EMAIL", DEFAULT_RESEND_TO_EMAIL),
            lastfm_api_key: value("LASTFM_API_KEY"),
            lastfm_username: value("LASTFM_USERNAME"),
            crypto_portfolio_url: value_or("CRYPTO_PORTFOLIO_URL", DEFAULT_CRYPTO_PORTFOLIO_URL),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::AppConfig;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.github_username, "yourusername");
        assert_eq!(config.github_api, "https://api.github.com");
        assert!(config.github_token.is_none());
        assert!(config.pinned_repos.is_empty());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("GITHUB_TOKEN", "  "), ("PORT", "")]);
        assert!(config.github_token.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn pinned_repos_are_split_and_trimmed() {
        let config = config_from(&[("PINNED_REPOS", "fastapi-users, ,authx,")]);
        assert_eq!(config.pinned_repos, vec!["fastapi-users", "authx"]);
    }

    #[test]
    fn base_urls_lose_trailing_slash() {
        let config = config_from(&[("PUBLIC_BASE_URL", "https://example.dev/")]);
        assert_eq!(config.public_base_url, "https://example.dev");
    }
}
