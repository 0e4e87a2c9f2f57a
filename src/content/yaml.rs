use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use moka::future::Cache;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_yaml::Value;
use tracing::{debug, error};

use super::ContentError;
use crate::constants::CONTENT_CACHE_CAPACITY;

const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub name: String,
    pub title: String,
    pub bio: String,
    pub bio_long: String,
    pub avatar: String,
    pub location: String,
    pub email: String,
    pub github: String,
    pub twitter: String,
    pub linkedin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam: Option<String>,
    pub website: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    pub email: String,
    pub cal_username: String,
    pub response_time: String,
    pub available_for_work: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSection {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialLink {
    pub url: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavigationItem {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationSection {
    pub items: Vec<NavigationItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    pub threejs: Option<bool>,
    pub theme_toggle: Option<bool>,
    pub contact_form: Option<bool>,
    pub cal_booking: Option<bool>,
    pub github_integration: Option<bool>,
    pub mdx_support: Option<bool>,
    pub chatgpt_summarization: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubSection {
    pub username: Option<String>,
    pub token: Option<String>,
    pub pinned_repos: Option<u32>,
    pub show_stats: Option<bool>,
    pub show_commit_activity: Option<bool>,
    pub show_languages: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatgptSection {
    pub enabled: Option<bool>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FooterLink {
    pub name: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FooterSection {
    pub copyright: Option<String>,
    pub made_with: Option<String>,
    pub pages: Vec<FooterLink>,
    pub resources: Vec<FooterLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub personal: PersonalInfo,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub site: Option<SiteSection>,
    #[serde(default)]
    pub social: Option<BTreeMap<String, SocialLink>>,
    #[serde(default)]
    pub navigation: Option<NavigationSection>,
    #[serde(default)]
    pub seo: Option<Value>,
    #[serde(default)]
    pub features: Option<FeatureFlags>,
    #[serde(default)]
    pub github: Option<GithubSection>,
    #[serde(default)]
    pub chatgpt: Option<ChatgptSection>,
    #[serde(default)]
    pub footer: Option<FooterSection>,
}

impl SiteConfig {
    pub fn summarization_enabled(&self) -> bool {
        let feature = self
            .features
            .as_ref()
            .and_then(|features| features.chatgpt_summarization)
            .unwrap_or(false);
        let enabled = self
            .chatgpt
            .as_ref()
            .and_then(|chatgpt| chatgpt.enabled)
            .unwrap_or(false);
        feature && enabled
    }

    pub fn site_url(&self) -> Option<&str> {
        self.site.as_ref().and_then(|site| site.url.as_deref())
    }
}

/// Reads YAML files from the data directory, memoizing parsed documents for
/// a fixed time-to-live keyed by file path.
#[derive(Clone)]
pub struct YamlLoader {
    data_dir: PathBuf,
    cache: Cache<PathBuf, Arc<Value>>,
}

impl YamlLoader {
    pub fn new(data_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CONTENT_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            data_dir: data_dir.into(),
            cache,
        }
    }

    pub async fn load_config(&self) -> Result<SiteConfig, ContentError> {
        let path = self.data_dir.join(CONFIG_FILE);
        let value = self.load_file(&path, validate_config).await?;
        parse_config(&path, &value)
    }

    pub async fn load_data(&self, name: &str) -> Result<Arc<Value>, ContentError> {
        let path = self.data_dir.join(format!("{name}.yaml"));
        self.load_file(&path, |_, _| Ok(())).await
    }

    /// Typed variant of [`Self::load_data`]; an empty document yields `None`.
    pub async fn load_data_as<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, ContentError> {
        let value = self.load_data(name).await?;
        if value.is_null() {
            return Ok(None);
        }

        serde_yaml::from_value(Value::clone(&value))
            .map(Some)
            .map_err(|err| ContentError::Parse {
                path: format!("{name}.yaml"),
                message: err.to_string(),
            })
    }

    pub async fn load_all(&self) -> Result<BTreeMap<String, Arc<Value>>, ContentError> {
        let mut entries = tokio::fs::read_dir(&self.data_dir)
            .await
            .map_err(|err| io_error(&self.data_dir, err))?;
        let mut data = BTreeMap::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| io_error(&self.data_dir, err))?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name == CONFIG_FILE {
                continue;
            }
            if let Some(name) = file_name.strip_suffix(".yaml") {
                let value = self.load_data(name).await?;
                data.insert(name.to_string(), value);
            }
        }

        Ok(data)
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Only documents that pass `validate` are cached.
    async fn load_file<F>(&self, path: &Path, validate: F) -> Result<Arc<Value>, ContentError>
    where
        F: FnOnce(&Path, &Value) -> Result<(), ContentError>,
    {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        debug!("loading yaml from {}", path.display());
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| io_error(path, err))?;
        let value: Value = serde_yaml::from_str(&contents).map_err(|err| ContentError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        validate(path, &value)?;

        let value = Arc::new(value);
        self.cache.insert(key, value.clone()).await;
        Ok(value)
    }
}

fn validate_config(path: &Path, value: &Value) -> Result<(), ContentError> {
    if value.is_null() {
        error!("config file {} is empty", path.display());
        return Err(ContentError::EmptyConfig);
    }
    if value.get("personal").is_none_or(Value::is_null) {
        return Err(ContentError::MissingPersonal);
    }
    parse_config(path, value).map(drop)
}

fn parse_config(path: &Path, value: &Value) -> Result<SiteConfig, ContentError> {
    serde_yaml::from_value(value.clone()).map_err(|err| ContentError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

fn io_error(path: &Path, err: std::io::Error) -> ContentError {
    ContentError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::{ContentError, YamlLoader};

    const CONFIG: &str = r#"
personal:
  name: Jane Doe
  title: Software Engineer
  bio: Builds things.
contact:
  email: jane@example.com
  availableForWork: true
features:
  chatgptSummarization: true
chatgpt:
  enabled: true
  model: gpt-4o-mini
navigation:
  items:
    - name: Blog
      href: /blog
      icon: book
"#;

    #[tokio::test]
    async fn loads_and_validates_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), CONFIG).unwrap();

        let loader = YamlLoader::new(dir.path(), Duration::from_secs(60));
        let config = loader.load_config().await.unwrap();

        assert_eq!(config.personal.name, "Jane Doe");
        assert!(config.contact.available_for_work);
        assert!(config.summarization_enabled());
        assert_eq!(config.navigation.unwrap().items[0].href, "/blog");
    }

    #[tokio::test]
    async fn rejects_empty_config_and_missing_personal() {
        let dir = tempfile::tempdir().unwrap();
        let loader = YamlLoader::new(dir.path(), Duration::from_secs(60));

        fs::write(dir.path().join("config.yaml"), "").unwrap();
        assert!(matches!(
            loader.load_config().await,
            Err(ContentError::EmptyConfig)
        ));

        fs::write(dir.path().join("config.yaml"), "contact:\n  email: a@b.c\n").unwrap();
        assert!(matches!(
            loader.load_config().await,
            Err(ContentError::MissingPersonal)
        ));
    }

    #[tokio::test]
    async fn invalid_config_is_reread_once_fixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let loader = YamlLoader::new(dir.path(), Duration::from_secs(60));

        fs::write(&path, "").unwrap();
        assert!(matches!(
            loader.load_config().await,
            Err(ContentError::EmptyConfig)
        ));
        fs::write(&path, "personal:\n  name: Jane\n").unwrap();
        assert_eq!(loader.load_config().await.unwrap().personal.name, "Jane");

        fs::write(&path, "personal:\n").unwrap();
        let other = YamlLoader::new(dir.path(), Duration::from_secs(60));
        assert!(matches!(
            other.load_config().await,
            Err(ContentError::MissingPersonal)
        ));
        fs::write(&path, CONFIG).unwrap();
        assert_eq!(other.load_config().await.unwrap().personal.name, "Jane Doe");
    }

    #[tokio::test]
    async fn serves_cached_value_until_ttl_expires() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uses.yaml");
        fs::write(&path, "desk: []\n").unwrap();

        let loader = YamlLoader::new(dir.path(), Duration::from_millis(200));
        let first = loader.load_data("uses").await.unwrap();
        assert!(first.get("desk").is_some());

        fs::write(&path, "tools: []\n").unwrap();
        let cached = loader.load_data("uses").await.unwrap();
        assert!(cached.get("desk").is_some());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let refreshed = loader.load_data("uses").await.unwrap();
        assert!(refreshed.get("tools").is_some());
    }

    #[tokio::test]
    async fn clear_forces_a_reread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.yaml");
        fs::write(&path, "- id: one\n").unwrap();

        let loader = YamlLoader::new(dir.path(), Duration::from_secs(60));
        loader.load_data("projects").await.unwrap();

        fs::write(&path, "- id: two\n").unwrap();
        loader.clear();
        let value = loader.load_data("projects").await.unwrap();
        assert_eq!(value[0]["id"].as_str(), Some("two"));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let loader = YamlLoader::new(dir.path(), Duration::from_secs(60));

        assert!(loader.load_data("talks").await.is_err());
        fs::write(dir.path().join("talks.yaml"), "- title: Hello\n").unwrap();
        assert!(loader.load_data("talks").await.is_ok());
    }

    #[tokio::test]
    async fn load_all_skips_site_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), CONFIG).unwrap();
        fs::write(dir.path().join("uses.yaml"), "desk: []\n").unwrap();
        fs::write(dir.path().join("work-experience.yaml"), "[]\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loader = YamlLoader::new(dir.path(), Duration::from_secs(60));
        let all = loader.load_all().await.unwrap();

        assert_eq!(
            all.keys().cloned().collect::<Vec<_>>(),
            vec!["uses".to_string(), "work-experience".to_string()]
        );
    }
}
