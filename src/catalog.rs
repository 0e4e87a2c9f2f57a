use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::{
    constants::GITHUB_OPENGRAPH_BASE,
    content::{ContactInfo, ContentError, NavigationItem, PersonalInfo, YamlLoader},
};

static GITHUB_REPO_URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"github\.com/([^/]+)/([^/]+)").ok());

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_image_url: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum UsesCategory {
    Desk,
    Home,
    Tools,
}

impl UsesCategory {
    pub const ALL: [UsesCategory; 3] = [Self::Desk, Self::Home, Self::Tools];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "desk" => Some(Self::Desk),
            "home" => Some(Self::Home),
            "tools" => Some(Self::Tools),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsesEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsesItem {
    pub category: UsesCategory,
    #[serde(flatten)]
    pub entry: UsesEntry,
}

/// Typed access to the YAML data files backing the portfolio pages.
#[derive(Clone)]
pub struct Catalog {
    loader: YamlLoader,
}

impl Catalog {
    pub fn new(loader: YamlLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &YamlLoader {
        &self.loader
    }

    pub async fn personal_info(&self) -> Result<PersonalInfo, ContentError> {
        Ok(self.loader.load_config().await?.personal)
    }

    pub async fn contact_info(&self) -> Result<ContactInfo, ContentError> {
        Ok(self.loader.load_config().await?.contact)
    }

    pub async fn navigation_items(&self) -> Result<Vec<NavigationItem>, ContentError> {
        let config = self.loader.load_config().await?;
        Ok(config
            .navigation
            .map(|navigation| navigation.items)
            .unwrap_or_default())
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ContentError> {
        let projects: Vec<Project> = self
            .loader
            .load_data_as("projects")
            .await?
            .unwrap_or_default();
        Ok(projects.into_iter().map(with_github_image).collect())
    }

    pub async fn pinned_projects(&self) -> Result<Vec<Project>, ContentError> {
        Ok(filter_projects(self.projects().await?, true, false))
    }

    pub async fn work_experience(&self) -> Result<Vec<WorkExperience>, ContentError> {
        Ok(self
            .loader
            .load_data_as("work-experience")
            .await?
            .unwrap_or_default())
    }

    pub async fn uses_items(&self) -> Result<Vec<UsesItem>, ContentError> {
        let mut uses = self.uses().await?;
        let mut items = Vec::new();
        for category in UsesCategory::ALL {
            items.extend(stamp(category, uses.remove(&category).unwrap_or_default()));
        }
        Ok(items)
    }

    pub async fn uses_by_category(&self, category: &str) -> Result<Vec<UsesItem>, ContentError> {
        let Some(category) = UsesCategory::parse(category) else {
            return Ok(Vec::new());
        };
        let mut uses = self.uses().await?;
        Ok(stamp(category, uses.remove(&category).unwrap_or_default()))
    }

    async fn uses(&self) -> Result<BTreeMap<UsesCategory, Vec<UsesEntry>>, ContentError> {
        let raw: BTreeMap<String, Vec<UsesEntry>> =
            self.loader.load_data_as("uses").await?.unwrap_or_default();
        Ok(raw
            .into_iter()
            .filter_map(|(key, entries)| UsesCategory::parse(&key).map(|category| (category, entries)))
            .collect())
    }
}

/// `featured` is applied to the full list and takes precedence over `pinned`.
pub fn filter_projects(projects: Vec<Project>, pinned: bool, featured: bool) -> Vec<Project> {
    if featured {
        return projects.into_iter().filter(|project| project.featured).collect();
    }
    if pinned {
        return projects.into_iter().filter(|project| project.pinned).collect();
    }
    projects
}

/// Projects without their own image borrow GitHub's social preview card.
pub fn with_github_image(mut project: Project) -> Project {
    if project.image_url.as_deref().is_some_and(|url| !url.is_empty()) {
        return project;
    }

    let Some((owner, repo)) = project.github_url.as_deref().and_then(github_owner_repo) else {
        return project;
    };

    let image_url = format!("{GITHUB_OPENGRAPH_BASE}/{owner}/{repo}");
    project.image_alt = Some(format!("{} project", project.name));
    project.github_image_url = Some(image_url.clone());
    project.image_url = Some(image_url);
    project
}

fn github_owner_repo(url: &str) -> Option<(String, String)> {
    let captures = GITHUB_REPO_URL.as_ref()?.captures(url)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

fn stamp(category: UsesCategory, entries: Vec<UsesEntry>) -> Vec<UsesItem> {
    entries
        .into_iter()
        .map(|entry| UsesItem { category, entry })
        .collect()
}
