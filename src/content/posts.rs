use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    ContentError, is_valid_slug, markdown::{reading_time, render_markdown, split_front_matter},
    newest_first_key,
};
use crate::constants::CONTENT_CACHE_CAPACITY;

const BLOG_DIR: &str = "blog";
const TALKS_DIR: &str = "talks";
const CONTENT_EXTENSION: &str = "mdx";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<String>,
    pub featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub reading_time: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Talk {
    pub id: String,
    pub title: String,
    pub date: String,
    pub venue: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FrontMatter {
    title: String,
    date: String,
    excerpt: String,
    tags: Vec<String>,
    featured: bool,
    image: Option<String>,
    venue: String,
    description: String,
    slides_url: Option<String>,
    video_url: Option<String>,
    image_url: Option<String>,
}

/// Blog posts and talks parsed from `.mdx` files, memoized per directory for
/// the configured time-to-live.
#[derive(Clone)]
pub struct ContentStore {
    content_dir: PathBuf,
    posts: Cache<PathBuf, Arc<Vec<BlogPost>>>,
    talks: Cache<PathBuf, Arc<Vec<Talk>>>,
}

impl ContentStore {
    pub fn new(content_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            content_dir: content_dir.into(),
            posts: Cache::builder()
                .max_capacity(CONTENT_CACHE_CAPACITY)
                .time_to_live(ttl)
                .build(),
            talks: Cache::builder()
                .max_capacity(CONTENT_CACHE_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn blog_posts(&self) -> Result<Arc<Vec<BlogPost>>, ContentError> {
        let dir = self.content_dir.join(BLOG_DIR);
        if let Some(cached) = self.posts.get(&dir).await {
            return Ok(cached);
        }

        let mut posts = Vec::new();
        for (slug, source) in read_documents(&dir, false).await? {
            match parse_front_matter(&dir, &slug, &source) {
                Ok((front_matter, body)) => posts.push(blog_post_from(slug, front_matter, body)),
                Err(err) => warn!("skipping blog post: {err}"),
            }
        }
        posts.sort_by_key(|post| newest_first_key(&post.date));

        let posts = Arc::new(posts);
        self.posts.insert(dir, posts.clone()).await;
        Ok(posts)
    }

    pub async fn blog_post(&self, slug: &str) -> Result<Option<BlogPost>, ContentError> {
        if !is_valid_slug(slug) {
            return Ok(None);
        }

        let posts = self.blog_posts().await?;
        Ok(posts.iter().find(|post| post.slug == slug).cloned())
    }

    pub async fn featured_blog_posts(&self, limit: usize) -> Result<Vec<BlogPost>, ContentError> {
        let posts = self.blog_posts().await?;
        Ok(posts
            .iter()
            .filter(|post| post.featured)
            .take(limit)
            .cloned()
            .collect())
    }

    pub async fn talks(&self) -> Result<Arc<Vec<Talk>>, ContentError> {
        let dir = self.content_dir.join(TALKS_DIR);
        if let Some(cached) = self.talks.get(&dir).await {
            return Ok(cached);
        }

        let mut talks = Vec::new();
        for (id, source) in read_documents(&dir, true).await? {
            match parse_front_matter(&dir, &id, &source) {
                Ok((front_matter, _)) => talks.push(talk_from(id, front_matter)),
                Err(err) => warn!("skipping talk: {err}"),
            }
        }
        talks.sort_by_key(|talk| newest_first_key(&talk.date));

        let talks = Arc::new(talks);
        self.talks.insert(dir, talks.clone()).await;
        Ok(talks)
    }

    pub async fn talk(&self, id: &str) -> Result<Option<Talk>, ContentError> {
        if !is_valid_slug(id) {
            return Ok(None);
        }

        let talks = self.talks().await?;
        Ok(talks.iter().find(|talk| talk.id == id).cloned())
    }

    pub fn clear(&self) {
        self.posts.invalidate_all();
        self.talks.invalidate_all();
    }
}

async fn read_documents(
    dir: &Path,
    missing_ok: bool,
) -> Result<Vec<(String, String)>, ContentError> {
    let io_error = |err: std::io::Error| ContentError::Io {
        path: dir.display().to_string(),
        message: err.to_string(),
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if missing_ok && err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Vec::new());
        }
        Err(err) => return Err(io_error(err)),
    };

    let mut documents = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(CONTENT_EXTENSION) {
            continue;
        }
        let Some(slug) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        debug!("reading {}", path.display());
        let source = tokio::fs::read_to_string(&path).await.map_err(io_error)?;
        documents.push((slug.to_string(), source));
    }

    Ok(documents)
}

fn parse_front_matter<'a>(
    dir: &Path,
    slug: &str,
    source: &'a str,
) -> Result<(FrontMatter, &'a str), ContentError> {
    let (header, body) = split_front_matter(source);
    let front_matter = if header.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(header).map_err(|err| ContentError::Parse {
            path: dir
                .join(format!("{slug}.{CONTENT_EXTENSION}"))
                .display()
                .to_string(),
            message: err.to_string(),
        })?
    };

    Ok((front_matter, body))
}

fn blog_post_from(slug: String, front_matter: FrontMatter, body: &str) -> BlogPost {
    BlogPost {
        slug,
        title: front_matter.title,
        date: front_matter.date,
        excerpt: front_matter.excerpt,
        content: render_markdown(body),
        tags: front_matter.tags,
        featured: front_matter.featured,
        image: front_matter.image,
        reading_time: reading_time(body),
    }
}

fn talk_from(id: String, front_matter: FrontMatter) -> Talk {
    Talk {
        id,
        title: front_matter.title,
        date: front_matter.date,
        venue: front_matter.venue,
        description: front_matter.description,
        slides_url: front_matter.slides_url,
        video_url: front_matter.video_url,
        image_url: front_matter.image_url,
        tags: front_matter.tags,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{fs, path::Path, time::Duration};

    use super::ContentStore;

    pub(crate) fn write_post(root: &Path, slug: &str, date: &str, tags: &[&str], featured: bool) {
        let dir = root.join("blog");
        fs::create_dir_all(&dir).unwrap();
        let tags = tags.join(", ");
        fs::write(
            dir.join(format!("{slug}.mdx")),
            format!(
                "---\ntitle: Post {slug}\ndate: \"{date}\"\nexcerpt: About {slug}\ntags: [{tags}]\nfeatured: {featured}\n---\n# {slug}\n\nSome words here.\n"
            ),
        )
        .unwrap();
    }

    pub(crate) fn write_talk(root: &Path, id: &str, date: &str, tags: &[&str]) {
        let dir = root.join("talks");
        fs::create_dir_all(&dir).unwrap();
        let tags = tags.join(", ");
        fs::write(
            dir.join(format!("{id}.mdx")),
            format!(
                "---\ntitle: Talk {id}\ndate: \"{date}\"\nvenue: PyCon\ndescription: About {id}\nvideoUrl: https://video.dev/{id}\ntags: [{tags}]\n---\n"
            ),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn loads_posts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "older", "2023-01-10", &["rust"], false);
        write_post(dir.path(), "newer", "2024-03-01", &["rust", "web"], true);
        fs::write(dir.path().join("blog").join("notes.txt"), "ignored").unwrap();

        let store = ContentStore::new(dir.path(), Duration::from_secs(60));
        let posts = store.blog_posts().await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].slug, "newer");
        assert_eq!(posts[0].title, "Post newer");
        assert_eq!(posts[0].tags, vec!["rust", "web"]);
        assert!(posts[0].content.contains("<h1>newer</h1>"));
        assert_eq!(posts[0].reading_time, 1);
    }

    #[tokio::test]
    async fn finds_single_post_and_featured_subset() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a", "2024-01-01", &[], true);
        write_post(dir.path(), "b", "2024-02-01", &[], false);
        write_post(dir.path(), "c", "2024-03-01", &[], true);

        let store = ContentStore::new(dir.path(), Duration::from_secs(60));
        assert_eq!(store.blog_post("b").await.unwrap().unwrap().slug, "b");
        assert!(store.blog_post("missing").await.unwrap().is_none());
        assert!(store.blog_post("../a").await.unwrap().is_none());

        let featured = store.featured_blog_posts(1).await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].slug, "c");
    }

    #[tokio::test]
    async fn missing_talks_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path(), Duration::from_secs(60));
        assert!(store.talks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn loads_talks() {
        let dir = tempfile::tempdir().unwrap();
        write_talk(dir.path(), "fastapi", "2023-05-01", &["python"]);
        write_talk(dir.path(), "pydantic", "2024-05-01", &["python", "typing"]);

        let store = ContentStore::new(dir.path(), Duration::from_secs(60));
        let talks = store.talks().await.unwrap();
        assert_eq!(talks[0].id, "pydantic");
        assert_eq!(talks[0].venue, "PyCon");
        assert_eq!(
            talks[0].video_url.as_deref(),
            Some("https://video.dev/pydantic")
        );

        assert!(store.talk("fastapi").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_blog_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path(), Duration::from_secs(60));
        assert!(store.blog_posts().await.is_err());
    }

    #[tokio::test]
    async fn cached_posts_survive_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "first", "2024-01-01", &[], false);

        let store = ContentStore::new(dir.path(), Duration::from_secs(60));
        assert_eq!(store.blog_posts().await.unwrap().len(), 1);

        write_post(dir.path(), "second", "2024-02-01", &[], false);
        assert_eq!(store.blog_posts().await.unwrap().len(), 1);

        store.clear();
        assert_eq!(store.blog_posts().await.unwrap().len(), 2);
    }
}
