use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::{
    catalog::Project,
    content::{BlogPost, Talk, newest_first_key},
};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaggedPost {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub date: String,
    pub reading_time: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BlogTag {
    pub name: String,
    pub count: usize,
    pub posts: Vec<TaggedPost>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogTagPosts {
    pub tag: String,
    pub posts: Vec<BlogPost>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Blog,
    Talk,
    Project,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagContent {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TagCounts {
    pub count: usize,
    pub blogs: usize,
    pub talks: usize,
    pub projects: usize,
}

impl TagCounts {
    fn add(&mut self, kind: ContentKind) {
        self.count += 1;
        match kind {
            ContentKind::Blog => self.blogs += 1,
            ContentKind::Talk => self.talks += 1,
            ContentKind::Project => self.projects += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnifiedTag {
    pub name: String,
    #[serde(flatten)]
    pub counts: TagCounts,
    pub content: Vec<TagContent>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TagDetail {
    pub tag: String,
    #[serde(flatten)]
    pub counts: TagCounts,
    pub content: Vec<TagContent>,
}

/// Groups posts by tag, most used tags first.
pub fn blog_tags(posts: &[BlogPost]) -> Vec<BlogTag> {
    let mut tags = TagIndex::default();
    for post in posts {
        for tag in &post.tags {
            let entry = tags.entry(tag, || BlogTag {
                name: tag.clone(),
                count: 0,
                posts: Vec::new(),
            });
            entry.count += 1;
            entry.posts.push(TaggedPost {
                slug: post.slug.clone(),
                title: post.title.clone(),
                excerpt: post.excerpt.clone(),
                date: post.date.clone(),
                reading_time: post.reading_time,
            });
        }
    }

    let mut tags = tags.into_values();
    for tag in &mut tags {
        tag.posts.sort_by_key(|post| newest_first_key(&post.date));
    }
    tags.sort_by(|a, b| b.count.cmp(&a.count));
    tags
}

pub fn blog_tag(posts: &[BlogPost], tag: &str) -> BlogTagPosts {
    let mut matching: Vec<BlogPost> = posts
        .iter()
        .filter(|post| has_tag(&post.tags, tag))
        .cloned()
        .collect();
    matching.sort_by_key(|post| newest_first_key(&post.date));

    BlogTagPosts {
        tag: tag.to_string(),
        count: matching.len(),
        posts: matching,
    }
}

/// Aggregates tags across posts, talks and project technologies.
pub fn unified_tags(
    posts: &[BlogPost],
    talks: &[Talk],
    projects: &[Project],
    now: DateTime<Utc>,
) -> Vec<UnifiedTag> {
    let mut tags = TagIndex::default();
    let mut push = |name: &String, content: TagContent| {
        let entry = tags.entry(name, || UnifiedTag {
            name: name.clone(),
            counts: TagCounts::default(),
            content: Vec::new(),
        });
        entry.counts.add(content.kind);
        entry.content.push(content);
    };

    for post in posts {
        for tag in &post.tags {
            push(tag, blog_content(post, false));
        }
    }
    for talk in talks {
        for tag in &talk.tags {
            push(tag, talk_content(talk, false));
        }
    }
    for project in projects {
        for tech in &project.technologies {
            push(tech, project_content(project, now, false));
        }
    }

    let mut tags = tags.into_values();
    for tag in &mut tags {
        tag.content.sort_by_key(|content| newest_first_key(&content.date));
    }
    tags.sort_by(|a, b| b.counts.count.cmp(&a.counts.count));
    tags
}

/// Everything carrying `tag`, compared case-insensitively.
pub fn tag_detail(
    tag: &str,
    posts: &[BlogPost],
    talks: &[Talk],
    projects: &[Project],
    now: DateTime<Utc>,
) -> TagDetail {
    let mut counts = TagCounts::default();
    let mut content = Vec::new();

    for post in posts.iter().filter(|post| has_tag(&post.tags, tag)) {
        counts.add(ContentKind::Blog);
        content.push(blog_content(post, true));
    }
    for talk in talks.iter().filter(|talk| has_tag(&talk.tags, tag)) {
        counts.add(ContentKind::Talk);
        content.push(talk_content(talk, true));
    }
    for project in projects
        .iter()
        .filter(|project| has_tag(&project.technologies, tag))
    {
        counts.add(ContentKind::Project);
        content.push(project_content(project, now, true));
    }

    content.sort_by_key(|content| newest_first_key(&content.date));

    TagDetail {
        tag: tag.to_string(),
        counts,
        content,
    }
}

fn has_tag(tags: &[String], tag: &str) -> bool {
    let tag = tag.to_lowercase();
    tags.iter().any(|candidate| candidate.to_lowercase() == tag)
}

fn blog_content(post: &BlogPost, detailed: bool) -> TagContent {
    TagContent {
        kind: ContentKind::Blog,
        slug: post.slug.clone(),
        title: post.title.clone(),
        date: post.date.clone(),
        reading_time: Some(post.reading_time),
        featured: Some(post.featured),
        description: detailed.then(|| post.excerpt.clone()),
        url: None,
        venue: None,
        technologies: None,
    }
}

fn talk_content(talk: &Talk, detailed: bool) -> TagContent {
    TagContent {
        kind: ContentKind::Talk,
        slug: talk.id.clone(),
        title: talk.title.clone(),
        date: talk.date.clone(),
        reading_time: None,
        featured: None,
        description: detailed.then(|| talk.description.clone()),
        url: if detailed {
            talk.video_url.clone().or_else(|| talk.slides_url.clone())
        } else {
            None
        },
        venue: detailed.then(|| talk.venue.clone()),
        technologies: None,
    }
}

fn project_content(project: &Project, now: DateTime<Utc>, detailed: bool) -> TagContent {
    let date = project
        .updated_at
        .clone()
        .filter(|date| !date.is_empty())
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));

    TagContent {
        kind: ContentKind::Project,
        slug: project.id.clone(),
        title: project.name.clone(),
        date,
        reading_time: None,
        featured: None,
        description: detailed.then(|| project.description.clone()),
        url: detailed.then(|| project.url.clone()),
        venue: None,
        technologies: detailed.then(|| project.technologies.clone()),
    }
}

/// Insertion-ordered map so equal counts keep first-seen order.
struct TagIndex<T> {
    positions: HashMap<String, usize>,
    values: Vec<T>,
}

impl<T> Default for TagIndex<T> {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            values: Vec::new(),
        }
    }
}

impl<T> TagIndex<T> {
    fn entry(&mut self, name: &str, create: impl FnOnce() -> T) -> &mut T {
        let position = match self.positions.get(name) {
            Some(position) => *position,
            None => {
                self.values.push(create());
                let position = self.values.len() - 1;
                self.positions.insert(name.to_string(), position);
                position
            }
        };
        &mut self.values[position]
    }

    fn into_values(self) -> Vec<T> {
        self.values
    }
}
