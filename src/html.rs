use std::fmt::Write;

use crate::content::{BlogPost, PersonalInfo};

const STYLE: &str = r#"
    body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 0; background: #fafafa; color: #1f2328; }
    header, main, footer { width: min(860px, 92vw); margin: 0 auto; }
    header { padding: 32px 0 8px; }
    header a { color: inherit; text-decoration: none; font-weight: 600; }
    main { padding: 16px 0 48px; }
    .card { background: #fff; border-radius: 8px; padding: 20px; margin-bottom: 16px; box-shadow: 0 4px 24px rgba(0, 0, 0, 0.06); }
    .muted { color: #57606a; font-size: 14px; }
    .tag { display: inline-block; background: #eef1f4; border-radius: 999px; padding: 2px 10px; margin-right: 6px; font-size: 13px; }
    .blog-image { max-width: 100%; border-radius: 6px; }
    .code-block-wrapper { position: relative; margin: 16px 0; }
    .code-block-header { display: flex; justify-content: space-between; font-size: 12px; }
    pre { background: #0d1117; color: #e6edf3; padding: 16px; border-radius: 6px; overflow-x: auto; }
    footer { padding: 24px 0; font-size: 13px; color: #57606a; }
"#;

/// Escapes text for use in element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn home_page(personal: &PersonalInfo, latest_posts: &[BlogPost]) -> String {
    let name = escape_html(&personal.name);
    let title = escape_html(&personal.title);
    let bio = escape_html(&personal.bio);
    let location = escape_html(&personal.location);

    let mut posts = String::new();
    for post in latest_posts {
        posts.push_str(&post_summary(post));
    }
    if posts.is_empty() {
        posts.push_str("<p class=\"muted\">No posts yet.</p>");
    }

    layout(
        &personal.name,
        &personal.name,
        &format!(
            r#"<section class="card">
      <h1>{name}</h1>
      <p><strong>{title}</strong></p>
      <p>{bio}</p>
      <p class="muted">{location}</p>
    </section>
    <section>
      <h2>Latest posts</h2>
      {posts}
      <p><a href="/blog">All posts &rarr;</a></p>
    </section>"#
        ),
    )
}

pub fn blog_index_page(site_name: &str, posts: &[BlogPost]) -> String {
    let mut items = String::with_capacity(posts.len() * 400);
    for post in posts {
        items.push_str(&post_summary(post));
    }
    if items.is_empty() {
        items.push_str("<p class=\"muted\">No posts yet.</p>");
    }

    layout(
        &format!("Blog | {site_name}"),
        site_name,
        &format!("<h1>Blog</h1>\n    {items}"),
    )
}

/// `post.content` is already rendered HTML and is inserted as is.
pub fn blog_post_page(site_name: &str, post: &BlogPost) -> String {
    let title = escape_html(&post.title);
    let date = escape_html(&post.date);
    let reading_time = post.reading_time;
    let tags = tag_list(&post.tags);
    let cover = post
        .image
        .as_deref()
        .map(|image| {
            format!(
                "<img class=\"blog-image\" src=\"{}\" alt=\"{title}\" />",
                escape_html(image)
            )
        })
        .unwrap_or_default();
    let content = &post.content;

    layout(
        &format!("{} | {site_name}", post.title),
        site_name,
        &format!(
            r#"<article class="card">
      {cover}
      <h1>{title}</h1>
      <p class="muted">{date} &middot; {reading_time} min read</p>
      <p>{tags}</p>
      {content}
    </article>"#
        ),
    )
}

pub fn not_found_page(site_name: &str) -> String {
    layout(
        &format!("Not Found | {site_name}"),
        site_name,
        r#"<section class="card">
      <h1>404 - Page Not Found</h1>
      <p>Sorry, the page you are looking for does not exist.</p>
      <p><a href="/">Back home</a></p>
    </section>"#,
    )
}

fn post_summary(post: &BlogPost) -> String {
    let slug = escape_html(&post.slug);
    let title = escape_html(&post.title);
    let excerpt = escape_html(&post.excerpt);
    let date = escape_html(&post.date);
    let reading_time = post.reading_time;
    let tags = tag_list(&post.tags);

    format!(
        r#"<div class="card">
        <h3><a href="/blog/{slug}">{title}</a></h3>
        <p class="muted">{date} &middot; {reading_time} min read</p>
        <p>{excerpt}</p>
        <p>{tags}</p>
      </div>
      "#
    )
}

fn tag_list(tags: &[String]) -> String {
    let mut output = String::new();
    for tag in tags {
        let _ = write!(output, "<span class=\"tag\">{}</span>", escape_html(tag));
    }
    output
}

fn layout(title: &str, site_name: &str, body: &str) -> String {
    let title = escape_html(title);
    let site_name = escape_html(site_name);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{title}</title>
  <style>{STYLE}</style>
</head>
<body>
  <header><a href="/">{site_name}</a></header>
  <main>
    {body}
  </main>
  <footer>&copy; {site_name}</footer>
</body>
</html>"#
    )
}
