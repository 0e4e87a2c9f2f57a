use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    catalog::{Catalog, Project, UsesItem, WorkExperience, filter_projects},
    config::AppConfig,
    constants::{
        CACHE_MAX_AGE, CDN_CACHE_MAX_AGE, CONTENT_CACHE_TTL_SECS, FEATURED_POST_LIMIT,
        STALE_WHILE_REVALIDATE, SUMMARIZE_RATE_LIMIT_MAX_REQUESTS,
        SUMMARIZE_RATE_LIMIT_WINDOW_SECS,
    },
    content::{
        BlogPost, ContactInfo, ContentError, ContentStore, NavigationItem, PersonalInfo,
        SiteConfig, Talk, YamlLoader,
    },
    database::{Comment, CommentAuthor, Database, NewComment, ReactionCounts},
    error::{ServiceError, failure, failure_with_details},
    github::{GithubService, GithubStats, RepositorySummary, synthesize_commit_pattern},
    html,
    integrations::{
        crypto, http_client, lastfm,
        openai::{Summarizer, Summary},
        resend::{ContactMessage, Mailer, Signature},
        turnstile,
    },
    params::QueryParams,
    rate_limit::{Decision, FixedWindowRateLimiter, client_key},
    sitemap,
    svg::{self, OgCard},
    tags::{self, BlogTag, BlogTagPosts, TagDetail, UnifiedTag},
};

const DEFAULT_SITE_NAME: &str = "Portfolio";
const DEFAULT_OWNER_TITLE: &str = "Software Engineer";

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Catalog,
    pub content: ContentStore,
    pub github: GithubService,
    pub database: Option<Database>,
    pub limiter: FixedWindowRateLimiter,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig, database: Option<Database>) -> Result<Self, ServiceError> {
        let ttl = Duration::from_secs(CONTENT_CACHE_TTL_SECS);

        Ok(Self {
            catalog: Catalog::new(YamlLoader::new(config.data_dir.clone(), ttl)),
            content: ContentStore::new(config.content_dir.clone(), ttl),
            github: GithubService::new(&config)?,
            database,
            limiter: FixedWindowRateLimiter::new(
                SUMMARIZE_RATE_LIMIT_MAX_REQUESTS,
                Duration::from_secs(SUMMARIZE_RATE_LIMIT_WINDOW_SECS),
            ),
            http: http_client()?,
            config: Arc::new(config),
        })
    }

    fn database(&self) -> Result<&Database, ServiceError> {
        self.database
            .as_ref()
            .ok_or_else(ServiceError::database_unavailable)
    }

    async fn post(&self, slug: &str) -> Result<BlogPost, ServiceError> {
        self.content
            .blog_post(slug)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Post not found".to_string()))
    }

    /// Pages keep rendering when the site config is broken.
    async fn site_config(&self) -> Option<SiteConfig> {
        match self.catalog.loader().load_config().await {
            Ok(config) => Some(config),
            Err(err) => {
                error!("failed to load site config: {err}");
                None
            }
        }
    }

    /// Drops cached content and site data, then reads the data files again.
    pub async fn reload_content(&self) -> Result<usize, ContentError> {
        let loader = self.catalog.loader();
        loader.clear();
        self.content.clear();

        let data = loader.load_all().await?;
        info!("reloaded {} data files", data.len());
        Ok(data.len())
    }

    fn base_url<'a>(&'a self, site: Option<&'a SiteConfig>) -> &'a str {
        site.and_then(SiteConfig::site_url)
            .unwrap_or(&self.config.public_base_url)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/healthz", get(health_handler))
        .route("/blog", get(blog_index_handler))
        .route("/blog/{slug}", get(blog_page_handler))
        .route("/sitemap.xml", get(sitemap_handler))
        .route("/api/personal-info", get(personal_info_handler))
        .route("/api/contact-info", get(contact_info_handler))
        .route("/api/navigation", get(navigation_handler))
        .route("/api/work-experience", get(work_experience_handler))
        .route("/api/uses", get(uses_handler))
        .route("/api/projects", get(projects_handler))
        .route("/api/talks", get(talks_handler))
        .route("/api/talks/{id}", get(talk_handler))
        .route("/api/blog-posts", get(blog_posts_handler))
        .route("/api/blog-posts/{slug}", get(blog_post_handler))
        .route(
            "/api/blog-posts/{slug}/interactions",
            get(interactions_handler),
        )
        .route("/api/blog/{id}/like", post(like_handler))
        .route("/api/blog/{id}/dislike", post(dislike_handler))
        .route("/api/blog/tags", get(blog_tags_handler))
        .route("/api/blog/tags/{tag}", get(blog_tag_handler))
        .route("/api/tags", get(unified_tags_handler))
        .route("/api/tags/{tag}", get(tag_detail_handler))
        .route(
            "/api/comments",
            get(list_comments_handler).post(create_comment_handler),
        )
        .route("/api/github-stats", get(github_stats_handler))
        .route("/api/github-stats/heatmap.svg", get(heatmap_handler))
        .route("/api/github/repositories", get(repositories_handler))
        .route("/api/github/projects", get(github_projects_handler))
        .route("/api/contact", post(contact_handler))
        .route("/api/chatgpt/summarize", post(summarize_handler))
        .route("/api/lastfm/now-playing", get(now_playing_handler))
        .route("/api/crypto-portfolio", get(crypto_portfolio_handler))
        .route("/api/og", get(og_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    "ok"
}

async fn home_handler(State(state): State<AppState>) -> Response {
    let site = state.site_config().await;
    let personal = site
        .as_ref()
        .map(|site| site.personal.clone())
        .unwrap_or_default();

    let latest = match state.content.featured_blog_posts(FEATURED_POST_LIMIT).await {
        Ok(featured) if !featured.is_empty() => featured,
        Ok(_) => match state.content.blog_posts().await {
            Ok(posts) => posts.iter().take(FEATURED_POST_LIMIT).cloned().collect(),
            Err(err) => {
                error!("failed to load blog posts: {err}");
                Vec::new()
            }
        },
        Err(err) => {
            error!("failed to load blog posts: {err}");
            Vec::new()
        }
    };

    html_response(StatusCode::OK, html::home_page(&personal, &latest))
}

async fn blog_index_handler(State(state): State<AppState>) -> Response {
    let site = state.site_config().await;
    let site_name = site_name(site.as_ref());

    match state.content.blog_posts().await {
        Ok(posts) => html_response(StatusCode::OK, html::blog_index_page(&site_name, &posts)),
        Err(err) => {
            error!("failed to load blog posts: {err}");
            html_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                html::blog_index_page(&site_name, &[]),
            )
        }
    }
}

async fn blog_page_handler(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let site = state.site_config().await;
    let site_name = site_name(site.as_ref());

    match state.content.blog_post(&slug).await {
        Ok(Some(post)) => html_response(StatusCode::OK, html::blog_post_page(&site_name, &post)),
        Ok(None) => html_response(StatusCode::NOT_FOUND, html::not_found_page(&site_name)),
        Err(err) => {
            error!("failed to load blog post '{slug}': {err}");
            html_response(StatusCode::NOT_FOUND, html::not_found_page(&site_name))
        }
    }
}

async fn not_found_handler(State(state): State<AppState>) -> Response {
    let site = state.site_config().await;
    html_response(
        StatusCode::NOT_FOUND,
        html::not_found_page(&site_name(site.as_ref())),
    )
}

async fn sitemap_handler(State(state): State<AppState>) -> Response {
    let site = state.site_config().await;
    let entries = sitemap::entries(state.base_url(site.as_ref()));
    let xml = sitemap::render(&entries, Utc::now());

    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        xml,
    )
        .into_response()
}

async fn personal_info_handler(
    State(state): State<AppState>,
) -> Result<Json<PersonalInfo>, ServiceError> {
    state
        .catalog
        .personal_info()
        .await
        .map(Json)
        .map_err(|err| failure("Failed to load personal info", err.into()))
}

async fn contact_info_handler(
    State(state): State<AppState>,
) -> Result<Json<ContactInfo>, ServiceError> {
    state
        .catalog
        .contact_info()
        .await
        .map(Json)
        .map_err(|err| failure("Failed to load contact info", err.into()))
}

async fn navigation_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<NavigationItem>>, ServiceError> {
    state
        .catalog
        .navigation_items()
        .await
        .map(Json)
        .map_err(|err| failure("Failed to load navigation items", err.into()))
}

async fn work_experience_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<WorkExperience>>, ServiceError> {
    state
        .catalog
        .work_experience()
        .await
        .map(Json)
        .map_err(|err| failure("Failed to load work experience", err.into()))
}

async fn uses_handler(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<UsesItem>>, ServiceError> {
    let params = QueryParams::from_raw(raw_query.as_deref());
    let items = match params.get("category") {
        Some(category) => state.catalog.uses_by_category(category).await,
        None => state.catalog.uses_items().await,
    };

    items
        .map(Json)
        .map_err(|err| failure("Failed to load uses items", err.into()))
}

async fn projects_handler(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<Project>>, ServiceError> {
    let params = QueryParams::from_raw(raw_query.as_deref());
    let projects = state
        .catalog
        .projects()
        .await
        .map_err(|err| failure("Failed to fetch projects", err.into()))?;

    Ok(Json(filter_projects(
        projects,
        params.flag("pinned"),
        params.flag("featured"),
    )))
}

async fn talks_handler(State(state): State<AppState>) -> Result<Json<Vec<Talk>>, ServiceError> {
    let talks = state
        .content
        .talks()
        .await
        .map_err(|err| failure("Failed to load talks", err.into()))?;
    Ok(Json(talks.as_ref().clone()))
}

async fn talk_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Talk>, ServiceError> {
    state
        .content
        .talk(&id)
        .await
        .map_err(|err| failure("Failed to load talk", err.into()))?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound("Talk not found".to_string()))
}

async fn blog_posts_handler(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<BlogPost>>, ServiceError> {
    let params = QueryParams::from_raw(raw_query.as_deref());
    let posts = state
        .content
        .blog_posts()
        .await
        .map_err(|err| failure("Failed to fetch blog posts", err.into()))?;

    let posts = if params.flag("featured") {
        posts.iter().filter(|post| post.featured).cloned().collect()
    } else {
        posts.as_ref().clone()
    };
    Ok(Json(posts))
}

async fn blog_post_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ServiceError> {
    state
        .post(&slug)
        .await
        .map(Json)
        .map_err(|err| failure("Failed to load blog post", err))
}

async fn interactions_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ReactionCounts>, ServiceError> {
    let counts = async { state.database()?.reaction_counts(&slug).await };
    counts
        .await
        .map(Json)
        .map_err(|err| failure("Failed to fetch blog interactions", err))
}

#[derive(Debug, Clone, Copy)]
enum Reaction {
    Like,
    Dislike,
}

async fn like_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    react(&state, &id, Reaction::Like).await
}

async fn dislike_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    react(&state, &id, Reaction::Dislike).await
}

async fn react(state: &AppState, slug: &str, reaction: Reaction) -> Response {
    let result = async {
        let database = state.database()?;
        let post = state.post(slug).await?;
        match reaction {
            Reaction::Like => database.like(&post).await,
            Reaction::Dislike => database.dislike(&post).await,
        }
    };

    match result.await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => {
            let context = match reaction {
                Reaction::Like => "Failed to like blog post",
                Reaction::Dislike => "Failed to dislike blog post",
            };
            failure(context, err).into_response()
        }
    }
}

async fn blog_tags_handler(State(state): State<AppState>) -> Response {
    match state.content.blog_posts().await {
        Ok(posts) => Json::<Vec<BlogTag>>(tags::blog_tags(&posts)).into_response(),
        Err(err) => failure_with_details("Failed to load blog tags", err.into()),
    }
}

async fn blog_tag_handler(State(state): State<AppState>, Path(tag): Path<String>) -> Response {
    match state.content.blog_posts().await {
        Ok(posts) => Json::<BlogTagPosts>(tags::blog_tag(&posts, &tag)).into_response(),
        Err(err) => failure_with_details("Failed to load blog posts for tag", err.into()),
    }
}

async fn tagged_content(
    state: &AppState,
) -> Result<(Arc<Vec<BlogPost>>, Arc<Vec<Talk>>, Vec<Project>), ContentError> {
    tokio::try_join!(
        state.content.blog_posts(),
        state.content.talks(),
        state.catalog.projects(),
    )
}

async fn unified_tags_handler(State(state): State<AppState>) -> Response {
    match tagged_content(&state).await {
        Ok((posts, talks, projects)) => Json::<Vec<UnifiedTag>>(tags::unified_tags(
            &posts,
            &talks,
            &projects,
            Utc::now(),
        ))
        .into_response(),
        Err(err) => failure_with_details("Failed to load tags", err.into()),
    }
}

async fn tag_detail_handler(State(state): State<AppState>, Path(tag): Path<String>) -> Response {
    match tagged_content(&state).await {
        Ok((posts, talks, projects)) => Json::<TagDetail>(tags::tag_detail(
            &tag,
            &posts,
            &talks,
            &projects,
            Utc::now(),
        ))
        .into_response(),
        Err(err) => failure_with_details("Failed to load content for tag", err.into()),
    }
}

async fn list_comments_handler(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<Comment>>, ServiceError> {
    let params = QueryParams::from_raw(raw_query.as_deref());
    let comments = async {
        let slug = params
            .get("blogId")
            .ok_or_else(|| ServiceError::BadRequest("Blog ID is required".to_string()))?;
        let database = state.database()?;
        let post = state.post(slug).await?;
        database.comments_for(&post).await
    };

    comments
        .await
        .map(Json)
        .map_err(|err| failure("Failed to fetch comments", err))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateCommentRequest {
    content: Option<String>,
    blog_id: Option<String>,
    parent_id: Option<String>,
    user_id: Option<String>,
    user_email: Option<String>,
    user_name: Option<String>,
    user_avatar: Option<String>,
}

async fn create_comment_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Comment>), ServiceError> {
    create_comment(&state, &body)
        .await
        .map(|comment| (StatusCode::CREATED, Json(comment)))
        .map_err(|err| failure("Failed to create comment", err))
}

async fn create_comment(state: &AppState, body: &[u8]) -> Result<Comment, ServiceError> {
    let request: CreateCommentRequest = serde_json::from_slice(body).unwrap_or_default();
    let (Some(content), Some(blog_id), Some(user_id)) = (
        non_blank(request.content),
        non_blank(request.blog_id),
        non_blank(request.user_id),
    ) else {
        return Err(ServiceError::BadRequest(
            "Content, blogId, and userId are required".to_string(),
        ));
    };

    let database = state.database()?;
    let post = state.post(&blog_id).await?;
    let comment = database
        .create_comment(NewComment {
            post: &post,
            content: &content,
            parent_id: request.parent_id.as_deref().filter(|id| !id.is_empty()),
            author: CommentAuthor {
                id: user_id,
                email: request.user_email,
                name: request.user_name,
                avatar: request.user_avatar,
            },
        })
        .await?;

    info!("comment {} created on '{}'", comment.id, post.slug);
    Ok(comment)
}

async fn github_stats_handler(State(state): State<AppState>) -> Json<Arc<GithubStats>> {
    Json(state.github.stats().await)
}

async fn heatmap_handler(State(state): State<AppState>) -> Response {
    let stats = state.github.stats().await;
    let svg = if stats.commit_activity.is_empty() {
        svg::render_heatmap(&synthesize_commit_pattern(Utc::now()))
    } else {
        svg::render_heatmap(&stats.commit_activity)
    };
    svg_response(Bytes::from(svg))
}

async fn repositories_handler(State(state): State<AppState>) -> Response {
    match state.github.repositories().await {
        Ok(summary) => Json::<Arc<RepositorySummary>>(summary).into_response(),
        Err(err) => failure_with_details("Failed to fetch GitHub repositories", err),
    }
}

async fn github_projects_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, ServiceError> {
    state
        .github
        .projects(&state.catalog)
        .await
        .map(Json)
        .map_err(|err| failure("Failed to fetch projects", err))
}

async fn contact_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match send_contact(&state, &body).await {
        Ok(email_id) => Json(json!({
            "message": "Email sent successfully",
            "emailId": email_id,
        }))
        .into_response(),
        Err(err @ ServiceError::Internal(_)) => {
            error!("contact form error: {err}");
            err.into_response()
        }
        Err(err) => failure_with_details("Internal server error", err),
    }
}

async fn send_contact(state: &AppState, body: &[u8]) -> Result<Option<String>, ServiceError> {
    let contact: ContactMessage = serde_json::from_slice(body).unwrap_or_default();
    if [&contact.name, &contact.email, &contact.subject, &contact.message]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ServiceError::BadRequest(
            "All fields are required".to_string(),
        ));
    }

    let token = non_blank(contact.turnstile_token.clone())
        .ok_or_else(|| ServiceError::BadRequest("Verification required".to_string()))?;
    if !verify_turnstile(state, &token).await {
        return Err(ServiceError::BadRequest("Verification failed".to_string()));
    }

    if !is_valid_email(&contact.email) {
        return Err(ServiceError::BadRequest("Invalid email format".to_string()));
    }

    let Some(api_key) = state.config.resend_api_key.as_deref() else {
        return Err(ServiceError::Internal(
            "Email service not configured".to_string(),
        ));
    };

    let mailer = Mailer::new(
        &state.http,
        api_key,
        &state.config.resend_from_email,
        &state.config.resend_to_email,
    );
    let email_id = mailer.send(&mailer.owner_notification(&contact)).await?;

    let personal = state
        .catalog
        .personal_info()
        .await
        .unwrap_or_else(|err| {
            warn!("signing confirmation without personal info: {err}");
            PersonalInfo::default()
        });
    let signature = Signature {
        name: personal.name,
        title: personal.title,
    };
    if let Err(err) = mailer
        .send(&mailer.sender_confirmation(&contact, &signature))
        .await
    {
        warn!("failed to send contact confirmation: {err}");
    }

    info!("contact message from {} delivered", contact.email);
    Ok(email_id)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummarizeRequest {
    content: Option<String>,
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    turnstile_token: Option<String>,
}

async fn summarize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Summary>, ServiceError> {
    summarize(&state, &headers, &body)
        .await
        .map(Json)
        .map_err(|err| match err {
            ServiceError::Upstream(_) => failure("Internal server error", err),
            other => other,
        })
}

async fn summarize(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Summary, ServiceError> {
    let site = state
        .catalog
        .loader()
        .load_config()
        .await
        .map_err(|err| failure("Internal server error", err.into()))?;

    if !site.summarization_enabled() {
        return Err(ServiceError::Forbidden(
            "ChatGPT summarization is not enabled".to_string(),
        ));
    }

    let client = client_key(headers);
    if let Decision::Limited { retry_after } = state.limiter.check(&client) {
        warn!("summarization rate limit hit for {client}");
        return Err(ServiceError::RateLimited {
            retry_after_secs: retry_after.as_secs(),
        });
    }

    let request: SummarizeRequest = serde_json::from_slice(body).unwrap_or_default();
    let (Some(content), Some(title)) = (non_blank(request.content), non_blank(request.title))
    else {
        return Err(ServiceError::BadRequest(
            "Content and title are required".to_string(),
        ));
    };

    if state.config.turnstile_secret_key.is_some() {
        let token = non_blank(request.turnstile_token)
            .ok_or_else(|| ServiceError::BadRequest("Verification required".to_string()))?;
        if !verify_turnstile(state, &token).await {
            return Err(ServiceError::BadRequest("Verification failed".to_string()));
        }
    }

    let summarizer = Summarizer::from_config(
        &state.http,
        &site,
        state.config.openai_api_key.as_deref(),
    )
    .ok_or_else(|| ServiceError::Internal("OpenAI API key not configured".to_string()))?;

    let kind = non_blank(request.kind).unwrap_or_else(|| "blog".to_string());
    summarizer.summarize(&kind, &title, &content).await
}

async fn now_playing_handler(
    State(state): State<AppState>,
) -> Result<Json<Option<Value>>, ServiceError> {
    let (Some(api_key), Some(username)) = (
        state.config.lastfm_api_key.as_deref(),
        state.config.lastfm_username.as_deref(),
    ) else {
        return Err(ServiceError::Internal(
            "Last.fm credentials not configured".to_string(),
        ));
    };

    lastfm::now_playing(&state.http, api_key, username)
        .await
        .map(Json)
        .map_err(|err| failure("Failed to fetch Last.fm data", err))
}

async fn crypto_portfolio_handler(State(state): State<AppState>) -> Response {
    match crypto::portfolio(&state.http, &state.config.crypto_portfolio_url).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => {
            error!("crypto portfolio error: {err}");
            (
                err.status(),
                Json(json!({ "error": "Failed to fetch portfolio data" })),
            )
                .into_response()
        }
    }
}

async fn og_handler(State(state): State<AppState>, RawQuery(raw_query): RawQuery) -> Response {
    let params = QueryParams::from_raw(raw_query.as_deref());
    let site = state.site_config().await;
    let personal = site
        .as_ref()
        .map(|site| site.personal.clone())
        .unwrap_or_default();
    let subtitle = if personal.title.is_empty() {
        DEFAULT_OWNER_TITLE
    } else {
        personal.title.as_str()
    };

    let card = OgCard::new(
        params.get("title"),
        params.get("author"),
        params.get("date"),
        &personal.name,
        subtitle,
        &site_host(state.base_url(site.as_ref())),
        Utc::now(),
    );
    svg_response(Bytes::from(card.render()))
}

async fn verify_turnstile(state: &AppState, token: &str) -> bool {
    match state.config.turnstile_secret_key.as_deref() {
        Some(secret) => turnstile::verify(&state.http, secret, token).await,
        None => {
            error!("TURNSTILE_SECRET_KEY is not configured");
            false
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

fn site_name(site: Option<&SiteConfig>) -> String {
    site.and_then(|site| {
        site.site
            .as_ref()
            .and_then(|section| section.title.clone())
            .or_else(|| Some(site.personal.name.clone()))
    })
    .filter(|name| !name.is_empty())
    .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string())
}

fn site_host(base_url: &str) -> String {
    url::Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| base_url.to_string())
}

fn cache_control_header() -> String {
    format!(
        "public, max-age={CACHE_MAX_AGE}, s-maxage={CDN_CACHE_MAX_AGE}, stale-while-revalidate={STALE_WHILE_REVALIDATE}"
    )
}

fn svg_response(svg: Bytes) -> Response {
    let mut response = Response::new(Body::from(svg));
    *response.status_mut() = StatusCode::OK;

    let cache_control = cache_control_header();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("image/svg+xml"),
    );
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }

    response
}

fn html_response(status_code: StatusCode, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status_code;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    if status_code.is_success()
        && let Ok(value) = HeaderValue::from_str(&cache_control_header())
    {
        headers.insert(header::CACHE_CONTROL, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::{AppState, is_valid_email, router, site_host};
    use crate::{config::AppConfig, database::tests::memory_database};

    const SITE_CONFIG: &str = "personal:\n  name: Jane Doe\n  title: Software Engineer\n  bio: Builds things\nsite:\n  title: Jane's Site\n  url: https://jane.dev\n";

    fn write_fixtures(root: &Path, summarization: bool) {
        let data = root.join("data");
        fs::create_dir_all(&data).unwrap();
        let mut config = SITE_CONFIG.to_string();
        if summarization {
            config.push_str("features:\n  chatgptSummarization: true\nchatgpt:\n  enabled: true\n");
        }
        fs::write(data.join("config.yaml"), config).unwrap();
        fs::write(
            data.join("projects.yaml"),
            "- id: authx\n  name: AuthX\n  description: Auth for APIs\n  technologies: [rust, fastapi]\n  featured: true\n  pinned: false\n",
        )
        .unwrap();

        let blog = root.join("content").join("blog");
        fs::create_dir_all(&blog).unwrap();
        fs::write(
            blog.join("hello-rust.mdx"),
            "---\ntitle: Hello Rust\ndate: \"2024-03-01\"\nexcerpt: First steps\ntags: [rust, intro]\nfeatured: true\n---\n# Hello\n\nOwnership and borrowing.\n",
        )
        .unwrap();
    }

    async fn app(root: &Path, summarization: bool, with_database: bool) -> Router {
        router(state(root, summarization, with_database).await)
    }

    async fn state(root: &Path, summarization: bool, with_database: bool) -> AppState {
        write_fixtures(root, summarization);
        let data_dir = root.join("data").display().to_string();
        let content_dir = root.join("content").display().to_string();
        let config = AppConfig::from_lookup(|key| match key {
            "DATA_DIR" => Some(data_dir.clone()),
            "CONTENT_DIR" => Some(content_dir.clone()),
            _ => None,
        });

        let database = if with_database {
            Some(memory_database().await)
        } else {
            None
        };
        AppState::new(config, database).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    #[tokio::test]
    async fn health_check_answers_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let response = send(&app, get("/healthz")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn serves_catalog_and_posts() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let personal = body_json(send(&app, get("/api/personal-info")).await).await;
        assert_eq!(personal["name"], "Jane Doe");

        let posts = body_json(send(&app, get("/api/blog-posts?featured=true")).await).await;
        assert_eq!(posts.as_array().unwrap().len(), 1);
        assert_eq!(posts[0]["slug"], "hello-rust");
        assert_eq!(posts[0]["readingTime"], 1);

        let missing = send(&app, get("/api/blog-posts/nope")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(missing).await["error"], "Post not found");

        let talk = send(&app, get("/api/talks/nope")).await;
        assert_eq!(talk.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(talk).await["error"], "Talk not found");

        let uses = body_json(send(&app, get("/api/uses?category=garage")).await).await;
        assert_eq!(uses, json!([]));
    }

    #[tokio::test]
    async fn reload_picks_up_edited_content() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), false, false).await;
        let app = router(state.clone());

        let projects = body_json(send(&app, get("/api/projects")).await).await;
        assert_eq!(projects[0]["id"], "authx");
        assert_eq!(
            body_json(send(&app, get("/api/blog-posts")).await).await.as_array().unwrap().len(),
            1
        );

        fs::write(
            dir.path().join("data").join("projects.yaml"),
            "- id: ledger\n  name: Ledger\n  description: Books\n  technologies: [rust]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("content").join("blog").join("second.mdx"),
            "---\ntitle: Second\ndate: \"2024-04-01\"\n---\nMore.\n",
        )
        .unwrap();

        let cached = body_json(send(&app, get("/api/projects")).await).await;
        assert_eq!(cached[0]["id"], "authx");

        assert_eq!(state.reload_content().await.unwrap(), 1);
        let projects = body_json(send(&app, get("/api/projects")).await).await;
        assert_eq!(projects[0]["id"], "ledger");
        let posts = body_json(send(&app, get("/api/blog-posts")).await).await;
        assert_eq!(posts[0]["slug"], "second");
        assert_eq!(posts.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn renders_pages_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let page = send(&app, get("/blog/hello-rust")).await;
        assert_eq!(page.status(), StatusCode::OK);
        assert_eq!(
            page.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert!(body_text(page).await.contains("<h1>Hello Rust</h1>"));

        let missing = send(&app, get("/blog/..%2Fsecrets")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(body_text(missing).await.contains("404 - Page Not Found"));

        let unknown = send(&app, get("/does/not/exist")).await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tag_detail_reports_unreadable_content() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;
        fs::remove_dir_all(dir.path().join("content").join("blog")).unwrap();

        let response = send(&app, get("/api/tags/rust")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to load content for tag");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn tags_span_posts_and_projects() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let blog_tags = body_json(send(&app, get("/api/blog/tags")).await).await;
        assert_eq!(blog_tags.as_array().unwrap().len(), 2);

        let detail = body_json(send(&app, get("/api/tags/RUST")).await).await;
        assert_eq!(detail["tag"], "RUST");
        assert_eq!(detail["count"], 2);
        assert_eq!(detail["blogs"], 1);
        assert_eq!(detail["projects"], 1);
    }

    #[tokio::test]
    async fn comments_require_blog_id_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let response = send(&app, get("/api/comments")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Blog ID is required");

        let response = send(&app, post_json("/api/comments", json!({ "content": "hi" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Content, blogId, and userId are required"
        );

        let response = send(
            &app,
            post_json(
                "/api/comments",
                json!({ "content": "hi", "blogId": "hello-rust", "userId": "u1" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Database not available");
    }

    #[tokio::test]
    async fn comments_and_reactions_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, true).await;

        let created = send(
            &app,
            post_json(
                "/api/comments",
                json!({
                    "content": "Great post",
                    "blogId": "hello-rust",
                    "userId": "u1",
                    "userName": "Sam",
                }),
            ),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = body_json(created).await;
        assert_eq!(created["user"]["name"], "Sam");

        let listed = body_json(send(&app, get("/api/comments?blogId=hello-rust")).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["id"], created["id"]);

        let liked = send(&app, post_json("/api/blog/hello-rust/like", json!({}))).await;
        assert_eq!(body_json(liked).await, json!({ "success": true }));
        let counts =
            body_json(send(&app, get("/api/blog-posts/hello-rust/interactions")).await).await;
        assert_eq!(counts, json!({ "likes": 1, "dislikes": 0 }));

        let unknown = send(&app, post_json("/api/blog/nope/dislike", json!({}))).await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summarize_is_gated_by_feature_flags() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let response = send(
            &app,
            post_json(
                "/api/chatgpt/summarize",
                json!({ "content": "body", "title": "Title" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await["error"],
            "ChatGPT summarization is not enabled"
        );
    }

    #[tokio::test]
    async fn summarize_is_rate_limited_per_client() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true, false).await;

        for _ in 0..5 {
            let response = send(&app, post_json("/api/chatgpt/summarize", json!({}))).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                body_json(response).await["error"],
                "Content and title are required"
            );
        }

        let limited = send(&app, post_json("/api/chatgpt/summarize", json!({}))).await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.headers()[header::RETRY_AFTER], "900");
        let body = body_json(limited).await;
        assert_eq!(body["error"], "Rate limit exceeded. Please try again later.");
        assert_eq!(body["retryAfter"], 900);
    }

    #[tokio::test]
    async fn summarize_requires_an_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true, false).await;

        let response = send(
            &app,
            post_json(
                "/api/chatgpt/summarize",
                json!({ "content": "body", "title": "Title", "type": "article" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "OpenAI API key not configured"
        );
    }

    #[tokio::test]
    async fn contact_checks_fields_then_verification() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let response = send(&app, post_json("/api/contact", json!({ "name": "Sam" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "All fields are required");

        let message = json!({
            "name": "Sam",
            "email": "not-an-email",
            "subject": "Hi",
            "message": "Hello there",
        });
        let response = send(&app, post_json("/api/contact", message.clone())).await;
        assert_eq!(body_json(response).await["error"], "Verification required");

        let mut with_token = message;
        with_token["turnstileToken"] = json!("token");
        let response = send(&app, post_json("/api/contact", with_token)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Verification failed");
    }

    #[tokio::test]
    async fn lastfm_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let response = send(&app, get("/api/lastfm/now-playing")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "Last.fm credentials not configured"
        );
    }

    #[tokio::test]
    async fn og_card_and_sitemap_use_site_config() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false, false).await;

        let og = send(&app, get("/api/og?title=Hello%20%26%20Welcome")).await;
        assert_eq!(og.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let svg = body_text(og).await;
        assert!(svg.contains("Hello &amp; Welcome"));
        assert!(svg.contains(">Jane Doe</text>"));
        assert!(svg.contains(">jane.dev</text>"));

        let sitemap = body_text(send(&app, get("/sitemap.xml")).await).await;
        assert!(sitemap.contains("<loc>https://jane.dev/blog</loc>"));
        assert_eq!(sitemap.matches("<url>").count(), 9);
    }

    #[test]
    fn email_format_matches_site_rules() {
        assert!(is_valid_email("sam@example.com"));
        assert!(!is_valid_email("sam@example"));
        assert!(!is_valid_email("sam @example.com"));
    }

    #[test]
    fn site_host_strips_scheme() {
        assert_eq!(site_host("https://jane.dev"), "jane.dev");
        assert_eq!(site_host("not a url"), "not a url");
    }
}
