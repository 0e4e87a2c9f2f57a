pub const CACHE_MAX_AGE: u32 = 3_600;
pub const CDN_CACHE_MAX_AGE: u32 = 28_800;
pub const STALE_WHILE_REVALIDATE: u32 = 86_400;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CONTENT_DIR: &str = "content";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://portfolio.db?mode=rwc";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_GITHUB_USERNAME: &str = "yourusername";

pub const CONTENT_CACHE_TTL_SECS: u64 = 5 * 60;
pub const CONTENT_CACHE_CAPACITY: u64 = 1_024;

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const GITHUB_OPENGRAPH_BASE: &str = "https://opengraph.githubassets.com";
pub const GITHUB_STATS_CACHE_TTL_SECS: u64 = 60 * 60;
pub const GITHUB_REPOSITORIES_CACHE_TTL_SECS: u64 = 30 * 60;
pub const GITHUB_REPOS_PER_PAGE: u32 = 100;
pub const GITHUB_EVENTS_PER_PAGE: u32 = 100;
pub const GITHUB_LANGUAGE_REPO_LIMIT: usize = 10;
pub const GITHUB_TOP_REPO_LIMIT: usize = 6;
pub const GITHUB_DISPLAY_REPO_LIMIT: usize = 9;

pub const HEATMAP_WEEKS: usize = 156;
pub const HEATMAP_MIN_ACTIVE_WEEKS: usize = 20;
pub const HEATMAP_BASE_ACTIVITY: f64 = 10.0;
pub const HEATMAP_SEASONAL_AMPLITUDE: f64 = 0.3;
pub const HEATMAP_RECENT_WEEKS: usize = 20;
pub const HEATMAP_RECENT_BOOST: f64 = 1.5;
pub const HEATMAP_DAY_DISTRIBUTION: [f64; 7] = [0.15, 0.2, 0.2, 0.2, 0.15, 0.05, 0.05];

pub const SUMMARIZE_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
pub const SUMMARIZE_RATE_LIMIT_MAX_REQUESTS: u32 = 5;
pub const SUMMARIZE_CONTENT_LIMIT: usize = 4_000;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_MAX_TOKENS: u32 = 150;
pub const DEFAULT_OPENAI_TEMPERATURE: f64 = 0.7;
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const TURNSTILE_VERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";
pub const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_RESEND_FROM_EMAIL: &str = "onboarding@resend.dev";
pub const DEFAULT_RESEND_TO_EMAIL: &str = "hello@example.com";
pub const LASTFM_API_URL: &str = "http://ws.audioscrobbler.com/2.0/";
pub const DEFAULT_CRYPTO_PORTFOLIO_URL: &str =
    "https://wallet.yezz.me/api/portfolio?currency=usd";
pub const CRYPTO_PORTFOLIO_TIMEOUT_SECS: u64 = 10;

pub const WORDS_PER_MINUTE: usize = 200;
pub const FEATURED_POST_LIMIT: usize = 3;
