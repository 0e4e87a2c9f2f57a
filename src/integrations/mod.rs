pub mod crypto;
pub mod lastfm;
pub mod openai;
pub mod resend;
pub mod turnstile;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

/// Shared client for third-party APIs other than GitHub.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("Portfolio-Website/1.0"));

    reqwest::Client::builder()
        .default_headers(headers)
        .pool_idle_timeout(Duration::from_secs(90))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
}
