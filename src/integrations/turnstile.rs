use serde::Deserialize;
use tracing::error;

use crate::constants::TURNSTILE_VERIFY_URL;

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    success: bool,
}

/// Checks a Cloudflare Turnstile token. Any transport or decoding failure
/// counts as a failed verification.
pub async fn verify(client: &reqwest::Client, secret: &str, token: &str) -> bool {
    let response = client
        .post(TURNSTILE_VERIFY_URL)
        .form(&[("secret", secret), ("response", token)])
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(err) => {
            error!("Turnstile verification error: {err}");
            return false;
        }
    };

    match response.json::<VerifyResponse>().await {
        Ok(body) => body.success,
        Err(err) => {
            error!("Turnstile verification error: {err}");
            false
        }
    }
}
