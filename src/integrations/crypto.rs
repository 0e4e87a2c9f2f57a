use std::time::Duration;

use reqwest::{StatusCode, header::ACCEPT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::CRYPTO_PORTFOLIO_TIMEOUT_SECS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    #[serde(default)]
    pub total_value_usd: Value,
    #[serde(default)]
    pub last_updated: Value,
}

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("portfolio API returned status {0}")]
    Status(StatusCode),
    #[error("portfolio request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl PortfolioError {
    /// Upstream error statuses are passed on to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Status(status) => *status,
            Self::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub async fn portfolio(
    client: &reqwest::Client,
    url: &str,
) -> Result<PortfolioSnapshot, PortfolioError> {
    let response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .timeout(Duration::from_secs(CRYPTO_PORTFOLIO_TIMEOUT_SECS))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PortfolioError::Status(status));
    }

    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{PortfolioError, PortfolioSnapshot};

    #[test]
    fn keeps_only_summary_fields() {
        let snapshot: PortfolioSnapshot = serde_json::from_value(serde_json::json!({
            "totalValueUsd": 1234.5,
            "lastUpdated": "2024-06-01T00:00:00Z",
            "holdings": [{ "symbol": "BTC" }],
        }))
        .unwrap();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["totalValueUsd"], 1234.5);
        assert!(json.get("holdings").is_none());
    }

    #[test]
    fn upstream_status_is_propagated() {
        assert_eq!(
            PortfolioError::Status(StatusCode::BAD_GATEWAY).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
