use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::http::HeaderMap;
use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Per-client fixed-window counter. Each client gets `max_requests` within a
/// window that starts with its first request; once the window has elapsed
/// the counter starts over.
#[derive(Clone)]
pub struct FixedWindowRateLimiter {
    windows: Arc<DashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
}

impl FixedWindowRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now > entry.reset_at {
            *entry = Window {
                count: 0,
                reset_at: now + self.window,
            };
        }

        if entry.count >= self.max_requests {
            return Decision::Limited {
                retry_after: self.window,
            };
        }

        entry.count += 1;
        Decision::Allowed
    }

    /// Drops windows that have already elapsed.
    pub fn purge_expired(&self, now: Instant) {
        let before = self.windows.len();
        self.windows.retain(|_, window| now <= window.reset_at);
        let purged = before.saturating_sub(self.windows.len());
        if purged > 0 {
            debug!("purged {purged} expired rate limit windows");
        }
    }

    /// Runs [`Self::purge_expired`] once per window for the life of the process.
    pub fn spawn_purger(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window);
            interval.tick().await;
            loop {
                interval.tick().await;
                limiter.purge_expired(Instant::now());
            }
        })
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.len()
    }
}

/// The first `X-Forwarded-For` hop, then `X-Real-IP`, then `"unknown"`.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
        .unwrap_or("unknown")
        .to_string()
}
