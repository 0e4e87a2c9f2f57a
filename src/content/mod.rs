mod markdown;
mod posts;
mod yaml;

use chrono::{DateTime, NaiveDate};
use thiserror::Error;

pub use posts::{BlogPost, ContentStore, Talk};
pub use yaml::{
    ContactInfo, NavigationItem, PersonalInfo, SiteConfig, YamlLoader,
};

#[derive(Debug, Error, Clone)]
pub enum ContentError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Config file is empty or invalid")]
    EmptyConfig,
    #[error("Personal information is missing from config")]
    MissingPersonal,
}

/// Milliseconds since the epoch for an RFC 3339 timestamp or a bare
/// `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date_millis(input: &str) -> Option<i64> {
    let input = input.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Some(datetime.timestamp_millis());
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp_millis())
}

/// Sort key placing the newest dates first and unparseable dates last.
pub fn newest_first_key(date: &str) -> i64 {
    parse_date_millis(date).map(|millis| -millis).unwrap_or(i64::MAX)
}

/// Slugs name a single file inside a content directory.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.contains(['/', '\\'])
        && !slug.contains("..")
        && !slug.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::{is_valid_slug, newest_first_key, parse_date_millis};

    #[test]
    fn parses_plain_dates_and_timestamps() {
        assert_eq!(parse_date_millis("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_date_millis("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(parse_date_millis("soon"), None);
    }

    #[test]
    fn unparseable_dates_sort_last() {
        let mut dates = vec!["garbage", "2023-01-01", "2024-06-01"];
        dates.sort_by_key(|date| newest_first_key(date));
        assert_eq!(dates, vec!["2024-06-01", "2023-01-01", "garbage"]);
    }

    #[test]
    fn slugs_cannot_escape_the_content_dir() {
        assert!(is_valid_slug("hello-world"));
        assert!(!is_valid_slug("../secrets"));
        assert!(!is_valid_slug("nested/post"));
        assert!(!is_valid_slug(".hidden"));
        assert!(!is_valid_slug(""));
    }
}
