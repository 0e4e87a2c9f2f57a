use std::collections::HashMap;

use url::form_urlencoded;

/// Query string parameters; the first occurrence of a key wins.
#[derive(Debug, Default)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    pub fn from_raw(raw_query: Option<&str>) -> Self {
        let mut values = HashMap::new();

        if let Some(raw) = raw_query {
            for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
                values
                    .entry(key.into_owned())
                    .or_insert_with(|| value.into_owned());
            }
        }

        Self { values }
    }

    /// Empty values are treated as missing.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Only the literal `true` switches a flag on.
    pub fn flag(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|value| value == "true")
    }
}

#[cfg(test)]
mod tests {
    use super::QueryParams;

    #[test]
    fn decodes_values_and_keeps_first_occurrence() {
        let params = QueryParams::from_raw(Some("title=Hello%20World&title=Other&author=Jane+Doe"));
        assert_eq!(params.get("title"), Some("Hello World"));
        assert_eq!(params.get("author"), Some("Jane Doe"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let params = QueryParams::from_raw(Some("blogId=&title=%20&category=desk"));
        assert_eq!(params.get("blogId"), None);
        assert_eq!(params.get("title"), None);
        assert_eq!(params.get("category"), Some("desk"));
    }

    #[test]
    fn flags_require_literal_true() {
        let params = QueryParams::from_raw(Some("pinned=true&featured=1"));
        assert!(params.flag("pinned"));
        assert!(!params.flag("featured"));
        assert!(!QueryParams::from_raw(None).flag("pinned"));
    }
}
