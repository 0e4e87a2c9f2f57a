use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::html::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub url: String,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

const SECTIONS: [(&str, ChangeFrequency, f32); 9] = [
    ("", ChangeFrequency::Monthly, 1.0),
    ("/about", ChangeFrequency::Monthly, 0.8),
    ("/projects", ChangeFrequency::Weekly, 0.8),
    ("/blog", ChangeFrequency::Weekly, 0.8),
    ("/talks", ChangeFrequency::Monthly, 0.6),
    ("/contact", ChangeFrequency::Monthly, 0.7),
    ("/oss", ChangeFrequency::Weekly, 0.6),
    ("/uses", ChangeFrequency::Monthly, 0.5),
    ("/tags", ChangeFrequency::Weekly, 0.5),
];

pub fn entries(base_url: &str) -> Vec<SitemapEntry> {
    let base_url = base_url.trim_end_matches('/');
    SECTIONS
        .iter()
        .map(|(path, change_frequency, priority)| SitemapEntry {
            url: format!("{base_url}{path}"),
            change_frequency: *change_frequency,
            priority: *priority,
        })
        .collect()
}

pub fn render(entries: &[SitemapEntry], last_modified: DateTime<Utc>) -> String {
    let last_modified = last_modified.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for entry in entries {
        let _ = write!(
            xml,
            "<url>\n<loc>{}</loc>\n<lastmod>{last_modified}</lastmod>\n<changefreq>{}</changefreq>\n<priority>{}</priority>\n</url>\n",
            escape_html(&entry.url),
            entry.change_frequency.as_str(),
            entry.priority,
        );
    }

    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{ChangeFrequency, entries, render};

    #[test]
    fn lists_every_site_section() {
        let entries = entries("https://jane.dev/");

        assert_eq!(entries.len(), 9);
        assert_eq!(entries[0].url, "https://jane.dev");
        assert_eq!(entries[0].priority, 1.0);
        assert_eq!(entries[3].url, "https://jane.dev/blog");
        assert_eq!(entries[3].change_frequency, ChangeFrequency::Weekly);
        assert_eq!(entries[8].url, "https://jane.dev/tags");
    }

    #[test]
    fn renders_urlset() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let xml = render(&entries("https://jane.dev"), now);

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert_eq!(xml.matches("<url>").count(), 9);
        assert!(xml.contains("<loc>https://jane.dev/uses</loc>"));
        assert!(xml.contains("<lastmod>2024-06-01T00:00:00.000Z</lastmod>"));
        assert!(xml.contains("<priority>0.5</priority>"));
        assert!(xml.contains("<priority>1</priority>"));
    }
}
