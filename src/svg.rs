use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::{github::CommitActivityWeek, html::escape_html};

const OG_WIDTH: u32 = 1200;
const OG_HEIGHT: u32 = 630;
const OG_DEFAULT_TITLE: &str = "Blog Post";

const CELL_SIZE: u32 = 10;
const CELL_GAP: u32 = 3;
const HEATMAP_PADDING: u32 = 20;
const HEATMAP_LEGEND_HEIGHT: u32 = 24;
const HEATMAP_LEVELS: [&str; 5] = ["#161b22", "#0e4429", "#006d32", "#26a641", "#39d353"];

/// Open Graph preview card for blog posts.
#[derive(Debug, Clone)]
pub struct OgCard {
    title: String,
    author: String,
    subtitle: String,
    date: String,
    site: String,
}

impl OgCard {
    /// Missing title falls back to "Blog Post", author to the site owner and
    /// date to today's date.
    pub fn new(
        title: Option<&str>,
        author: Option<&str>,
        date: Option<&str>,
        owner: &str,
        subtitle: &str,
        site: &str,
        today: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.unwrap_or(OG_DEFAULT_TITLE).to_string(),
            author: author.unwrap_or(owner).to_string(),
            subtitle: subtitle.to_string(),
            date: date
                .map(str::to_string)
                .unwrap_or_else(|| today.format("%-m/%-d/%Y").to_string()),
            site: site.to_string(),
        }
    }

    pub fn title_size(&self) -> u32 {
        match self.title.chars().count() {
            len if len > 50 => 48,
            len if len > 30 => 56,
            _ => 64,
        }
    }

    pub fn render(&self) -> String {
        let title_size = self.title_size();
        let title = escape_html(&self.title);
        let author = escape_html(&self.author);
        let subtitle = escape_html(&self.subtitle.to_uppercase());
        let date = escape_html(&self.date);
        let site = escape_html(&self.site);

        format!(
            r##"<svg width="{OG_WIDTH}" height="{OG_HEIGHT}" viewBox="0 0 {OG_WIDTH} {OG_HEIGHT}" fill="none" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <radialGradient id="mesh-a" cx="20%" cy="-20%" r="80%">
      <stop offset="0%" stop-color="rgb(120,119,198)" stop-opacity="0.4"/>
      <stop offset="50%" stop-color="rgb(120,119,198)" stop-opacity="0"/>
    </radialGradient>
    <radialGradient id="mesh-b" cx="80%" cy="50%" r="70%">
      <stop offset="0%" stop-color="rgb(78,68,206)" stop-opacity="0.3"/>
      <stop offset="50%" stop-color="rgb(78,68,206)" stop-opacity="0"/>
    </radialGradient>
    <radialGradient id="mesh-c" cx="10%" cy="90%" r="50%">
      <stop offset="0%" stop-color="rgb(255,99,132)" stop-opacity="0.2"/>
      <stop offset="50%" stop-color="rgb(255,99,132)" stop-opacity="0"/>
    </radialGradient>
    <linearGradient id="accent" x1="0" x2="1" y1="0" y2="0">
      <stop offset="0%" stop-color="#6366f1"/>
      <stop offset="33%" stop-color="#8b5cf6"/>
      <stop offset="66%" stop-color="#ec4899"/>
      <stop offset="100%" stop-color="#6366f1"/>
    </linearGradient>
    <pattern id="grid" width="60" height="60" patternUnits="userSpaceOnUse">
      <path d="M 60 0 L 0 0 0 60" fill="none" stroke="rgba(255,255,255,0.03)" stroke-width="1"/>
    </pattern>
  </defs>
  <rect width="{OG_WIDTH}" height="{OG_HEIGHT}" fill="#0a0a0a"/>
  <rect width="{OG_WIDTH}" height="{OG_HEIGHT}" fill="url(#mesh-a)"/>
  <rect width="{OG_WIDTH}" height="{OG_HEIGHT}" fill="url(#mesh-b)"/>
  <rect width="{OG_WIDTH}" height="{OG_HEIGHT}" fill="url(#mesh-c)"/>
  <rect width="{OG_WIDTH}" height="{OG_HEIGHT}" fill="url(#grid)"/>
  <rect width="{OG_WIDTH}" height="4" fill="url(#accent)"/>
  <text x="64" y="84" font-family="Segoe UI,Helvetica,Arial,sans-serif" font-weight="700" font-size="24" fill="white">{author}</text>
  <text x="64" y="108" font-family="Segoe UI,Helvetica,Arial,sans-serif" font-weight="500" font-size="14" letter-spacing="0.7" fill="rgba(255,255,255,0.5)">{subtitle}</text>
  <rect x="936" y="56" width="200" height="40" rx="20" fill="rgba(255,255,255,0.08)" stroke="rgba(255,255,255,0.1)"/>
  <circle cx="960" cy="76" r="4" fill="#22c55e"/>
  <text x="976" y="81" font-family="Segoe UI,Helvetica,Arial,sans-serif" font-weight="500" font-size="14" fill="rgba(255,255,255,0.7)">{date}</text>
  <foreignObject x="64" y="180" width="900" height="300">
    <div xmlns="http://www.w3.org/1999/xhtml" style="font-family: Segoe UI,Helvetica,Arial,sans-serif; font-size: {title_size}px; font-weight: 800; line-height: 1.15; letter-spacing: -0.03em; color: white;">{title}</div>
  </foreignObject>
  <rect x="64" y="500" width="64" height="4" rx="2" fill="url(#accent)"/>
  <rect x="144" y="500" width="32" height="4" rx="2" fill="rgba(255,255,255,0.2)"/>
  <rect x="192" y="500" width="16" height="4" rx="2" fill="rgba(255,255,255,0.1)"/>
  <text x="1136" y="590" text-anchor="end" font-family="Segoe UI,Helvetica,Arial,sans-serif" font-weight="600" font-size="16" fill="rgba(255,255,255,0.6)">{site}</text>
</svg>"##
        )
    }
}

/// Commit activity rendered as a week-per-column grid, Sunday on top.
pub fn render_heatmap(weeks: &[CommitActivityWeek]) -> String {
    let columns = weeks.len().max(1) as u32;
    let pitch = CELL_SIZE + CELL_GAP;
    let width = HEATMAP_PADDING * 2 + columns * pitch - CELL_GAP;
    let height = HEATMAP_PADDING * 2 + 7 * pitch - CELL_GAP + HEATMAP_LEGEND_HEIGHT;

    let max_day = weeks
        .iter()
        .flat_map(|week| week.days.iter().copied())
        .max()
        .unwrap_or(0);
    let total: u32 = weeks.iter().map(|week| week.total).sum();

    let mut cells = String::with_capacity(weeks.len() * 7 * 90);
    for (column, week) in weeks.iter().enumerate() {
        let x = HEATMAP_PADDING + column as u32 * pitch;
        for (row, count) in week.days.iter().enumerate() {
            let y = HEATMAP_PADDING + row as u32 * pitch;
            let color = HEATMAP_LEVELS[level(*count, max_day)];
            let _ = write!(
                cells,
                "<rect x=\"{x}\" y=\"{y}\" width=\"{CELL_SIZE}\" height=\"{CELL_SIZE}\" rx=\"2\" fill=\"{color}\"><title>{count} commits</title></rect>"
            );
        }
    }

    let legend_y = height - HEATMAP_PADDING;
    format!(
        "<svg width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" fill=\"none\" xmlns=\"http://www.w3.org/2000/svg\">\n  <rect width=\"{width}\" height=\"{height}\" rx=\"6\" fill=\"#0d1117\"/>\n  {cells}\n  <text x=\"{HEATMAP_PADDING}\" y=\"{legend_y}\" font-family=\"Segoe UI,Helvetica,Arial,sans-serif\" font-size=\"12\" fill=\"#8b949e\">{total} commits in the last {} weeks</text>\n</svg>",
        weeks.len()
    )
}

fn level(count: u32, max_day: u32) -> usize {
    if count == 0 || max_day == 0 {
        return 0;
    }
    let ratio = f64::from(count) / f64::from(max_day);
    (ratio * 4.0).ceil().clamp(1.0, 4.0) as usize
}
