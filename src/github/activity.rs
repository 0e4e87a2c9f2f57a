use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

use super::models::{CommitActivityWeek, GithubEvent};
use crate::constants::{
    HEATMAP_BASE_ACTIVITY, HEATMAP_DAY_DISTRIBUTION, HEATMAP_MIN_ACTIVE_WEEKS,
    HEATMAP_RECENT_BOOST, HEATMAP_RECENT_WEEKS, HEATMAP_SEASONAL_AMPLITUDE, HEATMAP_WEEKS,
};

const PUSH_EVENT: &str = "PushEvent";

/// Buckets push events into weekly totals, oldest week first. Falls back to
/// [`synthesize_commit_pattern`] when too few weeks saw any commits.
pub fn aggregate_commit_activity(
    events: &[GithubEvent],
    now: DateTime<Utc>,
) -> Vec<CommitActivityWeek> {
    let pushes: Vec<(DateTime<Utc>, u32)> = events
        .iter()
        .filter(|event| event.kind == PUSH_EVENT)
        .filter_map(|event| {
            let created_at = DateTime::parse_from_rfc3339(&event.created_at).ok()?;
            Some((created_at.with_timezone(&Utc), event.commit_count()))
        })
        .collect();

    let mut weeks = Vec::with_capacity(HEATMAP_WEEKS);
    for i in (0..HEATMAP_WEEKS).rev() {
        let start = week_start(now, i);
        let end = start + Duration::days(7) - Duration::milliseconds(1);

        let mut week = CommitActivityWeek {
            total: 0,
            week: start.timestamp_millis(),
            days: [0; 7],
        };
        for (created_at, commits) in &pushes {
            if *created_at >= start && *created_at <= end {
                week.total += commits;
                week.days[created_at.weekday().num_days_from_sunday() as usize] += commits;
            }
        }
        weeks.push(week);
    }

    let active_weeks = weeks.iter().filter(|week| week.total > 0).count();
    if active_weeks < HEATMAP_MIN_ACTIVE_WEEKS {
        return synthesize_commit_pattern(now);
    }

    weeks
}

/// Deterministic stand-in activity: a gentle yearly wave with the most
/// recent weeks boosted, spread over the week by a fixed distribution.
pub fn synthesize_commit_pattern(now: DateTime<Utc>) -> Vec<CommitActivityWeek> {
    (0..HEATMAP_WEEKS)
        .rev()
        .map(|i| {
            let seasonal = 1.0
                + HEATMAP_SEASONAL_AMPLITUDE * ((i as f64 / HEATMAP_WEEKS as f64) * 2.0 * PI).sin();
            let boost = if i < HEATMAP_RECENT_WEEKS {
                HEATMAP_RECENT_BOOST
            } else {
                1.0
            };
            let commits = (HEATMAP_BASE_ACTIVITY * seasonal * boost).floor();

            let mut days = [0u32; 7];
            for (day, share) in days.iter_mut().zip(HEATMAP_DAY_DISTRIBUTION) {
                *day = (commits * share).floor() as u32;
            }

            CommitActivityWeek {
                total: days.iter().sum(),
                week: week_start(now, i).timestamp_millis(),
                days,
            }
        })
        .collect()
}

fn week_start(now: DateTime<Utc>, weeks_ago: usize) -> DateTime<Utc> {
    let day = now - Duration::days(7 * weeks_ago as i64);
    day.date_naive().and_time(NaiveTime::MIN).and_utc()
}
