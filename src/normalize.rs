use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;

use crate::duration::{format_clock, parse_duration};
use crate::youtube::models::VideoItem;

/// Minimum elapsed time used for rate metrics: one minute.
pub const MIN_HOURS_SINCE_UPLOAD: f64 = 1.0 / 60.0;

/// One short-form clip, flattened for display and ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub duration_seconds: u64,
    pub length: String,
    pub channel: String,
    pub channel_id: Option<String>,
    pub url: String,
    pub published_at: Option<DateTime<Tz>>,
    pub hours_since_upload: Option<f64>,
    pub views_per_hour: Option<f64>,
}

impl VideoRecord {
    /// Title and description joined, as fed to keyword extraction.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    pub fn published_label(&self) -> String {
        self.published_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub max_duration_secs: u64,
    pub display_tz: Tz,
    pub now: DateTime<Utc>,
}

/// Maps one `videos.list` item to a record, or `None` when it is not a
/// short: unknown duration or longer than the ceiling.
pub fn normalize(item: &VideoItem, opts: &NormalizeOptions) -> Option<VideoRecord> {
    let duration_seconds = item
        .content_details
        .duration
        .as_deref()
        .and_then(parse_duration)?;
    if duration_seconds > opts.max_duration_secs {
        return None;
    }

    let view_count = coerce_count(item.statistics.view_count.as_ref());
    let published_utc = item
        .snippet
        .published_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|t| t.with_timezone(&Utc));

    let hours_since_upload = published_utc.map(|t| hours_between(t, opts.now));
    let views_per_hour = hours_since_upload.map(|h| views_per_hour(view_count, h));

    Some(VideoRecord {
        video_id: item.id.clone(),
        title: item.snippet.title.clone(),
        description: item.snippet.description.clone(),
        view_count,
        like_count: coerce_count(item.statistics.like_count.as_ref()),
        comment_count: coerce_count(item.statistics.comment_count.as_ref()),
        duration_seconds,
        length: format_clock(duration_seconds),
        channel: item.snippet.channel_title.clone(),
        channel_id: item.snippet.channel_id.clone().filter(|c| !c.is_empty()),
        url: format!("https://www.youtube.com/watch?v={}", item.id),
        published_at: published_utc.map(|t| t.with_timezone(&opts.display_tz)),
        hours_since_upload,
        views_per_hour,
    })
}

pub fn normalize_all<'a, I>(items: I, opts: &NormalizeOptions) -> Vec<VideoRecord>
where
    I: IntoIterator<Item = &'a VideoItem>,
{
    items
        .into_iter()
        .filter_map(|item| normalize(item, opts))
        .collect()
}

/// Elapsed hours, clamped to one minute (also covers clock skew).
pub fn hours_between(published: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - published).num_milliseconds() as f64 / 3_600_000.0;
    hours.max(MIN_HOURS_SINCE_UPLOAD)
}

/// `views / max(hours, 1/60)`, rounded to one decimal.
pub fn views_per_hour(views: u64, hours: f64) -> f64 {
    let rate = views as f64 / hours.max(MIN_HOURS_SINCE_UPLOAD);
    (rate * 10.0).round() / 10.0
}

/// Counts as sent by the API, or 0 for anything that is not a count.
pub fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as u64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}
