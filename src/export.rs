use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::errors::Result;
use crate::keywords::{KeywordEntry, KeywordStats};
use crate::normalize::VideoRecord;

/// Lets spreadsheet apps detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const ROW_HEADER: [&str; 12] = [
    "rank",
    "published",
    "title",
    "channel",
    "view_count",
    "views_per_hour",
    "hours_since_upload",
    "length",
    "like_count",
    "comment_count",
    "url",
    "video_id",
];

pub fn write_rows_csv<W: Write>(mut out: W, rows: &[&VideoRecord]) -> Result<()> {
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(ROW_HEADER)?;
    for (i, row) in rows.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            row.published_label(),
            row.title.clone(),
            row.channel.clone(),
            row.view_count.to_string(),
            opt_number(row.views_per_hour, 1),
            opt_number(row.hours_since_upload, 2),
            row.length.clone(),
            row.like_count.to_string(),
            row.comment_count.to_string(),
            row.url.clone(),
            row.video_id.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

const KEYWORD_HEADER: [&str; 8] = [
    "rank",
    "keyword",
    "count",
    "videos",
    "channel_overlap",
    "top_view_count",
    "top_channel",
    "top_url",
];

/// Keyword table; spread columns stay blank for keywords missing from `stats`.
pub fn write_keywords_csv<W: Write>(
    mut out: W,
    keywords: &[KeywordEntry],
    stats: &[KeywordStats],
) -> Result<()> {
    let by_keyword: HashMap<&str, &KeywordStats> =
        stats.iter().map(|s| (s.keyword.as_str(), s)).collect();
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(KEYWORD_HEADER)?;
    for (i, entry) in keywords.iter().enumerate() {
        let spread = by_keyword.get(entry.keyword.as_str());
        writer.write_record([
            (i + 1).to_string(),
            entry.keyword.clone(),
            entry.count.to_string(),
            spread.map(|s| s.videos.to_string()).unwrap_or_default(),
            spread.map(|s| s.channel_overlap.to_string()).unwrap_or_default(),
            spread.map(|s| s.top_view_count.to_string()).unwrap_or_default(),
            spread.map(|s| s.top_channel.clone()).unwrap_or_default(),
            spread.map(|s| s.top_url.clone()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_rows(path: &Path, rows: &[&VideoRecord]) -> Result<PathBuf> {
    let file = create(path)?;
    write_rows_csv(file, rows)?;
    info!(path = %path.display(), rows = rows.len(), "exported rows");
    Ok(path.to_path_buf())
}

pub fn export_keywords(
    path: &Path,
    keywords: &[KeywordEntry],
    stats: &[KeywordStats],
) -> Result<PathBuf> {
    let file = create(path)?;
    write_keywords_csv(file, keywords, stats)?;
    info!(path = %path.display(), keywords = keywords.len(), "exported keywords");
    Ok(path.to_path_buf())
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// `<dir>/<prefix>_YYYYMMDD_HHMMSS.csv`
pub fn timestamped_path(dir: &Path, prefix: &str, now: DateTime<Utc>) -> PathBuf {
    dir.join(format!("{}_{}.csv", prefix, now.format("%Y%m%d_%H%M%S")))
}

fn opt_number(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_default()
}

/// Thousands separators: 1234567 -> "1,234,567".
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

/// Fixed-width text table for terminal output.
pub fn render_table(rows: &[&VideoRecord]) -> String {
    let mut out = format!(
        "{:>3}  {:<19}  {:>11}  {:>10}  {:>5}  {}\n",
        "#", "published", "views", "views/h", "len", "title / channel"
    );
    for (i, row) in rows.iter().enumerate() {
        let rate = row
            .views_per_hour
            .map(|v| group_digits(v.round() as u64))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>3}  {:<19}  {:>11}  {:>10}  {:>5}  {} · {}\n",
            i + 1,
            row.published_label(),
            group_digits(row.view_count),
            rate,
            row.length,
            truncate_chars(&row.title.replace('\n', " "), 48),
            truncate_chars(&row.channel, 20),
        ));
    }
    out
}
