use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Settings;
use crate::errors::{Result, ShortsError};
use crate::keywords::{KeywordEntry, KeywordExtractor, KeywordStats, stats_for};
use crate::normalize::{NormalizeOptions, VideoRecord, normalize_all};
use crate::quota::{QuotaLedger, QuotaSnapshot};
use crate::trends::matcher::{KeywordMatcher, hot_intersection};
use crate::trends::{TrendChain, TrendOutcome};
use crate::youtube::channels::{ChannelRef, collect_channel_uploads};
use crate::youtube::fetcher::{collect_video_ids, resolve_details};
use crate::youtube::{SearchQuery, VideoApi};

/// Canned listing query for the news board.
pub const TREND_QUERY: &str = "뉴스 OR 정치 OR 속보 OR 브리핑";
/// News & Politics.
pub const NEWS_CATEGORY: &str = "25";
pub const PAGE_CHOICES: [usize; 3] = [1, 2, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RankBy {
    #[default]
    ViewsPerHour,
    Views,
    Likes,
    Comments,
}

impl fmt::Display for RankBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankBy::ViewsPerHour => f.write_str("views/hour"),
            RankBy::Views => f.write_str("views"),
            RankBy::Likes => f.write_str("likes"),
            RankBy::Comments => f.write_str("comments"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// News category with the canned query.
    #[default]
    Trend,
    /// Free-text query supplied by the user.
    Keyword,
    /// Recent uploads of the listed channels.
    Channels,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub mode: ScanMode,
    pub query: Option<String>,
    /// Ids, handles or channel URLs for channel mode.
    pub channels: Vec<String>,
    pub pages: usize,
    pub window_hours: i64,
    pub max_duration_secs: u64,
    pub region_code: String,
    pub relevance_language: String,
    pub top_keywords: usize,
}

impl ScanOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: ScanMode::Trend,
            query: None,
            channels: settings.channels.clone(),
            pages: 1,
            window_hours: settings.window_hours,
            max_duration_secs: settings.max_duration_secs,
            region_code: settings.region_code.clone(),
            relevance_language: settings.relevance_language.clone(),
            top_keywords: settings.top_keywords,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mode == ScanMode::Keyword
            && self.query.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(ShortsError::InvalidInput(
                "keyword mode needs a non-empty --query".to_string(),
            ));
        }
        if self.mode == ScanMode::Channels
            && !self.channels.iter().any(|c| ChannelRef::parse(c).is_some())
        {
            return Err(ShortsError::InvalidInput(
                "channels mode needs at least one --channel".to_string(),
            ));
        }
        if !PAGE_CHOICES.contains(&self.pages) {
            return Err(ShortsError::InvalidInput(format!(
                "--pages must be one of 1, 2, 4; got {}",
                self.pages
            )));
        }
        if self.window_hours <= 0 {
            return Err(ShortsError::InvalidInput(
                "--window-hours must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn search_query(&self, now: DateTime<Utc>) -> SearchQuery {
        let base = SearchQuery {
            region_code: Some(self.region_code.clone()),
            relevance_language: Some(self.relevance_language.clone()),
            ..SearchQuery::last_hours(self.window_hours, now)
        };
        match self.mode {
            ScanMode::Trend => SearchQuery {
                category_id: Some(NEWS_CATEGORY.to_string()),
                text: Some(TREND_QUERY.to_string()),
                safe_search: Some("moderate".to_string()),
                ..base
            },
            ScanMode::Keyword => SearchQuery {
                text: self.query.as_ref().map(|q| q.trim().to_string()),
                ..base
            },
            ScanMode::Channels => base,
        }
    }

    pub fn published_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(self.window_hours)
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub mode: ScanMode,
    pub pages: usize,
    pub ids_collected: usize,
    /// Why the listing came up short, if it did.
    pub listing_error: Option<String>,
    /// Every normalized clip; ranking picks the displayed subset.
    pub records: Vec<VideoRecord>,
    pub keywords: Vec<KeywordEntry>,
    /// Spread of each top keyword, same order as `keywords`.
    pub keyword_stats: Vec<KeywordStats>,
    pub trends: TrendOutcome,
    pub hot: Vec<String>,
    pub quota: QuotaSnapshot,
}

impl Report {
    pub fn local_keywords(&self) -> Vec<String> {
        self.keywords.iter().map(|e| e.keyword.clone()).collect()
    }

    pub fn rows(&self, view: &RankOptions) -> Vec<&VideoRecord> {
        rank(&self.records, view)
    }
}

/// Wires the fetch, normalize, extract and trend stages together.
pub struct Pipeline<'a> {
    pub api: &'a dyn VideoApi,
    pub extractor: &'a KeywordExtractor,
    pub trends: &'a TrendChain,
    pub matcher: &'a dyn KeywordMatcher,
    pub display_tz: Tz,
}

impl Pipeline<'_> {
    pub fn run(&self, ledger: &mut QuotaLedger, opts: &ScanOptions) -> Result<Report> {
        self.run_at(ledger, opts, Utc::now())
    }

    pub fn run_at(
        &self,
        ledger: &mut QuotaLedger,
        opts: &ScanOptions,
        now: DateTime<Utc>,
    ) -> Result<Report> {
        opts.validate()?;

        let listing = match opts.mode {
            ScanMode::Channels => collect_channel_uploads(
                self.api,
                ledger,
                &opts.channels,
                opts.published_after(now),
                now,
            ),
            ScanMode::Trend | ScanMode::Keyword => {
                collect_video_ids(self.api, ledger, &opts.search_query(now), opts.pages, now)
            }
        };
        let details = resolve_details(self.api, ledger, &listing.ids, now);
        let ordered = listing.ids.iter().filter_map(|id| details.get(id));
        let records = normalize_all(
            ordered,
            &NormalizeOptions {
                max_duration_secs: opts.max_duration_secs,
                display_tz: self.display_tz,
                now,
            },
        );
        info!(
            ids = listing.ids.len(),
            resolved = details.len(),
            shorts = records.len(),
            "normalized"
        );

        let keywords = self.extractor.from_records(&records, opts.top_keywords);
        let keyword_stats = stats_for(&keywords, &self.extractor.keyword_stats(&records));
        let local: Vec<String> = keywords.iter().map(|e| e.keyword.clone()).collect();
        let trends = self.trends.resolve(self.extractor.lexicon(), &local);
        let hot = hot_intersection(self.matcher, &local, &trends.keywords);

        Ok(Report {
            generated_at: now,
            mode: opts.mode,
            pages: listing.pages,
            ids_collected: listing.ids.len(),
            listing_error: listing.aborted.map(|e| e.to_string()),
            records,
            keywords,
            keyword_stats,
            trends,
            hot,
            quota: ledger.snapshot_at(now),
        })
    }
}

/// How the table is cut from the pool.
#[derive(Debug, Clone, Default)]
pub struct RankOptions {
    pub rank_by: RankBy,
    pub ascending: bool,
    pub top: usize,
    pub filter: Option<String>,
}

/// Filters, sorts and truncates. Records without a rate sort last in
/// either direction.
pub fn rank<'a>(records: &'a [VideoRecord], view: &RankOptions) -> Vec<&'a VideoRecord> {
    let needle = view
        .filter
        .as_deref()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty());
    let mut rows: Vec<&VideoRecord> = records
        .iter()
        .filter(|r| needle.as_deref().is_none_or(|n| matches_filter(r, n)))
        .collect();
    sort_rows(&mut rows, view.rank_by, view.ascending);
    rows.truncate(view.top);
    rows
}

pub fn sort_rows(rows: &mut [&VideoRecord], by: RankBy, ascending: bool) {
    rows.sort_by(|a, b| compare(a, b, by, ascending));
}

fn compare(a: &VideoRecord, b: &VideoRecord, by: RankBy, ascending: bool) -> Ordering {
    let directed = |ord: Ordering| if ascending { ord } else { ord.reverse() };
    match by {
        RankBy::Views => directed(a.view_count.cmp(&b.view_count)),
        RankBy::Likes => directed(a.like_count.cmp(&b.like_count)),
        RankBy::Comments => directed(a.comment_count.cmp(&b.comment_count)),
        RankBy::ViewsPerHour => match (a.views_per_hour, b.views_per_hour) {
            (Some(x), Some(y)) => directed(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Case-insensitive match on title or description. `needle` is lowercase.
pub fn matches_filter(record: &VideoRecord, needle: &str) -> bool {
    record.title.to_lowercase().contains(needle)
        || record.description.to_lowercase().contains(needle)
}
