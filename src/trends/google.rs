use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::FetchError;
use super::{HttpFetcher, PageFetcher, TrendSource};

pub const BASES: [&str; 2] = ["https://trends.google.com", "https://trends.google.co.kr"];

const REALTIME_PATH: &str =
    "/trends/api/realtimetrends?hl=ko&tz=540&cat=all&fi=0&fs=0&geo=KR&ri=300&rs=20";
const DAILY_PATH: &str = "/trends/api/dailytrends?hl=ko&tz=540&geo=KR";
const RSS_PATH: &str = "/trends/trendingsearches/daily/rss?geo=KR&hl=ko";

/// Most titles taken from the RSS feed.
const RSS_LIMIT: usize = 50;

static ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").expect("static regex compiles"));
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("static regex compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Realtime,
    Daily,
    Rss,
}

impl Feed {
    pub const ALL: [Feed; 3] = [Feed::Realtime, Feed::Daily, Feed::Rss];

    fn path(self) -> &'static str {
        match self {
            Feed::Realtime => REALTIME_PATH,
            Feed::Daily => DAILY_PATH,
            Feed::Rss => RSS_PATH,
        }
    }

    pub fn parse(self, body: &str) -> Result<Vec<String>, FetchError> {
        match self {
            Feed::Realtime => parse_realtime(body),
            Feed::Daily => parse_daily(body),
            Feed::Rss => parse_rss(body),
        }
    }
}

/// One Google Trends feed on one host.
#[derive(Debug, Clone)]
pub struct GoogleTrends {
    feed: Feed,
    base: String,
    http: HttpFetcher,
}

impl GoogleTrends {
    pub fn new(feed: Feed, base: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            feed,
            base: base.into(),
            http,
        }
    }

    /// Every feed against every host, in fallback order.
    pub fn all(http: &HttpFetcher) -> Vec<Self> {
        Feed::ALL
            .iter()
            .flat_map(|feed| BASES.iter().map(move |base| (*feed, *base)))
            .map(|(feed, base)| Self::new(feed, base, http.clone()))
            .collect()
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base, self.feed.path())
    }
}

impl TrendSource for GoogleTrends {
    fn name(&self) -> &'static str {
        match self.feed {
            Feed::Realtime => "google-realtime",
            Feed::Daily => "google-daily",
            Feed::Rss => "google-rss",
        }
    }

    fn fetch(&self) -> Result<Vec<String>, FetchError> {
        let body = self.http.get_text(&self.url())?;
        self.feed.parse(&body)
    }
}

/// Drops the `)]}'` guard line Google puts in front of JSON bodies.
pub fn strip_xssi(body: &str) -> &str {
    let trimmed = body.trim_start();
    match trimmed.strip_prefix(")]}'") {
        Some(rest) => rest.trim_start_matches(',').trim_start(),
        None => trimmed,
    }
}

fn parse_json(body: &str) -> Result<Value, FetchError> {
    Ok(serde_json::from_str(strip_xssi(body))?)
}

pub fn parse_realtime(body: &str) -> Result<Vec<String>, FetchError> {
    let root = parse_json(body)?;
    let stories = root
        .pointer("/storySummaries/trendingStories")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse("missing storySummaries.trendingStories".to_string()))?;
    Ok(stories
        .iter()
        .filter_map(|story| story.get("entityNames").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

pub fn parse_daily(body: &str) -> Result<Vec<String>, FetchError> {
    let root = parse_json(body)?;
    let searches = root
        .pointer("/default/trendingSearchesDays/0/trendingSearches")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse("missing default.trendingSearchesDays".to_string()))?;
    Ok(searches
        .iter()
        .filter_map(|s| s.pointer("/title/query").and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

pub fn parse_rss(body: &str) -> Result<Vec<String>, FetchError> {
    if !body.contains("<rss") && !body.contains("<item") {
        return Err(FetchError::Parse("not an rss document".to_string()));
    }
    Ok(ITEM_RE
        .captures_iter(body)
        .filter_map(|cap| cap.get(1))
        .filter_map(|item| TITLE_RE.captures(item.as_str()).and_then(|c| c.get(1)))
        .map(|m| decode_rss_text(m.as_str()))
        .filter(|t| !t.is_empty())
        .take(RSS_LIMIT)
        .collect())
}

fn decode_rss_text(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>")
        .trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
