pub mod google;
pub mod matcher;
pub mod naver;

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{info, warn};

use crate::errors::FetchError;
use crate::keywords::{KeywordExtractor, Lexicon};
use google::GoogleTrends;
use matcher::jaccard;
use naver::NaverNews;

/// Keywords kept from any trend list.
pub const TREND_LIMIT: usize = 10;
pub const TREND_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "Mozilla/5.0";

/// Which trend sources to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrendMode {
    /// Google, then Naver, then local keywords.
    #[default]
    Auto,
    Google,
    Naver,
    /// Local keywords only.
    Youtube,
}

impl fmt::Display for TrendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendMode::Auto => "auto",
            TrendMode::Google => "google",
            TrendMode::Naver => "naver",
            TrendMode::Youtube => "youtube",
        };
        f.write_str(s)
    }
}

/// One external keyword list.
pub trait TrendSource {
    fn name(&self) -> &'static str;
    fn fetch(&self) -> Result<Vec<String>, FetchError>;
}

/// Fetches one page of text.
pub trait PageFetcher {
    fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain GET with a browser user agent.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http })
    }
}

impl PageFetcher for HttpFetcher {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        let body = response.text()?;
        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(body)
    }
}

#[derive(Debug, Serialize)]
pub struct FailedAttempt {
    pub source: String,
    #[serde(serialize_with = "as_display")]
    pub error: FetchError,
}

fn as_display<S: Serializer>(err: &FetchError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

#[derive(Debug, Serialize)]
pub struct TrendOutcome {
    pub keywords: Vec<String>,
    /// Name of the source that produced `keywords`.
    pub source: String,
    pub attempts: Vec<FailedAttempt>,
}

impl TrendOutcome {
    pub fn is_fallback(&self) -> bool {
        self.source == LOCAL_SOURCE
    }
}

pub const LOCAL_SOURCE: &str = "youtube";

/// External sources tried in order, with local keywords as the last resort.
pub struct TrendChain {
    sources: Vec<Box<dyn TrendSource>>,
}

impl TrendChain {
    pub fn new(sources: Vec<Box<dyn TrendSource>>) -> Self {
        Self { sources }
    }

    pub fn for_mode(mode: TrendMode, http: &HttpFetcher, extractor: &KeywordExtractor) -> Self {
        let mut sources: Vec<Box<dyn TrendSource>> = Vec::new();
        if matches!(mode, TrendMode::Auto | TrendMode::Google) {
            for source in GoogleTrends::all(http) {
                sources.push(Box::new(source));
            }
        }
        if matches!(mode, TrendMode::Auto | TrendMode::Naver) {
            sources.push(Box::new(NaverNews::new(http.clone(), extractor.clone())));
        }
        Self::new(sources)
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// First source whose cleaned list is non-empty wins. Failures are
    /// recorded and never propagate.
    pub fn resolve(&self, lexicon: &Lexicon, local: &[String]) -> TrendOutcome {
        let mut attempts = Vec::new();
        for source in &self.sources {
            let result = source
                .fetch()
                .map(|words| clean_words(lexicon, &words, TREND_LIMIT))
                .and_then(|words| {
                    if words.is_empty() {
                        Err(FetchError::Empty)
                    } else {
                        Ok(words)
                    }
                });
            match result {
                Ok(keywords) => {
                    info!(source = source.name(), count = keywords.len(), "trend keywords");
                    return TrendOutcome {
                        keywords,
                        source: source.name().to_string(),
                        attempts,
                    };
                }
                Err(error) => {
                    warn!(source = source.name(), "trend source failed: {}", error);
                    attempts.push(FailedAttempt {
                        source: source.name().to_string(),
                        error,
                    });
                }
            }
        }

        let keywords = clean_words(lexicon, local, TREND_LIMIT);
        info!(count = keywords.len(), "using local keywords as trends");
        TrendOutcome {
            keywords,
            source: LOCAL_SOURCE.to_string(),
            attempts,
        }
    }
}

/// Drops trend stopwords and short Latin words, folds near duplicates,
/// keeps the first `limit`.
pub fn clean_words(lexicon: &Lexicon, words: &[String], limit: usize) -> Vec<String> {
    let kept: Vec<String> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .filter(|w| !lexicon.is_trend_stopword(&w.to_lowercase()))
        .filter(|w| !(w.chars().all(|c| c.is_ascii_alphabetic()) && w.chars().count() <= 2))
        .map(String::from)
        .collect();
    let mut out = dedup_similar(&kept, matcher::DEFAULT_JACCARD_THRESHOLD);
    out.truncate(limit);
    out
}

/// Keeps the first of any group of words that are equal, nested, or share
/// at least `threshold` of their characters.
pub fn dedup_similar(words: &[String], threshold: f64) -> Vec<String> {
    let mut exact = HashSet::new();
    let mut kept: Vec<String> = Vec::new();
    for word in words {
        if !exact.insert(word.clone()) {
            continue;
        }
        let similar = kept
            .iter()
            .any(|k| k.contains(word.as_str()) || word.contains(k.as_str()) || jaccard(k, word) >= threshold);
        if !similar {
            kept.push(word.clone());
        }
    }
    kept
}
