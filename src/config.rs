use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::errors::{Result, ShortsError};
use crate::pipeline::RankBy;
use crate::trends::TrendMode;
use crate::trends::matcher::MatcherKind;

pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

pub struct AppPaths {
    pub base_dir: PathBuf,
    pub config_file: PathBuf,
    pub quota_json: PathBuf,
    pub quota_db: PathBuf,
    pub lexicon_file: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl AppPaths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .expect("Could not determine home directory")
            .join(".shorts");
        Self::from_base(base)
    }

    pub fn from_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.toml"),
            quota_json: base.join("quota_usage.json"),
            quota_db: base.join("quota.db"),
            lexicon_file: base.join("lexicon.toml"),
            export_dir: base.join("exports"),
            base_dir: base,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuotaBackend {
    #[default]
    Json,
    Sqlite,
}

/// User settings read from `config.toml`. Every field has a default, so a
/// missing file or a partial file is fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub region_code: String,
    pub relevance_language: String,
    pub window_hours: i64,
    pub max_duration_secs: u64,
    pub daily_budget: u64,
    pub quota_timezone: String,
    pub quota_reset_hour: u32,
    pub display_timezone: String,
    pub quota_backend: QuotaBackend,
    pub top_keywords: usize,
    pub top_rows: usize,
    pub rank_by: RankBy,
    pub trend_source: TrendMode,
    /// Default channel list for channel scans.
    pub channels: Vec<String>,
    pub matcher: MatcherKind,
    pub jaccard_threshold: f64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            region_code: "KR".to_string(),
            relevance_language: "ko".to_string(),
            window_hours: 48,
            max_duration_secs: 60,
            daily_budget: 10_000,
            quota_timezone: "America/Los_Angeles".to_string(),
            quota_reset_hour: 0,
            display_timezone: "Asia/Seoul".to_string(),
            quota_backend: QuotaBackend::Json,
            top_keywords: 10,
            top_rows: 20,
            rank_by: RankBy::ViewsPerHour,
            trend_source: TrendMode::Auto,
            channels: Vec::new(),
            matcher: MatcherKind::Substring,
            jaccard_threshold: 0.8,
            request_timeout_secs: 20,
        }
    }
}

impl Settings {
    /// Loads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ShortsError::Io(e)),
        };
        let settings: Settings = toml::from_str(&text)
            .map_err(|e| ShortsError::Config(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quota_reset_hour > 23 {
            return Err(ShortsError::Config(format!(
                "quota_reset_hour must be 0-23, got {}",
                self.quota_reset_hour
            )));
        }
        if self.window_hours <= 0 {
            return Err(ShortsError::Config("window_hours must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.jaccard_threshold) {
            return Err(ShortsError::Config(
                "jaccard_threshold must be within 0.0-1.0".to_string(),
            ));
        }
        self.quota_tz()?;
        self.display_tz()?;
        Ok(())
    }

    pub fn quota_tz(&self) -> Result<Tz> {
        parse_tz(&self.quota_timezone)
    }

    pub fn display_tz(&self) -> Result<Tz> {
        parse_tz(&self.display_timezone)
    }
}

fn parse_tz(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ShortsError::Config(format!("unknown timezone: {}", name)))
}

/// Reads the API key from the environment (after `.env` has been loaded).
pub fn api_key_from_env() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ShortsError::InvalidInput(format!(
            "{} is not set; export it or add it to .env",
            API_KEY_ENV
        ))),
    }
}
