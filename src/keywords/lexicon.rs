use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::{Result, ShortsError};

const BUILTIN: &str = include_str!("../../data/lexicon.toml");

#[derive(Debug, Deserialize)]
struct RawLexicon {
    version: u32,
    korean: RawKorean,
    filters: RawFilters,
    #[serde(default)]
    trends: RawTrends,
}

#[derive(Debug, Deserialize)]
struct RawKorean {
    suffixes: Vec<String>,
    particles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawFilters {
    stopwords: Vec<String>,
    #[serde(default)]
    english_stopwords: Vec<String>,
    #[serde(default)]
    banned_patterns: Vec<String>,
    publisher_pattern: String,
    numeric_counter_pattern: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrends {
    #[serde(default)]
    stopwords: Vec<String>,
}

/// Word lists and patterns driving keyword extraction.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub version: u32,
    stopwords: HashSet<String>,
    trend_stopwords: HashSet<String>,
    /// Sorted longest first.
    suffixes: Vec<String>,
    /// Sorted longest first.
    particles: Vec<String>,
    banned: Vec<Regex>,
    publisher: Regex,
    numeric_counter: Regex,
}

impl Lexicon {
    /// The lexicon compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN)
    }

    /// Loads `path` when it exists, else the built-in lexicon.
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Self::builtin();
        }
        let text = fs::read_to_string(path)?;
        let lexicon = Self::parse(&text)?;
        info!(path = %path.display(), version = lexicon.version, "loaded lexicon override");
        Ok(lexicon)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawLexicon = toml::from_str(text)
            .map_err(|e| ShortsError::Config(format!("lexicon: {e}")))?;

        let banned = raw
            .filters
            .banned_patterns
            .iter()
            .map(|p| compile(p, true))
            .collect::<Result<Vec<_>>>()?;

        let stopwords = raw
            .filters
            .stopwords
            .iter()
            .chain(&raw.filters.english_stopwords)
            .map(|w| w.to_lowercase())
            .collect();

        let lexicon = Self {
            version: raw.version,
            stopwords,
            trend_stopwords: raw.trends.stopwords.iter().map(|w| w.to_lowercase()).collect(),
            suffixes: longest_first(raw.korean.suffixes),
            particles: longest_first(raw.korean.particles),
            banned,
            publisher: compile(&raw.filters.publisher_pattern, true)?,
            numeric_counter: compile(&raw.filters.numeric_counter_pattern, true)?,
        };
        debug!(
            version = lexicon.version,
            stopwords = lexicon.stopwords.len(),
            banned = lexicon.banned.len(),
            "lexicon ready"
        );
        Ok(lexicon)
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Stopword for trend lists: the general list plus trend-only extras.
    pub fn is_trend_stopword(&self, word: &str) -> bool {
        self.trend_stopwords.contains(word) || self.stopwords.contains(word)
    }

    pub fn is_publisher(&self, token: &str) -> bool {
        self.publisher.is_match(token)
    }

    pub fn is_numeric_counter(&self, token: &str) -> bool {
        self.numeric_counter.is_match(token)
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn particles(&self) -> &[String] {
        &self.particles
    }

    /// Blanks every banned stretch of `text` with a space.
    pub fn blank_banned(&self, text: &str) -> String {
        let mut out = text.to_string();
        for re in &self.banned {
            if re.is_match(&out) {
                out = re.replace_all(&out, " ").into_owned();
            }
        }
        out
    }
}

fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| ShortsError::Config(format!("lexicon pattern {pattern:?}: {e}")))
}

fn longest_first(mut words: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    words.retain(|w| !w.is_empty() && seen.insert(w.clone()));
    words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
version = 7

[korean]
suffixes = ["중", "하기"]
particles = ["이", "에서"]

[filters]
stopwords = ["속보"]
publisher_pattern = '^ytn$'
numeric_counter_pattern = '^\d+명$'
"#;

    #[test]
    fn test_builtin_parses() {
        let lex = Lexicon::builtin().unwrap();
        assert!(lex.version >= 1);
        assert!(lex.is_stopword("속보"));
        assert!(lex.is_stopword("the"));
        assert!(!lex.is_stopword("예산안"));
        assert!(lex.is_publisher("ytn"));
        assert!(lex.is_publisher("연합뉴스tv"));
        assert!(!lex.is_publisher("ytnx"));
        assert!(lex.is_numeric_counter("3명"));
        assert!(lex.is_numeric_counter("10억원"));
        assert!(lex.is_numeric_counter("24h"));
        assert!(!lex.is_numeric_counter("명3"));
    }

    #[test]
    fn test_affixes_sorted_longest_first() {
        let lex = Lexicon::builtin().unwrap();
        let lens: Vec<usize> = lex.suffixes().iter().map(|s| s.chars().count()).collect();
        assert!(lens.windows(2).all(|w| w[0] >= w[1]));
        let lens: Vec<usize> = lex.particles().iter().map(|s| s.chars().count()).collect();
        assert!(lens.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_trend_stopwords_include_general_list() {
        let lex = Lexicon::builtin().unwrap();
        assert!(lex.is_trend_stopword("네이버"));
        assert!(lex.is_trend_stopword("브리핑"));
        assert!(!lex.is_stopword("네이버"));
    }

    #[test]
    fn test_blank_banned() {
        let lex = Lexicon::builtin().unwrap();
        let out = lex.blank_banned("충격 예산안 #태그 [LIVE] ㅋㅋㅋ 12:30");
        assert!(out.contains("예산안"));
        assert!(!out.contains("충격"));
        assert!(!out.contains("태그"));
        assert!(!out.contains("LIVE"));
        assert!(!out.contains("ㅋ"));
        assert!(!out.contains("12:30"));
    }

    #[test]
    fn test_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let lex = Lexicon::load_or_builtin(file.path()).unwrap();
        assert_eq!(lex.version, 7);
        assert_eq!(lex.suffixes(), ["하기", "중"]);
        assert!(!lex.is_trend_stopword("네이버"));
    }

    #[test]
    fn test_missing_override_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let lex = Lexicon::load_or_builtin(&dir.path().join("nope.toml")).unwrap();
        assert!(lex.is_stopword("속보"));
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let text = MINIMAL.replace("'^ytn$'", "'^(ytn$'");
        assert!(matches!(Lexicon::parse(&text), Err(ShortsError::Config(_))));
    }
}
