pub mod lexicon;
pub mod stats;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::normalize::VideoRecord;
pub use lexicon::Lexicon;
pub use stats::{KeywordStats, stats_for};

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://\S+|www\.\S+").expect("static regex compiles"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+").expect("static regex compiles"));
static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#@_/\\]").expect("static regex compiles"));
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9A-Za-z가-힣]+").expect("static regex compiles"));

const MIN_TOKEN_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub count: usize,
}

/// Turns free text into ranked keywords.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    lexicon: Lexicon,
}

impl KeywordExtractor {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Accepted tokens of `text`, in order of appearance.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned = self.pre_clean(text);
        TOKEN_RE
            .find_iter(&cleaned)
            .filter_map(|m| self.normalize_token(m.as_str()))
            .collect()
    }

    fn pre_clean(&self, text: &str) -> String {
        let text = URL_RE.replace_all(text, " ");
        let text = EMAIL_RE.replace_all(&text, " ");
        let text = self.lexicon.blank_banned(&text);
        SEPARATOR_RE.replace_all(&text, " ").to_lowercase()
    }

    /// Runs one raw token through stripping and rejection.
    pub fn normalize_token(&self, raw: &str) -> Option<String> {
        let token = raw.trim().to_lowercase();
        if token.is_empty() || token.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if self.lexicon.is_publisher(&token) || self.lexicon.is_numeric_counter(&token) {
            return None;
        }

        let mut token = token;
        if is_hangul(&token) {
            token = strip_longest(&token, self.lexicon.suffixes());
            token = strip_longest(&token, self.lexicon.particles());
        }
        if self.rejected(&token) {
            return None;
        }

        if let Some(rest) = token.strip_suffix("tv") {
            if rest.is_empty() || self.lexicon.is_publisher(rest) || self.rejected(rest) {
                return None;
            }
            token = rest.to_string();
        }

        if is_latin(&token) && char_len(&token) <= 2 {
            return None;
        }
        Some(token)
    }

    fn rejected(&self, token: &str) -> bool {
        char_len(token) < MIN_TOKEN_CHARS || self.lexicon.is_stopword(token)
    }

    /// Counts every accepted token across `texts`.
    ///
    /// Sorted by descending count; equal counts keep first-seen order.
    pub fn count<'a, I>(&self, texts: I) -> Vec<KeywordEntry>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<KeywordEntry> = Vec::new();
        for text in texts {
            for token in self.tokenize(text) {
                match index.get(&token) {
                    Some(&i) => entries[i].count += 1,
                    None => {
                        index.insert(token.clone(), entries.len());
                        entries.push(KeywordEntry {
                            keyword: token,
                            count: 1,
                        });
                    }
                }
            }
        }
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }

    pub fn top_k<'a, I>(&self, texts: I, k: usize) -> Vec<KeywordEntry>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = self.count(texts);
        entries.truncate(k);
        entries
    }

    /// Top keywords over title + description of every record.
    pub fn from_records(&self, records: &[VideoRecord], k: usize) -> Vec<KeywordEntry> {
        let texts: Vec<String> = records.iter().map(VideoRecord::text).collect();
        self.top_k(texts.iter().map(String::as_str), k)
    }
}

fn strip_longest(token: &str, endings: &[String]) -> String {
    let len = char_len(token);
    endings
        .iter()
        .find(|e| token.ends_with(e.as_str()) && len >= char_len(e) + MIN_TOKEN_CHARS)
        .map(|e| token[..token.len() - e.len()].to_string())
        .unwrap_or_else(|| token.to_string())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn is_hangul(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| ('가'..='힣').contains(&c))
}

fn is_latin(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> KeywordExtractor {
        KeywordExtractor::new(Lexicon::builtin().unwrap())
    }

    #[test]
    fn test_headline_keyword_counted_and_marker_dropped() {
        let ex = extractor();
        let titles = [
            "[속보] 예산안 국회 통과",
            "속보 예산안 처리 지연",
            "예산안 속보 정리",
        ];
        let top = ex.top_k(titles, 10);
        assert_eq!(
            top[0],
            KeywordEntry {
                keyword: "예산안".to_string(),
                count: 3
            }
        );
        assert!(top.iter().all(|e| e.keyword != "속보"));
    }

    #[test]
    fn test_particles_fold_inflections() {
        let ex = extractor();
        let top = ex.top_k(["흉기난동이 발생", "흉기난동을 막아", "흉기난동에서 부상"], 3);
        assert_eq!(top[0].keyword, "흉기난동");
        assert_eq!(top[0].count, 3);
    }

    #[test]
    fn test_suffix_then_particle() {
        let ex = extractor();
        assert_eq!(ex.normalize_token("탄핵관련"), Some("탄핵".to_string()));
        assert_eq!(ex.normalize_token("탄핵중이"), Some("탄핵중".to_string()));
        assert_eq!(ex.normalize_token("예산안을"), Some("예산안".to_string()));
    }

    #[test]
    fn test_strip_keeps_two_chars() {
        let ex = extractor();
        // "국가" would become "국"; stripping is skipped instead.
        assert_eq!(ex.normalize_token("국가"), Some("국가".to_string()));
        assert_eq!(ex.normalize_token("가"), None);
    }

    #[test]
    fn test_too_short_after_tv_strip() {
        let ex = extractor();
        assert_eq!(ex.normalize_token("xtv"), None);
        assert_eq!(ex.normalize_token("연합뉴스tv"), None);
        assert_eq!(ex.normalize_token("경제tv"), Some("경제".to_string()));
    }

    #[test]
    fn test_short_latin_rejected() {
        let ex = extractor();
        assert_eq!(ex.normalize_token("ai"), None);
        assert_eq!(ex.normalize_token("ab"), None);
        assert_eq!(ex.normalize_token("nasa"), Some("nasa".to_string()));
        assert_eq!(ex.normalize_token("the"), None);
    }

    #[test]
    fn test_numbers_and_counters_rejected() {
        let ex = extractor();
        assert_eq!(ex.normalize_token("2026"), None);
        assert_eq!(ex.normalize_token("3명"), None);
        assert_eq!(ex.normalize_token("100억원"), None);
        assert_eq!(ex.normalize_token("24h"), None);
        assert_eq!(ex.normalize_token("g20"), Some("g20".to_string()));
    }

    #[test]
    fn test_publishers_rejected() {
        let ex = extractor();
        assert!(ex.tokenize("YTN SBS 연합뉴스TV jtbc").is_empty());
    }

    #[test]
    fn test_urls_and_mail_removed() {
        let ex = extractor();
        let tokens = ex.tokenize("https://youtu.be/abcdef 참고 www.example.com a@b.com 반도체");
        assert_eq!(tokens, vec!["참고", "반도체"]);
    }

    #[test]
    fn test_separators_split_tokens() {
        let ex = extractor();
        assert_eq!(ex.tokenize("반도체/수출_규제"), vec!["반도체", "수출", "규제"]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let ex = extractor();
        let top = ex.top_k(["반도체 환율 금리", "금리 환율 반도체"], 10);
        let words: Vec<&str> = top.iter().map(|e| e.keyword.as_str()).collect();
        assert_eq!(words, vec!["반도체", "환율", "금리"]);
    }

    #[test]
    fn test_top_k_truncates() {
        let ex = extractor();
        assert_eq!(ex.top_k(["반도체 환율 금리 수출"], 2).len(), 2);
        assert!(ex.top_k(["반도체"], 0).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let ex = extractor();
        let texts = ["예산안 처리 지연", "흉기난동 용산", "반도체 수출 규제 예산안"];
        assert_eq!(ex.top_k(texts, 10), ex.top_k(texts, 10));
    }

    #[test]
    fn test_empty_corpus() {
        let ex = extractor();
        assert!(ex.top_k(Vec::<&str>::new(), 10).is_empty());
        assert!(ex.tokenize("").is_empty());
    }
}
