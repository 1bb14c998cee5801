use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").expect("static regex compiles"));

/// Default cutoff for [`JaccardMatcher`].
pub const DEFAULT_JACCARD_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    #[default]
    Substring,
    Jaccard,
}

/// Decides whether a local keyword and an external trend refer to the
/// same thing. Both arguments are already normalized.
pub trait KeywordMatcher {
    fn matches(&self, local: &str, external: &str) -> bool;
}

/// Either form contained in the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl KeywordMatcher for SubstringMatcher {
    fn matches(&self, local: &str, external: &str) -> bool {
        !local.is_empty()
            && !external.is_empty()
            && (external.contains(local) || local.contains(external))
    }
}

/// Character-set overlap at or above `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct JaccardMatcher {
    pub threshold: f64,
}

impl Default for JaccardMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_JACCARD_THRESHOLD,
        }
    }
}

impl KeywordMatcher for JaccardMatcher {
    fn matches(&self, local: &str, external: &str) -> bool {
        !local.is_empty() && !external.is_empty() && jaccard(local, external) >= self.threshold
    }
}

pub fn build(kind: MatcherKind, threshold: f64) -> Box<dyn KeywordMatcher> {
    match kind {
        MatcherKind::Substring => Box::new(SubstringMatcher),
        MatcherKind::Jaccard => Box::new(JaccardMatcher { threshold }),
    }
}

/// Lowercases and drops whitespace and punctuation.
pub fn normalize_keyword(word: &str) -> String {
    NON_WORD_RE.replace_all(&word.to_lowercase(), "").into_owned()
}

/// |A ∩ B| / |A ∪ B| over the two strings' character sets.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a: HashSet<char> = a.chars().collect();
    let b: HashSet<char> = b.chars().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Local keywords that match any external trend, deduplicated, in local order.
pub fn hot_intersection(
    matcher: &dyn KeywordMatcher,
    local: &[String],
    external: &[String],
) -> Vec<String> {
    let external: Vec<String> = external
        .iter()
        .map(|w| normalize_keyword(w))
        .filter(|w| !w.is_empty())
        .collect();
    let mut seen = HashSet::new();
    let mut hot = Vec::new();
    for word in local {
        let norm = normalize_keyword(word);
        if norm.is_empty() || !seen.insert(norm.clone()) {
            continue;
        }
        if external.iter().any(|ext| matcher.matches(&norm, ext)) {
            hot.push(word.clone());
        }
    }
    hot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_local_inside_external_phrase() {
        let hot = hot_intersection(
            &SubstringMatcher,
            &strings(&["흉기난동"]),
            &strings(&["용산 흉기난동 사건"]),
        );
        assert_eq!(hot, vec!["흉기난동"]);
    }

    #[test]
    fn test_external_inside_local() {
        let hot = hot_intersection(
            &SubstringMatcher,
            &strings(&["예산안처리", "환율"]),
            &strings(&["예산안"]),
        );
        assert_eq!(hot, vec!["예산안처리"]);
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_keyword(" Iran-Israel War! "), "iranisraelwar");
        assert_eq!(normalize_keyword("용산 흉기난동"), "용산흉기난동");
        let hot = hot_intersection(
            &SubstringMatcher,
            &strings(&["Iran"]),
            &strings(&["IRAN - Israel"]),
        );
        assert_eq!(hot, vec!["Iran"]);
    }

    #[test]
    fn test_local_order_and_dedup() {
        let hot = hot_intersection(
            &SubstringMatcher,
            &strings(&["금리", "환율", "반도체", "금리"]),
            &strings(&["반도체 수출", "기준금리 인하"]),
        );
        assert_eq!(hot, vec!["금리", "반도체"]);
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!SubstringMatcher.matches("", "abc"));
        assert!(!SubstringMatcher.matches("abc", ""));
        let hot = hot_intersection(&SubstringMatcher, &strings(&["!!", "금리"]), &strings(&["--"]));
        assert!(hot.is_empty());
    }

    #[test]
    fn test_no_external_no_hot() {
        assert!(hot_intersection(&SubstringMatcher, &strings(&["금리"]), &[]).is_empty());
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard("abc", "abc"), 1.0);
        assert_eq!(jaccard("ab", "cd"), 0.0);
        assert_eq!(jaccard("abcd", "abce"), 0.6);
        assert_eq!(jaccard("", ""), 0.0);
    }

    #[test]
    fn test_jaccard_matcher_is_stricter() {
        let m = JaccardMatcher::default();
        assert!(m.matches("예산안", "안예산"));
        assert!(!m.matches("흉기난동", "용산흉기난동사건"));
    }

    #[test]
    fn test_build_from_kind() {
        let m = build(MatcherKind::Jaccard, 0.5);
        assert!(m.matches("abcd", "abce"));
        let m = build(MatcherKind::Substring, 0.5);
        assert!(!m.matches("abcd", "abce"));
    }
}
