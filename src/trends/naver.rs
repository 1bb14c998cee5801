use std::collections::HashSet;

use scraper::{Html, Selector};
use tracing::debug;

use crate::errors::FetchError;
use crate::keywords::KeywordExtractor;
use super::{HttpFetcher, PageFetcher, TrendSource};

pub const PAGES: [&str; 3] = [
    "https://news.naver.com/main/ranking/popularDay.naver",
    "https://news.naver.com/section/100",
    "https://news.naver.com/",
];

const HEADLINE_SELECTORS: [&str; 6] = [
    "ol.ranking_list a",
    "div.rankingnews_box a",
    "ul.sa_list a.sa_text_title",
    "a.sa_text_title_link",
    "a.cluster_text_headline",
    "a[href*='/read?']",
];

/// Frequency-ranked words taken from the list.
const RANKED_WORDS: usize = 50;

/// Headline words from the Naver news ranking pages.
#[derive(Debug, Clone)]
pub struct NaverNews<F = HttpFetcher> {
    pages: Vec<String>,
    http: F,
    extractor: KeywordExtractor,
}

impl<F: PageFetcher> NaverNews<F> {
    pub fn new(http: F, extractor: KeywordExtractor) -> Self {
        Self::with_pages(http, extractor, PAGES.iter().map(|p| p.to_string()).collect())
    }

    pub fn with_pages(http: F, extractor: KeywordExtractor, pages: Vec<String>) -> Self {
        Self {
            pages,
            http,
            extractor,
        }
    }
}

impl<F: PageFetcher> TrendSource for NaverNews<F> {
    fn name(&self) -> &'static str {
        "naver"
    }

    /// Tries each page in turn and ranks the first one that yields headlines.
    fn fetch(&self) -> Result<Vec<String>, FetchError> {
        let mut last_err = FetchError::Empty;
        for url in &self.pages {
            match self.http.get_text(url) {
                Ok(html) => {
                    let titles = extract_headlines(&html);
                    debug!(%url, titles = titles.len(), "naver page");
                    if !titles.is_empty() {
                        return Ok(rank_headlines(&self.extractor, &titles, RANKED_WORDS));
                    }
                }
                Err(e) => {
                    debug!(%url, "naver page failed: {}", e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

/// Headline texts matched by the selector list, first occurrence only.
pub fn extract_headlines(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for sel_str in HEADLINE_SELECTORS {
        let Ok(selector) = Selector::parse(sel_str) else {
            continue;
        };
        for el in document.select(&selector) {
            let text = el.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() || !seen.insert(text.clone()) {
                continue;
            }
            titles.push(text);
        }
    }
    titles
}

/// Tokenizes headlines and returns the most frequent words.
pub fn rank_headlines(extractor: &KeywordExtractor, titles: &[String], limit: usize) -> Vec<String> {
    extractor
        .top_k(titles.iter().map(String::as_str), limit)
        .into_iter()
        .map(|e| e.keyword)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::Lexicon;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned bodies by URL; unknown URLs answer 503.
    struct CannedPages {
        bodies: HashMap<&'static str, &'static str>,
        requested: RefCell<Vec<String>>,
    }

    impl CannedPages {
        fn new(bodies: &[(&'static str, &'static str)]) -> Self {
            Self {
                bodies: bodies.iter().copied().collect(),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageFetcher for CannedPages {
        fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            self.bodies
                .get(url)
                .map(|b| b.to_string())
                .ok_or(FetchError::Status {
                    status: 503,
                    body: String::new(),
                })
        }
    }

    fn pages(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn extractor() -> KeywordExtractor {
        KeywordExtractor::new(Lexicon::builtin().unwrap())
    }

    const RANKING: &str = r#"<html><body>
<div class="rankingnews_box">
  <ol class="ranking_list">
    <li><a href="/read?oid=1">  예산안 국회   통과 </a></li>
    <li><a href="/read?oid=2">예산안 처리 지연</a></li>
    <li><a href="/read?oid=3">흉기난동 용산</a></li>
  </ol>
</div>
</body></html>"#;

    const SECTION: &str = r#"<html><body>
<ul class="sa_list">
  <li><a class="sa_text_title" href="/a"><strong>반도체 수출 회복</strong></a></li>
</ul>
<a class="cluster_text_headline">환율 급등</a>
</body></html>"#;

    #[test]
    fn test_ranking_page_headlines() {
        let titles = extract_headlines(RANKING);
        assert_eq!(
            titles,
            vec!["예산안 국회 통과", "예산안 처리 지연", "흉기난동 용산"]
        );
    }

    #[test]
    fn test_section_page_headlines() {
        let titles = extract_headlines(SECTION);
        assert_eq!(titles, vec!["반도체 수출 회복", "환율 급등"]);
    }

    #[test]
    fn test_no_headlines() {
        assert!(extract_headlines("<html><p>점검 중</p></html>").is_empty());
    }

    #[test]
    fn test_rank_headlines() {
        let ranked = rank_headlines(&extractor(), &extract_headlines(RANKING), 3);
        assert_eq!(ranked[0], "예산안");
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_fetch_falls_through_to_next_page() {
        let canned = CannedPages::new(&[("https://b.test/", RANKING)]);
        let naver = NaverNews::with_pages(
            canned,
            extractor(),
            pages(&["https://a.test/", "https://b.test/", "https://c.test/"]),
        );
        let words = naver.fetch().unwrap();
        assert_eq!(words[0], "예산안");
        assert_eq!(
            *naver.http.requested.borrow(),
            vec!["https://a.test/", "https://b.test/"]
        );
    }

    #[test]
    fn test_fetch_skips_pages_without_headlines() {
        let canned = CannedPages::new(&[
            ("https://a.test/", "<html><p>점검 중</p></html>"),
            ("https://b.test/", SECTION),
        ]);
        let naver = NaverNews::with_pages(canned, extractor(), pages(&["https://a.test/", "https://b.test/"]));
        let words = naver.fetch().unwrap();
        assert!(words.contains(&"반도체".to_string()));
    }

    #[test]
    fn test_fetch_reports_last_error() {
        let canned = CannedPages::new(&[("https://b.test/", "<html></html>")]);
        let naver = NaverNews::with_pages(canned, extractor(), pages(&["https://a.test/", "https://b.test/"]));
        assert!(matches!(
            naver.fetch(),
            Err(FetchError::Status { status: 503, .. })
        ));

        let none = NaverNews::with_pages(CannedPages::new(&[]), extractor(), Vec::new());
        assert!(matches!(none.fetch(), Err(FetchError::Empty)));
    }
}
