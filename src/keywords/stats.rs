use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::normalize::VideoRecord;
use super::{KeywordEntry, KeywordExtractor};

/// How widely one keyword spreads across the scanned videos.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordStats {
    pub keyword: String,
    /// Videos mentioning the keyword, each counted once.
    pub videos: usize,
    /// Distinct channels among those videos.
    pub channel_overlap: usize,
    pub top_view_count: u64,
    pub top_channel: String,
    pub top_url: String,
}

impl KeywordExtractor {
    /// Per-keyword spread over `records`. A keyword repeated inside one video
    /// counts once for it.
    ///
    /// Sorted by channel overlap, then top view count, both descending;
    /// ties keep first-seen order.
    pub fn keyword_stats(&self, records: &[VideoRecord]) -> Vec<KeywordStats> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut stats: Vec<KeywordStats> = Vec::new();
        let mut channels: Vec<HashSet<&str>> = Vec::new();

        for record in records {
            let channel = channel_key(record);
            let mut seen = HashSet::new();
            for token in self.tokenize(&record.text()) {
                if !seen.insert(token.clone()) {
                    continue;
                }
                let i = *index.entry(token.clone()).or_insert_with(|| {
                    stats.push(KeywordStats {
                        keyword: token,
                        videos: 0,
                        channel_overlap: 0,
                        top_view_count: 0,
                        top_channel: String::new(),
                        top_url: String::new(),
                    });
                    channels.push(HashSet::new());
                    stats.len() - 1
                });

                let entry = &mut stats[i];
                entry.videos += 1;
                if entry.videos == 1 || record.view_count > entry.top_view_count {
                    entry.top_view_count = record.view_count;
                    entry.top_channel = record.channel.clone();
                    entry.top_url = record.url.clone();
                }
                channels[i].insert(channel);
            }
        }

        for (entry, seen) in stats.iter_mut().zip(&channels) {
            entry.channel_overlap = seen.len();
        }
        stats.sort_by(|a, b| {
            b.channel_overlap
                .cmp(&a.channel_overlap)
                .then(b.top_view_count.cmp(&a.top_view_count))
        });
        stats
    }
}

/// Channel identity: the id when known, else the display name.
fn channel_key(record: &VideoRecord) -> &str {
    record.channel_id.as_deref().unwrap_or(&record.channel)
}

/// Stats for `keywords`, in their order. Keywords without stats are skipped.
pub fn stats_for(keywords: &[KeywordEntry], stats: &[KeywordStats]) -> Vec<KeywordStats> {
    let by_keyword: HashMap<&str, &KeywordStats> =
        stats.iter().map(|s| (s.keyword.as_str(), s)).collect();
    keywords
        .iter()
        .filter_map(|k| by_keyword.get(k.keyword.as_str()).map(|s| (*s).clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::Lexicon;

    fn record(id: &str, title: &str, channel: &str, views: u64) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            view_count: views,
            like_count: 0,
            comment_count: 0,
            duration_seconds: 30,
            length: "00:30".to_string(),
            channel: channel.to_string(),
            channel_id: Some(format!("UC-{channel}")),
            url: format!("https://www.youtube.com/watch?v={id}"),
            published_at: None,
            hours_since_upload: None,
            views_per_hour: None,
        }
    }

    fn extractor() -> KeywordExtractor {
        KeywordExtractor::new(Lexicon::builtin().unwrap())
    }

    fn find<'a>(stats: &'a [KeywordStats], keyword: &str) -> &'a KeywordStats {
        stats.iter().find(|s| s.keyword == keyword).unwrap()
    }

    #[test]
    fn test_two_channel_spread() {
        let records = vec![
            record("a", "예산안 예산안 예산안 처리", "뉴스A", 500),
            record("b", "예산안 태풍", "뉴스B", 9_000),
            record("c", "태풍 북상", "뉴스A", 300),
        ];
        let stats = extractor().keyword_stats(&records);

        let budget = find(&stats, "예산안");
        assert_eq!(budget.videos, 2);
        assert_eq!(budget.channel_overlap, 2);
        assert_eq!(budget.top_view_count, 9_000);
        assert_eq!(budget.top_channel, "뉴스B");
        assert_eq!(budget.top_url, "https://www.youtube.com/watch?v=b");

        let storm = find(&stats, "태풍");
        assert_eq!(storm.videos, 2);
        assert_eq!(storm.channel_overlap, 2);
        assert_eq!(storm.top_view_count, 9_000);

        let north = find(&stats, "북상");
        assert_eq!(north.channel_overlap, 1);
        assert_eq!(north.top_channel, "뉴스A");

        // Two-channel keywords first; 예산안 was seen before 태풍.
        assert_eq!(stats[0].keyword, "예산안");
        assert_eq!(stats[1].keyword, "태풍");
        assert!(stats[2..].iter().all(|s| s.channel_overlap == 1));
    }

    #[test]
    fn test_same_channel_counts_once() {
        let records = vec![
            record("a", "환율 급등", "경제채널", 10),
            record("b", "환율 하락", "경제채널", 20),
        ];
        let stats = extractor().keyword_stats(&records);
        let fx = find(&stats, "환율");
        assert_eq!(fx.videos, 2);
        assert_eq!(fx.channel_overlap, 1);
        assert_eq!(fx.top_url, "https://www.youtube.com/watch?v=b");
    }

    #[test]
    fn test_stats_for_follows_keyword_order() {
        let records = vec![
            record("a", "예산안 태풍", "뉴스A", 1),
            record("b", "태풍", "뉴스B", 2),
        ];
        let stats = extractor().keyword_stats(&records);
        let keywords = vec![
            KeywordEntry {
                keyword: "예산안".to_string(),
                count: 1,
            },
            KeywordEntry {
                keyword: "없음".to_string(),
                count: 1,
            },
            KeywordEntry {
                keyword: "태풍".to_string(),
                count: 2,
            },
        ];
        let picked = stats_for(&keywords, &stats);
        let names: Vec<&str> = picked.iter().map(|s| s.keyword.as_str()).collect();
        assert_eq!(names, vec!["예산안", "태풍"]);
    }
}
