pub mod channels;
pub mod client;
pub mod fetcher;
pub mod models;

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::errors::FetchError;
use models::{ChannelUploads, PlaylistPage, SearchPage, VideoItem};

/// Shape of a `search.list` query. Fixed parameters (type, order,
/// duration class, page size) are added by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub published_after: DateTime<Utc>,
    pub published_before: DateTime<Utc>,
    pub region_code: Option<String>,
    pub relevance_language: Option<String>,
    pub category_id: Option<String>,
    pub text: Option<String>,
    pub safe_search: Option<String>,
}

impl SearchQuery {
    /// Window covering the `hours` before `now`.
    pub fn last_hours(hours: i64, now: DateTime<Utc>) -> Self {
        Self {
            published_after: now - Duration::hours(hours),
            published_before: now,
            region_code: None,
            relevance_language: None,
            category_id: None,
            text: None,
            safe_search: None,
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("publishedAfter", rfc3339(self.published_after)),
            ("publishedBefore", rfc3339(self.published_before)),
        ];
        let optional = [
            ("regionCode", &self.region_code),
            ("relevanceLanguage", &self.relevance_language),
            ("videoCategoryId", &self.category_id),
            ("q", &self.text),
            ("safeSearch", &self.safe_search),
        ];
        for (key, value) in optional {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((key, v.to_string()));
            }
        }
        params
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The remote calls the pipeline depends on.
pub trait VideoApi {
    fn search_page(
        &self,
        query: &SearchQuery,
        page_token: Option<&str>,
    ) -> Result<SearchPage, FetchError>;

    /// Looks up at most [`fetcher::DETAIL_CHUNK`] ids in one call.
    fn video_details(&self, ids: &[String]) -> Result<Vec<VideoItem>, FetchError>;

    /// Channel id behind a `@handle`, if the handle exists.
    fn channel_for_handle(&self, handle: &str) -> Result<Option<String>, FetchError>;

    fn channel_uploads(&self, channel_id: &str) -> Result<Option<ChannelUploads>, FetchError>;

    /// One page of a playlist, newest first for an uploads playlist.
    fn playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage, FetchError>;
}
