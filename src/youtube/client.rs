use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::FetchError;
use super::fetcher::{DETAIL_CHUNK, MAX_PAGE_SIZE};
use super::models::{
    ChannelListResponse, ChannelUploads, PlaylistItemListResponse, PlaylistPage,
    SearchListResponse, SearchPage, VideoItem, VideoListResponse,
};
use super::{SearchQuery, VideoApi};

const ERROR_BODY_LIMIT: usize = 200;

/// Blocking client for the YouTube Data API v3.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl YouTubeClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()?;
        read_json(response)
    }
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let body: String = response
            .text()
            .unwrap_or_default()
            .chars()
            .take(ERROR_BODY_LIMIT)
            .collect();
        return Err(FetchError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let text = response.text()?;
    Ok(serde_json::from_str(&text)?)
}

impl VideoApi for YouTubeClient {
    fn search_page(
        &self,
        query: &SearchQuery,
        page_token: Option<&str>,
    ) -> Result<SearchPage, FetchError> {
        let mut params = query.params();
        params.extend([
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("order", "date".to_string()),
            ("videoDuration", "short".to_string()),
            ("maxResults", MAX_PAGE_SIZE.to_string()),
        ]);
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        let raw: SearchListResponse = self.get("search", &params)?;
        Ok(raw.into())
    }

    fn video_details(&self, ids: &[String]) -> Result<Vec<VideoItem>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = &ids[..ids.len().min(DETAIL_CHUNK)];
        let params = [
            ("part", "snippet,contentDetails,statistics".to_string()),
            ("id", ids.join(",")),
            ("maxResults", DETAIL_CHUNK.to_string()),
        ];
        let raw: VideoListResponse = self.get("videos", &params)?;
        Ok(raw.into_items())
    }

    fn channel_for_handle(&self, handle: &str) -> Result<Option<String>, FetchError> {
        let params = [
            ("part", "id".to_string()),
            ("forHandle", handle.trim_start_matches('@').to_string()),
        ];
        let raw: ChannelListResponse = self.get("channels", &params)?;
        Ok(raw.first_id())
    }

    fn channel_uploads(&self, channel_id: &str) -> Result<Option<ChannelUploads>, FetchError> {
        let params = [
            ("part", "snippet,contentDetails".to_string()),
            ("id", channel_id.to_string()),
        ];
        let raw: ChannelListResponse = self.get("channels", &params)?;
        Ok(raw.first_uploads())
    }

    fn playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage, FetchError> {
        let mut params = vec![
            ("part", "snippet,contentDetails".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", MAX_PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        let raw: PlaylistItemListResponse = self.get("playlistItems", &params)?;
        Ok(raw.into())
    }
}
