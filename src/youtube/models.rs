use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub id: SearchItemId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
    pub video_id: Option<String>,
}

/// Items stay raw until [`VideoListResponse::into_items`], so one bad entry
/// cannot sink the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<Value>,
}

impl VideoListResponse {
    /// Decodes each item on its own, skipping entries without an id.
    pub fn into_items(self) -> Vec<VideoItem> {
        self.items
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<VideoItem>(raw) {
                Ok(item) if !item.id.is_empty() => Some(item),
                Ok(_) => {
                    debug!("video item without id skipped");
                    None
                }
                Err(e) => {
                    debug!("malformed video item skipped: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// One entry of a `videos.list` response, kept close to the wire shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoItem {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient")]
    pub snippet: Snippet,
    #[serde(deserialize_with = "lenient")]
    pub content_details: ContentDetails,
    #[serde(deserialize_with = "lenient")]
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snippet {
    #[serde(deserialize_with = "lenient_opt_string")]
    pub published_at: Option<String>,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub channel_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub channel_title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentDetails {
    #[serde(deserialize_with = "lenient_opt_string")]
    pub duration: Option<String>,
}

/// Counts arrive as decimal strings; anything goes, coercion happens later.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub view_count: Option<Value>,
    pub like_count: Option<Value>,
    pub comment_count: Option<Value>,
}

/// One listing page reduced to what the fetcher needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

impl From<SearchListResponse> for SearchPage {
    fn from(value: SearchListResponse) -> Self {
        Self {
            video_ids: value
                .items
                .into_iter()
                .filter_map(|item| item.id.video_id)
                .filter(|id| !id.is_empty())
                .collect(),
            next_page_token: value.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelItem {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient")]
    pub snippet: ChannelSnippet,
    #[serde(deserialize_with = "lenient")]
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelSnippet {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelContentDetails {
    #[serde(deserialize_with = "lenient")]
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelatedPlaylists {
    #[serde(deserialize_with = "lenient_opt_string")]
    pub uploads: Option<String>,
}

/// Where a channel keeps its uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUploads {
    pub channel_id: String,
    pub title: String,
    pub playlist_id: String,
}

impl ChannelListResponse {
    pub fn first_id(self) -> Option<String> {
        self.items
            .into_iter()
            .map(|item| item.id)
            .find(|id| !id.is_empty())
    }

    pub fn first_uploads(self) -> Option<ChannelUploads> {
        self.items.into_iter().find_map(|item| {
            let playlist_id = item
                .content_details
                .related_playlists
                .uploads
                .filter(|p| !p.is_empty())?;
            Some(ChannelUploads {
                channel_id: item.id,
                title: item.snippet.title,
                playlist_id,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlaylistItem {
    #[serde(deserialize_with = "lenient")]
    snippet: PlaylistSnippet,
    #[serde(deserialize_with = "lenient")]
    content_details: PlaylistContentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlaylistSnippet {
    #[serde(deserialize_with = "lenient_opt_string")]
    published_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlaylistContentDetails {
    #[serde(deserialize_with = "lenient_opt_string")]
    video_id: Option<String>,
    #[serde(deserialize_with = "lenient_opt_string")]
    video_published_at: Option<String>,
}

/// One uploaded video as listed by its channel's uploads playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub video_id: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPage {
    pub uploads: Vec<Upload>,
    pub next_page_token: Option<String>,
}

impl From<PlaylistItemListResponse> for PlaylistPage {
    fn from(value: PlaylistItemListResponse) -> Self {
        let uploads = value
            .items
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<PlaylistItem>(raw).ok())
            .filter_map(|item| {
                let video_id = item.content_details.video_id.filter(|v| !v.is_empty())?;
                let published_at = item
                    .content_details
                    .video_published_at
                    .or(item.snippet.published_at)
                    .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                    .map(|t| t.with_timezone(&Utc));
                Some(Upload {
                    video_id,
                    published_at,
                })
            })
            .collect();
        Self {
            uploads,
            next_page_token: value.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Strings as sent, numbers stringified, anything else (null included) empty.
fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// A nested object that fails to decode falls back to its default.
fn lenient<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(de)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
