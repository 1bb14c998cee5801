use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::quota::{ApiCall, QuotaLedger};
use super::VideoApi;
use super::fetcher::{Listing, dedup_stable};

static CHANNEL_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)youtube\.com/(channel/|c/|user/|@)([^/?#\s]+)").expect("static regex compiles")
});

/// Uploads kept per channel before paging stops.
pub const UPLOAD_CEILING: usize = 500;

/// A channel as the user typed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `UC…` id, usable as is.
    Id(String),
    /// `@handle`, custom name or legacy user name; costs a lookup.
    Handle(String),
}

impl ChannelRef {
    /// Accepts a bare id, `@handle`, or any `youtube.com/...` channel URL.
    pub fn parse(input: &str) -> Option<Self> {
        let token = input.trim().trim_end_matches(['/', '?', '#']);
        if token.is_empty() {
            return None;
        }
        if let Some(caps) = CHANNEL_URL_RE.captures(token) {
            let key = caps[2].to_string();
            return Some(if caps[1].eq_ignore_ascii_case("channel/") {
                ChannelRef::Id(key)
            } else {
                ChannelRef::Handle(key)
            });
        }
        if is_channel_id(token) {
            return Some(ChannelRef::Id(token.to_string()));
        }
        let handle = token.trim_start_matches('@');
        (!handle.is_empty()).then(|| ChannelRef::Handle(handle.to_string()))
    }
}

fn is_channel_id(token: &str) -> bool {
    token.starts_with("UC")
        && token.len() >= 10
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Splits a pasted list on newlines and commas.
pub fn split_channel_list(text: &str) -> Vec<String> {
    text.split(['\n', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Lists recent uploads of each channel through its uploads playlist.
///
/// Handles cost one `channels.list` call to resolve, every channel one more
/// to find its playlist, and each playlist page one `playlistItems.list`
/// call. Uploads are newest first, so a channel's paging stops at the first
/// upload older than `published_after`. A failed lookup skips that channel.
pub fn collect_channel_uploads<A: VideoApi + ?Sized>(
    api: &A,
    ledger: &mut QuotaLedger,
    inputs: &[String],
    published_after: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Listing {
    let mut listing = Listing::default();

    let mut channel_ids = Vec::new();
    for input in inputs {
        match ChannelRef::parse(input) {
            Some(ChannelRef::Id(id)) => channel_ids.push(id),
            Some(ChannelRef::Handle(handle)) => {
                ledger.charge_at(ApiCall::Channels, now);
                match api.channel_for_handle(&handle) {
                    Ok(Some(id)) => channel_ids.push(id),
                    Ok(None) => warn!(%input, "channel not found"),
                    Err(e) => {
                        warn!(%input, "channel lookup failed: {}", e);
                        listing.aborted = Some(e);
                    }
                }
            }
            None => debug!(%input, "not a channel reference"),
        }
    }

    let mut raw: Vec<String> = Vec::new();
    for channel_id in dedup_stable(channel_ids) {
        ledger.charge_at(ApiCall::Channels, now);
        let uploads = match api.channel_uploads(&channel_id) {
            Ok(Some(uploads)) => uploads,
            Ok(None) => {
                warn!(%channel_id, "no uploads playlist");
                continue;
            }
            Err(e) => {
                warn!(%channel_id, "channel details failed: {}", e);
                listing.aborted = Some(e);
                continue;
            }
        };

        let mut token: Option<String> = None;
        let mut kept = 0;
        loop {
            ledger.charge_at(ApiCall::PlaylistItems, now);
            listing.pages += 1;
            let page = match api.playlist_page(&uploads.playlist_id, token.as_deref()) {
                Ok(page) => page,
                Err(e) => {
                    warn!(%channel_id, "uploads page failed: {}", e);
                    listing.aborted = Some(e);
                    break;
                }
            };

            let mut past_window = false;
            for upload in page.uploads {
                match upload.published_at {
                    Some(t) if t >= published_after => {
                        raw.push(upload.video_id);
                        kept += 1;
                    }
                    Some(_) => past_window = true,
                    None => {}
                }
            }

            token = page.next_page_token;
            if token.is_none() || past_window || kept >= UPLOAD_CEILING {
                break;
            }
        }
        debug!(%channel_id, channel = %uploads.title, kept, "channel uploads");
    }

    listing.ids = dedup_stable(raw);
    info!(pages = listing.pages, ids = listing.ids.len(), "collected channel uploads");
    listing
}
