use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::errors::FetchError;
use crate::quota::{ApiCall, QuotaLedger};
use super::models::VideoItem;
use super::{SearchQuery, VideoApi};

/// Results per listing page.
pub const MAX_PAGE_SIZE: usize = 50;
/// Stop paging once this many ids have been collected.
pub const ID_CEILING: usize = 200;
/// Ids per detail lookup.
pub const DETAIL_CHUNK: usize = 50;

#[derive(Debug, Default)]
pub struct Listing {
    /// Deduplicated, first-seen order.
    pub ids: Vec<String>,
    pub pages: usize,
    /// The last failure that cut the listing short, if any.
    pub aborted: Option<FetchError>,
}

/// Pages through `search.list` for up to `max_pages` pages.
///
/// Every attempted call is charged, including ones that fail. A failed page
/// ends the loop without retry; ids gathered so far are kept.
pub fn collect_video_ids<A: VideoApi + ?Sized>(
    api: &A,
    ledger: &mut QuotaLedger,
    query: &SearchQuery,
    max_pages: usize,
    now: DateTime<Utc>,
) -> Listing {
    let max_pages = max_pages.max(1);
    let mut raw: Vec<String> = Vec::new();
    let mut token: Option<String> = None;
    let mut listing = Listing::default();

    while listing.pages < max_pages {
        ledger.charge_at(ApiCall::Search, now);
        listing.pages += 1;

        let page = match api.search_page(query, token.as_deref()) {
            Ok(page) => page,
            Err(e) => {
                warn!(page = listing.pages, "listing call failed, stopping: {}", e);
                listing.aborted = Some(e);
                break;
            }
        };
        debug!(page = listing.pages, ids = page.video_ids.len(), "listing page");
        raw.extend(page.video_ids);

        token = page.next_page_token;
        if token.is_none() || raw.len() >= ID_CEILING {
            break;
        }
    }

    listing.ids = dedup_stable(raw);
    info!(pages = listing.pages, ids = listing.ids.len(), "collected video ids");
    listing
}

/// Resolves ids through `videos.list` in chunks, one charge per chunk.
///
/// Ids the remote does not return are simply absent. A failed chunk is
/// logged and skipped.
pub fn resolve_details<A: VideoApi + ?Sized>(
    api: &A,
    ledger: &mut QuotaLedger,
    ids: &[String],
    now: DateTime<Utc>,
) -> HashMap<String, VideoItem> {
    let mut out = HashMap::with_capacity(ids.len());
    for (n, chunk) in ids.chunks(DETAIL_CHUNK).enumerate() {
        ledger.charge_at(ApiCall::Videos, now);
        match api.video_details(chunk) {
            Ok(items) => {
                for item in items {
                    out.insert(item.id.clone(), item);
                }
            }
            Err(e) => warn!(chunk = n, size = chunk.len(), "detail lookup failed: {}", e),
        }
    }
    debug!(requested = ids.len(), resolved = out.len(), "resolved details");
    out
}

/// Drops repeats, keeping each id at its first position.
pub fn dedup_stable<I: IntoIterator<Item = String>>(ids: I) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
