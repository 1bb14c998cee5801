pub mod json;
pub mod schema;
pub mod sqlite;

use std::cell::RefCell;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::Result;

/// Persisted usage for one reference-timezone day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    #[serde(alias = "pt_date")]
    pub date: String,
    #[serde(default)]
    pub used: u64,
}

/// Whole-document persistence for the quota counter.
///
/// Implementations read and write the full record at once. Nothing here
/// locks across processes: two writers racing on the same backend lose one
/// update (last write wins). The counter is an estimate, not a bill.
pub trait QuotaStore {
    fn load(&self) -> Result<Option<QuotaState>>;
    fn save(&self, state: &QuotaState) -> Result<()>;
}

/// Keeps the record in process memory.
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    state: RefCell<Option<QuotaState>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: QuotaState) -> Self {
        Self {
            state: RefCell::new(Some(state)),
        }
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn load(&self) -> Result<Option<QuotaState>> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &QuotaState) -> Result<()> {
        *self.state.borrow_mut() = Some(state.clone());
        Ok(())
    }
}

/// Unit cost per call of each Data API method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall {
    Search,
    Videos,
    Channels,
    PlaylistItems,
}

impl ApiCall {
    pub fn cost(self) -> u64 {
        match self {
            ApiCall::Search => 100,
            ApiCall::Videos => 1,
            ApiCall::Channels => 1,
            ApiCall::PlaylistItems => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiCall::Search => "search.list",
            ApiCall::Videos => "videos.list",
            ApiCall::Channels => "channels.list",
            ApiCall::PlaylistItems => "playlistItems.list",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    pub daily_budget: u64,
    pub timezone: Tz,
    pub reset_hour: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            daily_budget: 10_000,
            timezone: chrono_tz::America::Los_Angeles,
            reset_hour: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotaSnapshot {
    pub day: String,
    pub used: u64,
    pub budget: u64,
    pub remaining: u64,
    pub percent_used: f64,
    pub next_reset: DateTime<Utc>,
}

/// Estimated daily usage of the remote API, charged per attempted call.
///
/// Reads and writes are fail-open: a store that cannot be read counts as
/// zero usage, and a failed write is logged and dropped.
pub struct QuotaLedger {
    store: Box<dyn QuotaStore>,
    policy: QuotaPolicy,
}

impl QuotaLedger {
    pub fn new(store: Box<dyn QuotaStore>, policy: QuotaPolicy) -> Self {
        Self { store, policy }
    }

    pub fn in_memory(policy: QuotaPolicy) -> Self {
        Self::new(Box::new(MemoryQuotaStore::new()), policy)
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// The quota day `now` falls in. A non-midnight reset hour shifts the
    /// boundary with it.
    pub fn day_key(&self, now: DateTime<Utc>) -> NaiveDate {
        let local = now.with_timezone(&self.policy.timezone);
        (local - Duration::hours(i64::from(self.policy.reset_hour))).date_naive()
    }

    pub fn get_used(&self, today: NaiveDate) -> u64 {
        let key = format_day(today);
        match self.store.load() {
            Ok(Some(state)) if state.date == key => state.used,
            Ok(Some(state)) => {
                debug!(stored = %state.date, today = %key, "quota record is from another day");
                0
            }
            Ok(None) => 0,
            Err(e) => {
                warn!("quota store unreadable, assuming nothing used: {}", e);
                0
            }
        }
    }

    pub fn used_at(&self, now: DateTime<Utc>) -> u64 {
        self.get_used(self.day_key(now))
    }

    pub fn used(&self) -> u64 {
        self.used_at(Utc::now())
    }

    /// Adds `cost * calls` (at least one call) and writes through.
    /// Returns the new running total for the day.
    pub fn add_at(&mut self, cost: u64, calls: u64, now: DateTime<Utc>) -> u64 {
        let today = self.day_key(now);
        let used = self
            .get_used(today)
            .saturating_add(cost.saturating_mul(calls.max(1)));
        let state = QuotaState {
            date: format_day(today),
            used,
        };
        if let Err(e) = self.store.save(&state) {
            warn!("failed to persist quota usage ({} units): {}", used, e);
        }
        used
    }

    pub fn add(&mut self, cost: u64, calls: u64) -> u64 {
        self.add_at(cost, calls, Utc::now())
    }

    /// Charges one call against the quota day `now` falls in.
    pub fn charge_at(&mut self, call: ApiCall, now: DateTime<Utc>) -> u64 {
        let used = self.add_at(call.cost(), 1, now);
        debug!(call = call.as_str(), cost = call.cost(), used, "quota charged");
        used
    }


    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        self.policy.daily_budget.saturating_sub(self.used_at(now))
    }

    pub fn remaining(&self) -> u64 {
        self.remaining_at(Utc::now())
    }

    /// Next reset instant strictly after `now`.
    pub fn next_reset_after(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        let local_date = now.with_timezone(&self.policy.timezone).date_naive();
        let today = self.reset_on(local_date);
        if today.with_timezone(&Utc) > now {
            return today;
        }
        match local_date.succ_opt() {
            Some(tomorrow) => self.reset_on(tomorrow),
            None => today,
        }
    }

    pub fn next_reset(&self) -> DateTime<Tz> {
        self.next_reset_after(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> QuotaSnapshot {
        let day = self.day_key(now);
        let used = self.get_used(day);
        let budget = self.policy.daily_budget;
        let percent_used = if budget == 0 {
            100.0
        } else {
            (used as f64 / budget as f64 * 100.0).min(100.0)
        };
        QuotaSnapshot {
            day: format_day(day),
            used,
            budget,
            remaining: budget.saturating_sub(used),
            percent_used,
            next_reset: self.next_reset_after(now).with_timezone(&Utc),
        }
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        self.snapshot_at(Utc::now())
    }

    fn reset_on(&self, date: NaiveDate) -> DateTime<Tz> {
        let tz = self.policy.timezone;
        let time = NaiveTime::from_hms_opt(self.policy.reset_hour.min(23), 0, 0)
            .unwrap_or(NaiveTime::MIN);
        let naive = date.and_time(time);
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => t,
            LocalResult::Ambiguous(earliest, _) => earliest,
            // Reset hour falls in a DST gap; use the wall-clock hour after it.
            LocalResult::None => tz
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
        }
    }
}

fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
