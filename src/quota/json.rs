use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ShortsError};
use super::{QuotaState, QuotaStore};

/// Quota record kept as one JSON document on disk.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader never sees half a document.
pub struct JsonQuotaStore {
    path: PathBuf,
}

impl JsonQuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QuotaStore for JsonQuotaStore {
    fn load(&self) -> Result<Option<QuotaState>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ShortsError::Io(e)),
        };
        let state = serde_json::from_str(&text)?;
        Ok(Some(state))
    }

    fn save(&self, state: &QuotaState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::{QuotaLedger, QuotaPolicy};
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonQuotaStore::new(dir.path().join("quota_usage.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonQuotaStore::new(dir.path().join("nested/quota_usage.json"));
        let state = QuotaState {
            date: "2026-10-18".to_string(),
            used: 301,
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
        assert!(!dir.path().join("nested/quota_usage.json.tmp").exists());
    }

    #[test]
    fn test_reads_legacy_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quota_usage.json");
        fs::write(&path, r#"{"pt_date": "2026-10-18", "used": 7}"#).unwrap();
        let store = JsonQuotaStore::new(&path);
        let state = store.load().unwrap().unwrap();
        assert_eq!(state.date, "2026-10-18");
        assert_eq!(state.used, 7);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quota_usage.json");
        fs::write(&path, "not json").unwrap();
        let store = JsonQuotaStore::new(&path);
        assert!(matches!(store.load(), Err(ShortsError::Json(_))));
    }

    #[test]
    fn test_ledger_over_corrupt_file_fails_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quota_usage.json");
        fs::write(&path, "{{{").unwrap();
        let mut ledger =
            QuotaLedger::new(Box::new(JsonQuotaStore::new(&path)), QuotaPolicy::default());
        let now = utc("2026-10-18T19:00:00Z");
        assert_eq!(ledger.used_at(now), 0);
        // The corrupt record is replaced, undercounting whatever it held.
        assert_eq!(ledger.add_at(100, 1, now), 100);
        assert_eq!(ledger.used_at(now), 100);
    }

    #[test]
    fn test_ledger_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quota_usage.json");
        let now = utc("2026-10-18T19:00:00Z");
        {
            let mut ledger =
                QuotaLedger::new(Box::new(JsonQuotaStore::new(&path)), QuotaPolicy::default());
            ledger.add_at(100, 2, now);
        }
        let ledger =
            QuotaLedger::new(Box::new(JsonQuotaStore::new(&path)), QuotaPolicy::default());
        assert_eq!(ledger.used_at(now), 200);
    }
}
