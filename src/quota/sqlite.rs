use chrono::Utc;
use rusqlite::{Connection, params};

use crate::errors::{Result, ShortsError};
use super::schema;
use super::{QuotaState, QuotaStore};

/// Quota record kept as the single row of a SQLite table.
pub struct SqliteQuotaStore {
    conn: Connection,
}

impl SqliteQuotaStore {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute(schema::CREATE_QUOTA_TABLE, [])?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::new(conn)
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl QuotaStore for SqliteQuotaStore {
    fn load(&self) -> Result<Option<QuotaState>> {
        match self.conn.query_row(schema::SELECT_QUOTA, [], |row| {
            let day: String = row.get(0)?;
            let used: i64 = row.get(1)?;
            Ok(QuotaState {
                date: day,
                used: used.max(0) as u64,
            })
        }) {
            Ok(state) => Ok(Some(state)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ShortsError::Storage(e)),
        }
    }

    fn save(&self, state: &QuotaState) -> Result<()> {
        let used = i64::try_from(state.used).unwrap_or(i64::MAX);
        self.conn.execute(
            schema::UPSERT_QUOTA,
            params![state.date, used, Utc::now()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state(date: &str, used: u64) -> QuotaState {
        QuotaState {
            date: date.to_string(),
            used,
        }
    }

    #[test]
    fn test_in_memory_creates_table() {
        let store = SqliteQuotaStore::in_memory().unwrap();
        let count: i64 = store
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = 'quota_usage'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_load_empty() {
        let store = SqliteQuotaStore::in_memory().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = SqliteQuotaStore::in_memory().unwrap();
        store.save(&state("2026-10-18", 201)).unwrap();
        assert_eq!(store.load().unwrap(), Some(state("2026-10-18", 201)));
    }

    #[test]
    fn test_save_replaces_whole_record() {
        let store = SqliteQuotaStore::in_memory().unwrap();
        store.save(&state("2026-10-18", 500)).unwrap();
        store.save(&state("2026-10-19", 1)).unwrap();
        let rows: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM quota_usage", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(store.load().unwrap(), Some(state("2026-10-19", 1)));
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quota.db");
        {
            let store = SqliteQuotaStore::new(Connection::open(&path).unwrap()).unwrap();
            store.save(&state("2026-10-18", 100)).unwrap();
        }
        let store = SqliteQuotaStore::new(Connection::open(&path).unwrap()).unwrap();
        assert_eq!(store.load().unwrap(), Some(state("2026-10-18", 100)));
    }
}
