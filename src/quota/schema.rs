pub const CREATE_QUOTA_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS quota_usage (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        day TEXT NOT NULL,
        used INTEGER NOT NULL,
        updated_at TEXT NOT NULL
    )
";

pub const UPSERT_QUOTA: &str = "
    INSERT INTO quota_usage (id, day, used, updated_at)
    VALUES (1, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        day = excluded.day,
        used = excluded.used,
        updated_at = excluded.updated_at
";

pub const SELECT_QUOTA: &str = "SELECT day, used FROM quota_usage WHERE id = 1";
