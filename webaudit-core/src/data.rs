use crate::audit::content_hash;
use crate::error::{CoreError, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Overwrite any stored record.
    Replace,
    /// Overlay the new fields on the stored record.
    Merge,
}

/// Destination of the per-URL audit records.
pub trait RecordSink {
    fn save(&mut self, identity: &str, record: &Map<String, Value>, mode: SaveMode) -> Result<()>;
}

/// Destination of binary artefacts referenced from records.
pub trait AssetStore {
    /// Store `data` and return its content hash.
    fn upload(&mut self, data: &[u8], filename: &str, mimetype: &str) -> Result<String>;
}

pub trait AuditStore: RecordSink + AssetStore + Send {}

impl<T: RecordSink + AssetStore + Send> AuditStore for T {}

pub struct Database {
    conn: Connection,
    content_type: String,
}

fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

impl Database {
    pub fn drop(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let db = Database {
            conn,
            content_type: "audit".to_string(),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Category under which records are stored.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS audit_records (
    identity TEXT NOT NULL,
    content_type TEXT NOT NULL,
    url TEXT NOT NULL,
    record TEXT NOT NULL,     -- JSON object
    updated_at INTEGER NOT NULL,
    PRIMARY KEY(identity, content_type)
);

CREATE INDEX IF NOT EXISTS idx_audit_records_url ON audit_records(url);

CREATE TABLE IF NOT EXISTS assets (
    hash TEXT PRIMARY KEY,    -- SHA-256 of data
    filename TEXT NOT NULL,
    mimetype TEXT NOT NULL,
    data BLOB NOT NULL,
    created_at INTEGER NOT NULL
);
            ",
        )?;
        Ok(())
    }

    pub fn get_record(&self, identity: &str) -> Result<Option<Map<String, Value>>> {
        let mut stmt = self.conn.prepare(
            "SELECT record FROM audit_records WHERE identity = ?1 AND content_type = ?2",
        )?;
        let raw: Option<String> = stmt
            .query_row(params![identity, &self.content_type], |row| row.get(0))
            .optional()?;

        match raw {
            Some(raw) => match serde_json::from_str(&raw)? {
                Value::Object(record) => Ok(Some(record)),
                other => Err(CoreError::Persistence(format!(
                    "stored record {identity} is not an object: {other}"
                ))),
            },
            None => Ok(None),
        }
    }

    pub fn count_records(&self) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM audit_records WHERE content_type = ?1",
            params![&self.content_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_asset(&self, hash: &str) -> Result<Option<(String, String, Vec<u8>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT filename, mimetype, data FROM assets WHERE hash = ?1")?;
        let asset = stmt
            .query_row(params![hash], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;
        Ok(asset)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

impl RecordSink for Database {
    fn save(&mut self, identity: &str, record: &Map<String, Value>, mode: SaveMode) -> Result<()> {
        let record = match mode {
            SaveMode::Replace => record.clone(),
            SaveMode::Merge => {
                let mut stored = self.get_record(identity)?.unwrap_or_default();
                for (key, value) in record {
                    stored.insert(key.clone(), value.clone());
                }
                stored
            }
        };
        let url = record
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let json = serde_json::to_string(&record)?;

        self.conn.execute(
            "INSERT INTO audit_records (identity, content_type, url, record, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(identity, content_type) DO UPDATE SET
                url = excluded.url,
                record = excluded.record,
                updated_at = excluded.updated_at",
            params![identity, &self.content_type, url, json, current_timestamp()],
        )?;
        debug!("Saved record {} ({})", identity, url);
        Ok(())
    }
}

impl AssetStore for Database {
    fn upload(&mut self, data: &[u8], filename: &str, mimetype: &str) -> Result<String> {
        let hash = content_hash(data);
        self.conn.execute(
            "INSERT OR IGNORE INTO assets (hash, filename, mimetype, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&hash, filename, mimetype, data, current_timestamp()],
        )?;
        Ok(hash)
    }
}

/// Logs records instead of storing them.
#[derive(Debug, Default)]
pub struct DryRunSink {
    saved: usize,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> usize {
        self.saved
    }
}

impl RecordSink for DryRunSink {
    fn save(&mut self, identity: &str, record: &Map<String, Value>, _mode: SaveMode) -> Result<()> {
        info!("{}", serde_json::to_string_pretty(record)?);
        debug!("Dry run: record {} not saved", identity);
        self.saved += 1;
        Ok(())
    }
}

impl AssetStore for DryRunSink {
    fn upload(&mut self, data: &[u8], filename: &str, _mimetype: &str) -> Result<String> {
        debug!("Dry run: asset {} ({} bytes) not uploaded", filename, data.len());
        Ok(content_hash(data))
    }
}
