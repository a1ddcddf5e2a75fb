use chrono::{DateTime, Utc};
use linkmerge_graph::error::Result as GraphResult;
use linkmerge_graph::{GraphError, GroupKey, Marks, PageStore, WebPage};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed page store.
///
/// The connection sits behind a mutex so one `Database` can be shared by
/// every merge worker.
pub struct Database {
    conn: Mutex<Connection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BatchStatus {
    Running,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(BatchStatus::Running),
            "completed" => Some(BatchStatus::Completed),
            "failed" => Some(BatchStatus::Failed),
            _ => None,
        }
    }
}

/// One row of `merge_batches`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    pub id: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: BatchStatus,
    pub input: String,
    pub configuration: Option<String>,
    /// JSON counter snapshot, set once the batch completes
    pub counters: Option<String>,
}

fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_json<T: for<'de> Deserialize<'de>>(idx: usize, value: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_time(idx: usize, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

const PAGE_COLUMNS: &str = "url, distance, referrer, anchor, score, fetch_time, prev_fetch_time, \
     fetch_interval, fetch_retries, inlinks, marks";

fn page_from_row(row: &Row) -> Result<WebPage> {
    let mut page = WebPage::new(row.get::<_, String>(0)?);
    page.distance = row.get::<_, i64>(1)? as u32;
    page.referrer = row.get(2)?;
    page.anchor = row.get(3)?;
    page.score = row.get(4)?;
    page.fetch_time = parse_time(5, row.get(5)?)?;
    page.prev_fetch_time = parse_time(6, row.get(6)?)?;
    page.fetch_interval_secs = row.get::<_, i64>(7)? as u64;
    page.fetch_retries = row.get::<_, i64>(8)? as u32;
    page.inlinks = from_json::<BTreeMap<String, String>>(9, &row.get::<_, String>(9)?)?;
    page.marks = from_json::<Marks>(10, &row.get::<_, String>(10)?)?;
    Ok(page)
}

impl Database {
    /// Delete the database and its `-wal`/`-shm` files. Missing files are
    /// not an error.
    pub fn drop(path: &Path) -> std::io::Result<()> {
        let mut files = vec![path.to_path_buf()];
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            files.push(PathBuf::from(sidecar));
        }

        for file in files {
            match fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Optimize for concurrent writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let db = Database {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Throwaway database, used by tests and dry runs
    pub fn in_memory() -> Result<Self> {
        let db = Database {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            "
CREATE TABLE IF NOT EXISTS merge_batches (
    id TEXT PRIMARY KEY,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed')),
    input TEXT NOT NULL,      -- where the outlink records came from
    configuration TEXT,       -- JSON configuration used
    counters TEXT             -- JSON counter snapshot
);

-- One row per URL, keyed by reversed URL
CREATE TABLE IF NOT EXISTS pages (
    reversed_url TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    distance INTEGER NOT NULL,
    referrer TEXT,
    anchor TEXT,
    score REAL NOT NULL DEFAULT 0,
    fetch_time TEXT,
    prev_fetch_time TEXT,
    fetch_interval INTEGER NOT NULL DEFAULT 0,
    fetch_retries INTEGER NOT NULL DEFAULT 0,
    inlinks TEXT NOT NULL,    -- JSON object of source url -> anchor
    marks TEXT NOT NULL,      -- JSON object of stage -> stamp
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url);
CREATE INDEX IF NOT EXISTS idx_pages_distance ON pages(distance);
            ",
        )?;
        Ok(())
    }

    // Batch management
    pub fn create_batch(&self, input: &str, configuration: Option<&str>) -> Result<String> {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();

        self.conn().execute(
            "INSERT INTO merge_batches (id, start_time, status, input, configuration) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&batch_id, timestamp, BatchStatus::Running.as_str(), input, configuration],
        )?;

        Ok(batch_id)
    }

    pub fn complete_batch(&self, batch_id: &str, counters: &str) -> Result<()> {
        let timestamp = current_timestamp();
        self.conn().execute(
            "UPDATE merge_batches SET status = ?1, end_time = ?2, counters = ?3 WHERE id = ?4",
            params![BatchStatus::Completed.as_str(), timestamp, counters, batch_id],
        )?;
        Ok(())
    }

    pub fn fail_batch(&self, batch_id: &str) -> Result<()> {
        let timestamp = current_timestamp();
        self.conn().execute(
            "UPDATE merge_batches SET status = ?1, end_time = ?2 WHERE id = ?3",
            params![BatchStatus::Failed.as_str(), timestamp, batch_id],
        )?;
        Ok(())
    }

    pub fn get_batch(&self, batch_id: &str) -> Result<Option<BatchRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, start_time, end_time, status, input, configuration, counters
             FROM merge_batches WHERE id = ?1",
        )?;

        stmt.query_row(params![batch_id], |row| {
            let status: String = row.get(3)?;
            Ok(BatchRecord {
                id: row.get(0)?,
                start_time: row.get(1)?,
                end_time: row.get(2)?,
                status: BatchStatus::from_str(&status).unwrap_or(BatchStatus::Failed),
                input: row.get(4)?,
                configuration: row.get(5)?,
                counters: row.get(6)?,
            })
        })
        .optional()
    }

    // Page operations
    pub fn put_page(&self, key: &GroupKey, page: &WebPage) -> Result<()> {
        let inlinks = to_json(&page.inlinks)?;
        let marks = to_json(&page.marks)?;

        self.conn().execute(
            "INSERT OR REPLACE INTO pages (
                reversed_url, url, distance, referrer, anchor, score, fetch_time,
                prev_fetch_time, fetch_interval, fetch_retries, inlinks, marks, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                key.as_str(),
                &page.url,
                page.distance as i64,
                &page.referrer,
                &page.anchor,
                page.score,
                page.fetch_time.map(|t| t.to_rfc3339()),
                page.prev_fetch_time.map(|t| t.to_rfc3339()),
                page.fetch_interval_secs as i64,
                page.fetch_retries as i64,
                inlinks,
                marks,
                current_timestamp(),
            ],
        )?;

        Ok(())
    }

    pub fn get_page(&self, key: &GroupKey) -> Result<Option<WebPage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pages WHERE reversed_url = ?1",
            PAGE_COLUMNS
        ))?;

        stmt.query_row(params![key.as_str()], page_from_row)
            .optional()
    }

    pub fn count_pages(&self) -> Result<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))
    }

    /// Pages ordered by distance, then URL
    pub fn list_pages(&self, limit: usize) -> Result<Vec<WebPage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pages ORDER BY distance, url LIMIT ?1",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map(params![limit as i64], page_from_row)?
            .collect::<Result<Vec<_>>>()?;

        Ok(pages)
    }

    /// Number of pages per distance, unreachable pages last
    pub fn distance_histogram(&self) -> Result<Vec<(u32, i64)>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT distance, COUNT(*) FROM pages GROUP BY distance ORDER BY distance")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)? as u32, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;

        Ok(rows)
    }
}

impl PageStore for Database {
    fn get_or_nil(&self, url: &str) -> GraphResult<WebPage> {
        let key = GroupKey::from_url(url)?;
        let page = self
            .get_page(&key)
            .map_err(|e| GraphError::Store(e.to_string()))?;
        Ok(page.unwrap_or_else(|| WebPage::nil(url)))
    }

    fn put(&self, key: &GroupKey, page: &WebPage) -> GraphResult<()> {
        self.put_page(key, page)
            .map_err(|e| GraphError::Store(e.to_string()))
    }
}
