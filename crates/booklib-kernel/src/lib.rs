use anyhow::{anyhow, Result};
use booklib_core::FilterPath;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Clone)]
pub struct Kernel {
    db_path: PathBuf,
}

/// One persisted document and its generated key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DocumentRow {
    pub id: i64,
    pub document: serde_json::Value,
}

/// Equality predicate on the scalar found at `path` inside a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFilter {
    pub path: FilterPath,
    pub value: String,
}

impl JsonFilter {
    pub fn new(path: FilterPath, value: impl Into<String>) -> Self {
        Self {
            path,
            value: value.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TuningError {
    #[error("invalid BOOKLIB_SQLITE_BUSY_MS: {0:?}")]
    BusyMs(String),
    #[error("invalid BOOKLIB_SQLITE_CACHE_PAGES: {0:?}")]
    CachePages(String),
}

/// SQLite knobs applied when the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTuning {
    pub busy_ms: u64,
    /// Negative values are KiB, positive values are pages.
    pub cache_pages: i64,
}

impl Default for StoreTuning {
    fn default() -> Self {
        Self {
            busy_ms: 5000,
            cache_pages: -20000,
        }
    }
}

impl StoreTuning {
    pub fn from_env() -> Result<Self, TuningError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset keys keep their defaults; set but unparseable keys are errors.
    pub fn from_lookup<F>(get: F) -> Result<Self, TuningError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tuning = Self::default();
        if let Some(raw) = get("BOOKLIB_SQLITE_BUSY_MS") {
            tuning.busy_ms = raw.trim().parse().map_err(|_| TuningError::BusyMs(raw))?;
        }
        if let Some(raw) = get("BOOKLIB_SQLITE_CACHE_PAGES") {
            tuning.cache_pages = raw
                .trim()
                .parse()
                .map_err(|_| TuningError::CachePages(raw))?;
        }
        Ok(tuning)
    }
}

impl Kernel {
    /// Open with tuning read from `BOOKLIB_SQLITE_*`.
    pub fn open(dir: &Path) -> Result<Self> {
        let tuning = StoreTuning::from_env()?;
        Self::open_with(dir, tuning)
    }

    pub fn open_with(dir: &Path, tuning: StoreTuning) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join("booklib.sqlite");
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(tuning.busy_ms))?;
        conn.pragma_update(None, "cache_size", tuning.cache_pages)?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Self::init_schema(&conn)?;
        tracing::debug!(
            path = %db_path.display(),
            busy_ms = tuning.busy_ms,
            cache_pages = tuning.cache_pages,
            "opened book store"
        );
        Ok(Self { db_path })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- One JSON document per book; the key column is the only identity
            CREATE TABLE IF NOT EXISTS book_library (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              book TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn decode_rows(raw: Vec<(i64, String)>) -> Result<Vec<DocumentRow>> {
        raw.into_iter()
            .map(|(id, text)| {
                let document = serde_json::from_str(&text)
                    .map_err(|e| anyhow!("row {id} holds invalid JSON: {e}"))?;
                Ok(DocumentRow { id, document })
            })
            .collect()
    }

    pub fn find_all(&self) -> Result<Vec<DocumentRow>> {
        self.find_by_filters(&[])
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<DocumentRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id,book FROM book_library WHERE id=? LIMIT 1")?;
        let raw: Option<(i64, String)> = stmt
            .query_row([id], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        Ok(Self::decode_rows(raw.into_iter().collect())?.pop())
    }

    /// Rows whose documents match every filter. Scalars are compared in their
    /// text form: strings by content, numbers by the literal as stored (`->`
    /// yields the JSON text, so `2019.0` and `1e-7` are not renormalised) and
    /// booleans as `true`/`false`. Objects, arrays and nulls never match.
    pub fn find_by_filters(&self, filters: &[JsonFilter]) -> Result<Vec<DocumentRow>> {
        let mut where_sql = String::new();
        let mut bound: Vec<String> = Vec::with_capacity(filters.len() * 2);
        for (i, filter) in filters.iter().enumerate() {
            let path_ix = i * 2 + 1;
            let value_ix = path_ix + 1;
            where_sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            where_sql.push_str(&format!(
                "(CASE json_type(book, ?{p}) \
                 WHEN 'true' THEN 'true' \
                 WHEN 'false' THEN 'false' \
                 WHEN 'integer' THEN book -> ?{p} \
                 WHEN 'real' THEN book -> ?{p} \
                 WHEN 'text' THEN json_extract(book, ?{p}) \
                 END) = ?{v}",
                p = path_ix,
                v = value_ix
            ));
            bound.push(filter.path.to_json_path());
            bound.push(filter.value.clone());
        }
        let sql = format!("SELECT id,book FROM book_library{} ORDER BY id ASC", where_sql);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut raw = Vec::new();
        for r in rows {
            raw.push(r?);
        }
        Self::decode_rows(raw)
    }

    /// Insert a new document (`id` absent) or overwrite the document stored at `id`.
    pub fn save(&self, id: Option<i64>, document: &serde_json::Value) -> Result<DocumentRow> {
        let conn = self.conn()?;
        let text = serde_json::to_string(document)?;
        let id = match id {
            Some(id) => {
                conn.execute(
                    "INSERT INTO book_library(id,book) VALUES(?,?) \
                     ON CONFLICT(id) DO UPDATE SET book=excluded.book",
                    params![id, text],
                )?;
                id
            }
            None => {
                conn.execute("INSERT INTO book_library(book) VALUES(?)", params![text])?;
                conn.last_insert_rowid()
            }
        };
        Ok(DocumentRow {
            id,
            document: document.clone(),
        })
    }

    pub fn exists_by_id(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM book_library WHERE id=? LIMIT 1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn delete_by_id(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM book_library WHERE id=?", [id])?;
        Ok(n > 0)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM book_library", [], |row| row.get(0))?;
        Ok(n)
    }

    // ---------------- Async wrappers (spawn_blocking) ----------------
    // These helpers offload rusqlite work from async executors.

    pub async fn find_all_async(&self) -> Result<Vec<DocumentRow>> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.find_all())
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn find_by_id_async(&self, id: i64) -> Result<Option<DocumentRow>> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.find_by_id(id))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn find_by_filters_async(&self, filters: Vec<JsonFilter>) -> Result<Vec<DocumentRow>> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.find_by_filters(&filters))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn save_async(
        &self,
        id: Option<i64>,
        document: serde_json::Value,
    ) -> Result<DocumentRow> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.save(id, &document))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn exists_by_id_async(&self, id: i64) -> Result<bool> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.exists_by_id(id))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn delete_by_id_async(&self, id: i64) -> Result<bool> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.delete_by_id(id))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn count_async(&self) -> Result<i64> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.count())
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn filter(path: &str, value: &str) -> JsonFilter {
        JsonFilter::new(FilterPath::parse(path).expect("valid path"), value)
    }

    fn seed(k: &Kernel) -> (i64, i64) {
        let a = k
            .save(
                None,
                &json!({
                    "name": "Test Book",
                    "description": "first",
                    "additionalProperties": {"yearPublished": 2019, "inPrint": true, "rating": 4.5}
                }),
            )
            .expect("insert a");
        let b = k
            .save(
                None,
                &json!({
                    "name": "Test Book",
                    "description": "second",
                    "language": "en",
                    "additionalProperties": {"yearPublished": 2020, "inPrint": false}
                }),
            )
            .expect("insert b");
        (a.id, b.id)
    }

    fn ids(rows: &[DocumentRow]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn insert_generates_increasing_ids() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let (a, b) = seed(&k);
        assert!(b > a);
        assert_eq!(k.count().unwrap(), 2);
        let row = k.find_by_id(a).unwrap().expect("row a");
        assert_eq!(row.document["description"], "first");
        assert!(k.find_by_id(-100).unwrap().is_none());
    }

    #[test]
    fn save_with_id_overwrites_document() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let (a, _) = seed(&k);
        let saved = k
            .save(Some(a), &json!({"name": "Renamed", "description": "x"}))
            .unwrap();
        assert_eq!(saved.id, a);
        let row = k.find_by_id(a).unwrap().unwrap();
        assert_eq!(row.document, json!({"name": "Renamed", "description": "x"}));
        assert_eq!(k.count().unwrap(), 2);
    }

    #[test]
    fn no_filters_returns_everything_in_key_order() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let (a, b) = seed(&k);
        assert_eq!(ids(&k.find_all().unwrap()), vec![a, b]);
        assert_eq!(ids(&k.find_by_filters(&[]).unwrap()), vec![a, b]);
    }

    #[test]
    fn numbers_compare_by_text() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let (a, b) = seed(&k);
        let rows = k
            .find_by_filters(&[filter("additionalProperties.yearPublished", "2019")])
            .unwrap();
        assert_eq!(ids(&rows), vec![a]);
        let rows = k
            .find_by_filters(&[filter("additionalProperties.yearPublished", "2020")])
            .unwrap();
        assert_eq!(ids(&rows), vec![b]);
        let rows = k
            .find_by_filters(&[filter("additionalProperties.rating", "4.5")])
            .unwrap();
        assert_eq!(ids(&rows), vec![a]);
    }

    #[test]
    fn decimals_match_their_stored_literal() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let near = k.save(None, &json!({"x": 0.30000000000000004})).unwrap().id;
        let tiny = k.save(None, &json!({"x": 1e-7})).unwrap().id;
        let whole = k.save(None, &json!({"x": 2019.0})).unwrap().id;
        let find = |value: &str| ids(&k.find_by_filters(&[filter("x", value)]).unwrap());
        assert_eq!(find("0.30000000000000004"), vec![near]);
        assert!(find("0.3").is_empty());
        assert_eq!(find("1e-7"), vec![tiny]);
        assert!(find("1.0e-07").is_empty());
        assert_eq!(find("2019.0"), vec![whole]);
        assert!(find("2019").is_empty());
    }

    #[test]
    fn tuning_defaults_and_overrides() {
        let none = StoreTuning::from_lookup(|_| None).unwrap();
        assert_eq!(none, StoreTuning::default());
        let set = StoreTuning::from_lookup(|key| match key {
            "BOOKLIB_SQLITE_BUSY_MS" => Some("250".into()),
            "BOOKLIB_SQLITE_CACHE_PAGES" => Some("512".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(set.busy_ms, 250);
        assert_eq!(set.cache_pages, 512);
    }

    #[test]
    fn tuning_rejects_garbage() {
        let busy = StoreTuning::from_lookup(|key| {
            (key == "BOOKLIB_SQLITE_BUSY_MS").then(|| "soon".to_string())
        });
        assert_eq!(busy, Err(TuningError::BusyMs("soon".into())));
        let cache = StoreTuning::from_lookup(|key| {
            (key == "BOOKLIB_SQLITE_CACHE_PAGES").then(|| "lots".to_string())
        });
        assert_eq!(cache, Err(TuningError::CachePages("lots".into())));
    }

    #[test]
    fn open_with_applies_tuning() {
        let dir = tempdir().unwrap();
        let tuning = StoreTuning {
            busy_ms: 10,
            cache_pages: 128,
        };
        let k = Kernel::open_with(dir.path(), tuning).unwrap();
        assert!(k.db_path().exists());
        assert_eq!(k.count().unwrap(), 0);
    }

    #[test]
    fn booleans_and_strings_match() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let (a, b) = seed(&k);
        let rows = k
            .find_by_filters(&[filter("additionalProperties.inPrint", "false")])
            .unwrap();
        assert_eq!(ids(&rows), vec![b]);
        let rows = k.find_by_filters(&[filter("language", "en")]).unwrap();
        assert_eq!(ids(&rows), vec![b]);
        let rows = k.find_by_filters(&[filter("name", "Test Book")]).unwrap();
        assert_eq!(ids(&rows), vec![a, b]);
    }

    #[test]
    fn every_filter_must_match() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let (a, _) = seed(&k);
        let rows = k
            .find_by_filters(&[
                filter("additionalProperties.yearPublished", "2019"),
                filter("name", "Test Book"),
            ])
            .unwrap();
        assert_eq!(ids(&rows), vec![a]);
        let rows = k
            .find_by_filters(&[
                filter("additionalProperties.yearPublished", "2019"),
                filter("name", "Test Book"),
                filter("description", "second"),
            ])
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn containers_and_missing_paths_never_match() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        seed(&k);
        let rows = k
            .find_by_filters(&[filter("additionalProperties", "{}")])
            .unwrap();
        assert!(rows.is_empty());
        let rows = k.find_by_filters(&[filter("author", "nobody")]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn delete_and_exists() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let (a, b) = seed(&k);
        assert!(k.exists_by_id(a).unwrap());
        assert!(k.delete_by_id(a).unwrap());
        assert!(!k.exists_by_id(a).unwrap());
        assert!(!k.delete_by_id(a).unwrap());
        assert_eq!(ids(&k.find_all().unwrap()), vec![b]);
    }

    #[test]
    fn reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        let a = {
            let k = Kernel::open(dir.path()).unwrap();
            seed(&k).0
        };
        let k = Kernel::open(dir.path()).unwrap();
        assert!(k.find_by_id(a).unwrap().is_some());
    }

    #[tokio::test]
    async fn async_wrappers_round_trip() {
        let dir = tempdir().unwrap();
        let k = Kernel::open(dir.path()).unwrap();
        let row = k
            .save_async(None, json!({"name": "n", "description": "d"}))
            .await
            .unwrap();
        assert!(k.exists_by_id_async(row.id).await.unwrap());
        let found = k.find_by_id_async(row.id).await.unwrap().unwrap();
        assert_eq!(found, row);
        let matched = k
            .find_by_filters_async(vec![filter("name", "n")])
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(k.find_all_async().await.unwrap().len(), 1);
        assert!(k.delete_by_id_async(row.id).await.unwrap());
        assert_eq!(k.count_async().await.unwrap(), 0);
    }
}
