//! Record store - persists committed records outside the session
//!
//! Records are upserted by their natural key (order, color, phase, size,
//! tolerance key), so saving the same pair twice replaces the earlier row.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::entities::context::{OrderContext, Phase};
use crate::entities::record::CommittedRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Invalid timestamp '{0}' in store")]
    Timestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A record as held by the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub context: OrderContext,
    pub phase: Phase,
    pub saved_at: DateTime<Utc>,
    pub record: CommittedRecord,
}

/// Somewhere committed records can be saved
pub trait CommitSink {
    /// Insert or replace the record of a pair
    fn upsert(
        &mut self,
        context: &OrderContext,
        phase: Phase,
        record: &CommittedRecord,
    ) -> Result<(), StoreError>;

    /// Records of an order and phase, in (size, key) order
    fn records(&self, context: &OrderContext, phase: Phase) -> Result<Vec<StoredRecord>, StoreError>;
}

// =========================================================================
// SQLite
// =========================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS committed_records (
    order_no      TEXT NOT NULL,
    color         TEXT NOT NULL,
    phase         TEXT NOT NULL,
    size          TEXT NOT NULL,
    tolerance_key TEXT NOT NULL,
    body          TEXT NOT NULL,
    saved_at      TEXT NOT NULL,
    PRIMARY KEY (order_no, color, phase, size, tolerance_key)
);
"#;

impl ToSql for Phase {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Phase {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse().map_err(|e: String| {
            FromSqlError::Other(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            )))
        })
    }
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) a store file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened record store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Every order/color pair with saved records
    pub fn contexts(&self) -> Result<Vec<OrderContext>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT order_no, color FROM committed_records ORDER BY order_no, color",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(OrderContext::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl CommitSink for SqliteStore {
    fn upsert(
        &mut self,
        context: &OrderContext,
        phase: Phase,
        record: &CommittedRecord,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO committed_records
                (order_no, color, phase, size, tolerance_key, body, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (order_no, color, phase, size, tolerance_key)
             DO UPDATE SET body = excluded.body, saved_at = excluded.saved_at",
            params![
                context.order_no,
                context.color,
                phase,
                record.size,
                record.tolerance_key.as_str(),
                body,
                Utc::now().to_rfc3339(),
            ],
        )?;
        debug!(order = %context, phase = %phase, size = %record.size, "record saved");
        Ok(())
    }

    fn records(&self, context: &OrderContext, phase: Phase) -> Result<Vec<StoredRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT body, saved_at FROM committed_records
             WHERE order_no = ?1 AND color = ?2 AND phase = ?3
             ORDER BY size, tolerance_key",
        )?;
        let rows = stmt.query_map(params![context.order_no, context.color, phase], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (body, saved_at) = row?;
            let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                .map_err(|_| StoreError::Timestamp(saved_at.clone()))?
                .with_timezone(&Utc);
            records.push(StoredRecord {
                context: context.clone(),
                phase,
                saved_at,
                record: serde_json::from_str(&body)?,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::SelectionMask;
    use crate::core::summary::Summary;
    use crate::entities::spec::{Size, ToleranceKey};
    use std::collections::BTreeMap;

    type RecordKey = (String, String, Phase, Size, ToleranceKey);

    /// Store kept in memory
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        rows: BTreeMap<RecordKey, StoredRecord>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.rows.len()
        }
    }

    impl CommitSink for MemoryStore {
        fn upsert(
            &mut self,
            context: &OrderContext,
            phase: Phase,
            record: &CommittedRecord,
        ) -> Result<(), StoreError> {
            let key = (
                context.order_no.clone(),
                context.color.clone(),
                phase,
                record.size.clone(),
                record.tolerance_key.clone(),
            );
            self.rows.insert(
                key,
                StoredRecord {
                    context: context.clone(),
                    phase,
                    saved_at: Utc::now(),
                    record: record.clone(),
                },
            );
            Ok(())
        }

        fn records(&self, context: &OrderContext, phase: Phase) -> Result<Vec<StoredRecord>, StoreError> {
            Ok(self
                .rows
                .iter()
                .filter(|((order_no, color, p, _, _), _)| {
                    order_no == &context.order_no && color == &context.color && *p == phase
                })
                .map(|(_, stored)| stored.clone())
                .collect())
        }
    }

    fn record(size: &str, key: &str, samples: usize) -> CommittedRecord {
        CommittedRecord {
            size: size.into(),
            tolerance_key: ToleranceKey::new(key),
            sample_count: samples,
            selected_rows: SelectionMask::new(2),
            full_columns: SelectionMask::new(samples),
            points: Vec::new(),
            summary: Summary::default(),
        }
    }

    fn context() -> OrderContext {
        OrderContext::new("PO-7", "Black")
    }

    #[test]
    fn test_sqlite_upsert_replaces_pair() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&context(), Phase::BeforeWash, &record("M", "1", 3)).unwrap();
        store.upsert(&context(), Phase::BeforeWash, &record("M", "1", 5)).unwrap();
        store.upsert(&context(), Phase::BeforeWash, &record("M", "2", 3)).unwrap();
        store.upsert(&context(), Phase::AfterWash, &record("M", "1", 3)).unwrap();

        let before = store.records(&context(), Phase::BeforeWash).unwrap();
        assert_eq!(before.len(), 2);
        assert_eq!(before[0].record.sample_count, 5);
        assert_eq!(before[1].record.tolerance_key, ToleranceKey::new("2"));

        let after = store.records(&context(), Phase::AfterWash).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].phase, Phase::AfterWash);
        assert_eq!(store.contexts().unwrap(), vec![context()]);
    }

    #[test]
    fn test_sqlite_file_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("records.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.upsert(&context(), Phase::BeforeWash, &record("S", "NA", 2)).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let records = store.records(&context(), Phase::BeforeWash).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record, record("S", "NA", 2));
    }

    #[test]
    fn test_memory_store_filters_by_context() {
        let mut store = MemoryStore::new();
        store.upsert(&context(), Phase::BeforeWash, &record("M", "1", 3)).unwrap();
        store.upsert(&context(), Phase::BeforeWash, &record("M", "1", 4)).unwrap();
        store
            .upsert(&OrderContext::new("PO-8", "Black"), Phase::BeforeWash, &record("M", "1", 3))
            .unwrap();

        assert_eq!(store.len(), 2);
        let records = store.records(&context(), Phase::BeforeWash).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.sample_count, 4);
    }
}
