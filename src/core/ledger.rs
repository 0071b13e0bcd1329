//! Commit ledger - completeness checks and locked (size, key) pairs
//!
//! An entry is committed only when every required cell has a value. Commit
//! turns the entry into an immutable [`CommittedRecord`] and locks its
//! (size, tolerance key) pair until it is explicitly reopened.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::fraction::Fraction;
use crate::core::session::SessionEntry;
use crate::core::summary::Summary;
use crate::core::tolerance::evaluate;
use crate::entities::record::{CommittedRecord, MeasuredPoint};
use crate::entities::spec::{MeasurementPointSpec, Size, ToleranceKey};

/// Errors raised by ledger transitions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Size {size} ({}) is already committed; reopen it to edit", .key.label())]
    AlreadyCommitted { size: Size, key: ToleranceKey },

    #[error("Size {size} ({}) has no committed record to reopen", .key.label())]
    AlreadyOpen { size: Size, key: ToleranceKey },
}

/// A required cell without a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub point_index: usize,
    pub point_name: String,
    /// Zero-based; displayed 1-based
    pub sample_index: usize,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Missing measurement for '{}' on piece {}",
            self.point_name,
            self.sample_index + 1
        )
    }
}

/// List every required cell of `entry` that has no value
///
/// A full column requires every point; otherwise only selected points are
/// required. Errors come out piece by piece, in row order.
pub fn validate(entry: &SessionEntry, points: &[MeasurementPointSpec]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for sample in 0..entry.sample_count() {
        let full = entry.full_columns().get(sample);
        for (index, point) in points.iter().enumerate() {
            let required = full || entry.selected_rows().get(index);
            if required && entry.cell(index, sample).is_none() {
                errors.push(ValidationError {
                    point_index: index,
                    point_name: point.name_eng.clone(),
                    sample_index: sample,
                });
            }
        }
    }
    errors
}

/// Classify every measured cell of `entry` into a record
///
/// Only cells that hold a value are included; a point nobody measured is
/// absent from the record rather than failed.
pub fn build_record(entry: &SessionEntry, points: &[MeasurementPointSpec]) -> CommittedRecord {
    let missing = Fraction::parse("-");
    let measured: Vec<MeasuredPoint> = entry
        .cells()
        .filter(|(cell, _)| entry.is_writable(cell.point, cell.sample))
        .filter_map(|(cell, value)| {
            let point = points.get(cell.point)?;
            let (nominal, tol_minus, tol_plus) = match point.size_spec(entry.size()) {
                Some(spec) => (
                    spec.nominal.clone(),
                    spec.tol_minus.clone(),
                    spec.tol_plus.clone(),
                ),
                None => (missing.clone(), missing.clone(), missing.clone()),
            };
            let result = evaluate(Some(value.decimal), &tol_minus, &tol_plus).result();
            Some(MeasuredPoint {
                point_index: cell.point,
                sample_index: cell.sample,
                point_name: point.name_eng.clone(),
                measured: value.clone(),
                nominal,
                tol_minus,
                tol_plus,
                result,
            })
        })
        .collect();

    let summary = Summary::from_points(&measured);
    CommittedRecord {
        size: entry.size().to_string(),
        tolerance_key: entry.active_key().clone(),
        sample_count: entry.sample_count(),
        selected_rows: entry.selected_rows().clone(),
        full_columns: entry.full_columns().clone(),
        points: measured,
        summary,
    }
}

/// Committed records of one phase, in commit order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitLedger {
    records: Vec<CommittedRecord>,
}

impl CommitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pair is committed and therefore read-only
    pub fn is_locked(&self, size: &str, key: &ToleranceKey) -> bool {
        self.get(size, key).is_some()
    }

    pub fn get(&self, size: &str, key: &ToleranceKey) -> Option<&CommittedRecord> {
        self.records.iter().find(|r| r.is_for(size, key))
    }

    pub fn records(&self) -> &[CommittedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keys already committed for a size, in commit order
    pub fn committed_keys(&self, size: &str) -> Vec<ToleranceKey> {
        self.records
            .iter()
            .filter(|r| r.size == size)
            .map(|r| r.tolerance_key.clone())
            .collect()
    }

    /// Most recently committed record of a size, any key
    pub fn latest_for_size(&self, size: &str) -> Option<&CommittedRecord> {
        self.records.iter().rev().find(|r| r.size == size)
    }

    /// Lock a pair with its record
    pub fn insert(&mut self, record: CommittedRecord) -> Result<(), LedgerError> {
        if self.is_locked(&record.size, &record.tolerance_key) {
            return Err(LedgerError::AlreadyCommitted {
                size: record.size,
                key: record.tolerance_key,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Unlock a pair, handing back its record
    pub fn take(&mut self, size: &str, key: &ToleranceKey) -> Result<CommittedRecord, LedgerError> {
        let position = self
            .records
            .iter()
            .position(|r| r.is_for(size, key))
            .ok_or_else(|| LedgerError::AlreadyOpen {
                size: size.to_string(),
                key: key.clone(),
            })?;
        Ok(self.records.remove(position))
    }
}
