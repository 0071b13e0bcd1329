//! Session state - the working grid of one size
//!
//! A [`SessionEntry`] holds everything an inspector has entered for a size
//! that is not yet committed: which points (rows) are selected, which samples
//! (columns) are marked full, and the cell values. Rows and columns are
//! positional; row `i` is the `i`-th point of the active key.
//!
//! Every transition keeps the cell invariant: a cell holds a value only while
//! its row is selected or its column is full.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::ledger::{LedgerError, ValidationError};
use crate::entities::context::Phase;
use crate::entities::record::{CellValue, CommittedRecord};
use crate::entities::spec::{Size, ToleranceKey};

/// Index-aligned boolean flags (rows or sample columns)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionMask(Vec<bool>);

impl SelectionMask {
    /// A mask of `len` unselected positions
    pub fn new(len: usize) -> Self {
        Self(vec![false; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flag at `index`; positions past the end read as unselected
    pub fn get(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    fn set(&mut self, index: usize, value: bool) {
        if let Some(flag) = self.0.get_mut(index) {
            *flag = value;
        }
    }

    /// Grow with unselected positions or drop trailing ones
    fn resize(&mut self, len: usize) {
        self.0.resize(len, false);
    }

    pub fn count_selected(&self) -> usize {
        self.0.iter().filter(|f| **f).count()
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|f| *f)
    }

    pub fn all(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|f| *f)
    }

    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, f)| if *f { Some(i) } else { None })
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

impl From<Vec<bool>> for SelectionMask {
    fn from(flags: Vec<bool>) -> Self {
        Self(flags)
    }
}

/// Grid coordinate; ordered sample-major so iteration walks piece by piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub sample: usize,
    pub point: usize,
}

impl CellRef {
    pub fn new(point: usize, sample: usize) -> Self {
        Self { sample, point }
    }
}

/// Errors from session transitions
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Point {} is out of range (the active key has {len} points)", .index + 1)]
    PointOutOfRange { index: usize, len: usize },

    #[error("Sample {} is out of range (size has {len} samples)", .index + 1)]
    SampleOutOfRange { index: usize, len: usize },

    #[error("Sample count must be at least 1")]
    InvalidSampleCount,

    #[error("Size {0} is not in the working set")]
    SizeNotInWorkingSet(Size),

    #[error("Size {0} is already in the working set")]
    SizeAlreadyAdded(Size),

    #[error("Size {0} is not part of this order")]
    UnknownSize(Size),

    #[error("Size {0} has no open tolerance key (every key is committed)")]
    NoOpenToleranceKey(Size),

    #[error("Tolerance key {0} is not in the catalog")]
    UnknownToleranceKey(ToleranceKey),

    #[error("Size {size} is being measured on {}, not {}", .active.label(), .requested.label())]
    KeyNotActive {
        size: Size,
        active: ToleranceKey,
        requested: ToleranceKey,
    },

    #[error("No catalog loaded for phase {0}")]
    PhaseNotLoaded(Phase),

    #[error("Phase {0} already has measurements; its catalog cannot be replaced")]
    CatalogInUse(Phase),

    #[error("'{0}' is not a valid measurement")]
    InvalidMeasurement(String),

    #[error("{} required measurement(s) missing", .0.len())]
    Incomplete(Vec<ValidationError>),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Working state of one size being measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    size: Size,
    sample_count: usize,
    active_key: ToleranceKey,
    selected_rows: SelectionMask,
    full_columns: SelectionMask,
    #[serde(default, with = "cell_list")]
    cells: BTreeMap<CellRef, CellValue>,
}

impl SessionEntry {
    /// Create an empty entry on `key` with `point_count` rows
    pub fn new(
        size: impl Into<Size>,
        sample_count: usize,
        key: ToleranceKey,
        point_count: usize,
    ) -> Result<Self, SessionError> {
        if sample_count == 0 {
            return Err(SessionError::InvalidSampleCount);
        }
        Ok(Self {
            size: size.into(),
            sample_count,
            active_key: key,
            selected_rows: SelectionMask::new(point_count),
            full_columns: SelectionMask::new(sample_count),
            cells: BTreeMap::new(),
        })
    }

    /// Rebuild an entry that mirrors a committed record exactly
    pub fn from_record(record: &CommittedRecord) -> Self {
        let cells = record
            .points
            .iter()
            .map(|p| (CellRef::new(p.point_index, p.sample_index), p.measured.clone()))
            .collect();
        Self {
            size: record.size.clone(),
            sample_count: record.sample_count,
            active_key: record.tolerance_key.clone(),
            selected_rows: record.selected_rows.clone(),
            full_columns: record.full_columns.clone(),
            cells,
        }
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn active_key(&self) -> &ToleranceKey {
        &self.active_key
    }

    pub fn selected_rows(&self) -> &SelectionMask {
        &self.selected_rows
    }

    pub fn full_columns(&self) -> &SelectionMask {
        &self.full_columns
    }

    /// Number of rows of the active key
    pub fn point_count(&self) -> usize {
        self.selected_rows.len()
    }

    pub fn cell(&self, point: usize, sample: usize) -> Option<&CellValue> {
        self.cells.get(&CellRef::new(point, sample))
    }

    /// Populated cells in sample-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &CellValue)> {
        self.cells.iter().map(|(k, v)| (*k, v))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether a cell accepts input: its row is selected or its column is full
    pub fn is_writable(&self, point: usize, sample: usize) -> bool {
        self.selected_rows.get(point) || self.full_columns.get(sample)
    }

    /// Switch to a new key: rows take `selection`, cells and full columns reset
    ///
    /// A selection whose length differs from `point_count` is ignored in
    /// favor of an empty one.
    pub fn activate_key(&mut self, key: ToleranceKey, point_count: usize, selection: SelectionMask) {
        self.active_key = key;
        self.selected_rows = if selection.len() == point_count {
            selection
        } else {
            SelectionMask::new(point_count)
        };
        self.full_columns = SelectionMask::new(self.sample_count);
        self.cells.clear();
    }

    /// Flip a row; a row turned on starts from zero in every sample
    pub fn toggle_row(&mut self, point: usize) -> Result<bool, SessionError> {
        self.check_point(point)?;
        let on = !self.selected_rows.get(point);
        self.set_row(point, on);
        Ok(on)
    }

    /// Select or clear every row at once
    pub fn set_all_rows(&mut self, on: bool) {
        for point in 0..self.point_count() {
            if self.selected_rows.get(point) != on {
                self.set_row(point, on);
            }
        }
    }

    fn set_row(&mut self, point: usize, on: bool) {
        self.selected_rows.set(point, on);
        if on {
            for sample in 0..self.sample_count {
                self.cells.insert(CellRef::new(point, sample), CellValue::zero());
            }
        } else {
            let full = &self.full_columns;
            self.cells
                .retain(|cell, _| cell.point != point || full.get(cell.sample));
        }
    }

    /// Flip a sample column; a column turned on gets zero cells where empty
    pub fn toggle_full_column(&mut self, sample: usize) -> Result<bool, SessionError> {
        self.check_sample(sample)?;
        let on = !self.full_columns.get(sample);
        self.full_columns.set(sample, on);
        if on {
            for point in 0..self.point_count() {
                self.cells
                    .entry(CellRef::new(point, sample))
                    .or_insert_with(CellValue::zero);
            }
        } else {
            let rows = &self.selected_rows;
            self.cells
                .retain(|cell, _| cell.sample != sample || rows.get(cell.point));
        }
        Ok(on)
    }

    /// Store a value; returns `false` without change when the cell is locked
    pub fn write_cell(
        &mut self,
        point: usize,
        sample: usize,
        value: CellValue,
    ) -> Result<bool, SessionError> {
        self.check_point(point)?;
        self.check_sample(sample)?;
        if !self.is_writable(point, sample) {
            return Ok(false);
        }
        self.cells.insert(CellRef::new(point, sample), value);
        Ok(true)
    }

    /// Remove a value; returns whether one was present
    pub fn clear_cell(&mut self, point: usize, sample: usize) -> Result<bool, SessionError> {
        self.check_point(point)?;
        self.check_sample(sample)?;
        Ok(self.cells.remove(&CellRef::new(point, sample)).is_some())
    }

    /// Change the number of pieces; cells of retained samples are kept
    pub fn set_sample_count(&mut self, count: usize) -> Result<(), SessionError> {
        if count == 0 {
            return Err(SessionError::InvalidSampleCount);
        }
        if count > self.sample_count {
            let rows = self.selected_rows.clone();
            for sample in self.sample_count..count {
                for point in rows.selected_indices() {
                    self.cells.insert(CellRef::new(point, sample), CellValue::zero());
                }
            }
        } else {
            self.cells.retain(|cell, _| cell.sample < count);
        }
        self.sample_count = count;
        self.full_columns.resize(count);
        Ok(())
    }

    fn check_point(&self, point: usize) -> Result<(), SessionError> {
        if point >= self.point_count() {
            return Err(SessionError::PointOutOfRange {
                index: point,
                len: self.point_count(),
            });
        }
        Ok(())
    }

    fn check_sample(&self, sample: usize) -> Result<(), SessionError> {
        if sample >= self.sample_count {
            return Err(SessionError::SampleOutOfRange {
                index: sample,
                len: self.sample_count,
            });
        }
        Ok(())
    }
}

/// Cells travel as an array of `{point, sample, decimal, fraction}`
mod cell_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    use super::CellRef;
    use crate::entities::record::CellValue;

    #[derive(Serialize, Deserialize)]
    struct CellEntry {
        point: usize,
        sample: usize,
        decimal: f64,
        fraction: String,
    }

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<CellRef, CellValue>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(cells.iter().map(|(cell, value)| CellEntry {
            point: cell.point,
            sample: cell.sample,
            decimal: value.decimal,
            fraction: value.fraction.clone(),
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<CellRef, CellValue>, D::Error> {
        let entries = Vec::<CellEntry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| (CellRef::new(e.point, e.sample), CellValue::new(e.decimal, e.fraction)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(points: usize, samples: usize) -> SessionEntry {
        SessionEntry::new("M", samples, ToleranceKey::new("1"), points).unwrap()
    }

    #[test]
    fn test_new_entry_is_empty() {
        let e = entry(3, 2);
        assert_eq!(e.point_count(), 3);
        assert_eq!(e.full_columns().len(), 2);
        assert_eq!(e.cell_count(), 0);
        assert!(matches!(
            SessionEntry::new("M", 0, ToleranceKey::any(), 3),
            Err(SessionError::InvalidSampleCount)
        ));
    }

    #[test]
    fn test_toggle_row_seeds_zero_and_discards_stale_values() {
        let mut e = entry(3, 2);
        assert!(e.toggle_row(1).unwrap());
        assert_eq!(e.cell(1, 0), Some(&CellValue::zero()));
        assert_eq!(e.cell(1, 1), Some(&CellValue::zero()));

        e.write_cell(1, 0, CellValue::new(0.5, "1/2")).unwrap();
        assert!(!e.toggle_row(1).unwrap());
        assert_eq!(e.cell_count(), 0);

        e.toggle_row(1).unwrap();
        assert_eq!(e.cell(1, 0), Some(&CellValue::zero()));
    }

    #[test]
    fn test_full_column_keeps_existing_values() {
        let mut e = entry(3, 2);
        e.toggle_row(0).unwrap();
        e.write_cell(0, 1, CellValue::new(0.25, "1/4")).unwrap();

        assert!(e.toggle_full_column(1).unwrap());
        assert_eq!(e.cell(0, 1).unwrap().fraction, "1/4");
        assert_eq!(e.cell(2, 1), Some(&CellValue::zero()));
        assert_eq!(e.cell(2, 0), None);

        assert!(!e.toggle_full_column(1).unwrap());
        assert_eq!(e.cell(0, 1).unwrap().fraction, "1/4");
        assert_eq!(e.cell(2, 1), None);
    }

    #[test]
    fn test_deselecting_row_keeps_full_column_cells() {
        let mut e = entry(2, 2);
        e.toggle_full_column(0).unwrap();
        e.toggle_row(1).unwrap();
        e.write_cell(1, 0, CellValue::new(-0.125, "-1/8")).unwrap();
        e.toggle_row(1).unwrap();

        assert_eq!(e.cell(1, 0), Some(&CellValue::new(-0.125, "-1/8")));
        assert_eq!(e.cell(1, 1), None);
    }

    #[test]
    fn test_write_to_locked_cell_is_noop() {
        let mut e = entry(2, 2);
        assert!(!e.write_cell(0, 0, CellValue::new(0.5, "1/2")).unwrap());
        assert_eq!(e.cell_count(), 0);
        assert!(!e.is_writable(0, 0));
    }

    #[test]
    fn test_out_of_range_positions_are_errors() {
        let mut e = entry(2, 2);
        assert!(matches!(
            e.toggle_row(2),
            Err(SessionError::PointOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            e.toggle_full_column(5),
            Err(SessionError::SampleOutOfRange { index: 5, len: 2 })
        ));
        let err = e.toggle_row(2).unwrap_err();
        assert_eq!(err.to_string(), "Point 3 is out of range (the active key has 2 points)");
    }

    #[test]
    fn test_sample_count_shrink_and_grow() {
        let mut e = entry(2, 3);
        e.toggle_row(0).unwrap();
        e.write_cell(0, 0, CellValue::new(0.25, "1/4")).unwrap();
        e.toggle_full_column(2).unwrap();

        e.set_sample_count(2).unwrap();
        assert_eq!(e.full_columns().len(), 2);
        assert_eq!(e.cell(0, 0).unwrap().fraction, "1/4");
        assert_eq!(e.cell(0, 2), None);
        assert_eq!(e.cell(1, 2), None);

        e.set_sample_count(4).unwrap();
        assert_eq!(e.full_columns().as_slice(), &[false, false, false, false]);
        assert_eq!(e.cell(0, 0).unwrap().fraction, "1/4");
        assert_eq!(e.cell(0, 3), Some(&CellValue::zero()));
        assert_eq!(e.cell(1, 3), None);

        assert!(e.set_sample_count(0).is_err());
    }

    #[test]
    fn test_activate_key_resets_grid() {
        let mut e = entry(2, 2);
        e.toggle_row(0).unwrap();
        e.toggle_full_column(1).unwrap();

        e.activate_key(ToleranceKey::new("2"), 3, SelectionMask::from(vec![true, false, true]));
        assert_eq!(e.active_key(), &ToleranceKey::new("2"));
        assert_eq!(e.selected_rows().as_slice(), &[true, false, true]);
        assert!(!e.full_columns().any());
        assert_eq!(e.cell_count(), 0);

        e.activate_key(ToleranceKey::new("1"), 4, SelectionMask::from(vec![true]));
        assert_eq!(e.selected_rows(), &SelectionMask::new(4));
    }

    #[test]
    fn test_set_all_rows() {
        let mut e = entry(3, 1);
        e.toggle_row(1).unwrap();
        e.write_cell(1, 0, CellValue::new(0.5, "1/2")).unwrap();

        e.set_all_rows(true);
        assert!(e.selected_rows().all());
        assert_eq!(e.cell(1, 0).unwrap().fraction, "1/2");
        assert_eq!(e.cell(0, 0), Some(&CellValue::zero()));

        e.set_all_rows(false);
        assert!(!e.selected_rows().any());
        assert_eq!(e.cell_count(), 0);
    }

    #[test]
    fn test_cells_serialize_as_array() {
        let mut e = entry(2, 1);
        e.toggle_row(1).unwrap();
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(
            json["cells"],
            serde_json::json!([{ "point": 1, "sample": 0, "decimal": 0.0, "fraction": "0" }])
        );
        let back: SessionEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }
}
