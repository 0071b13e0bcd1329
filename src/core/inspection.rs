//! Inspection controller
//!
//! An [`Inspection`] covers one order (order number + color). Each phase
//! gets its own [`PhaseBook`]: a catalog, the sizes currently being worked,
//! the commit ledger and the remembered row patterns. Every transition on a
//! size goes through the book so the ledger lock is checked in one place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::core::catalog::SpecCatalog;
use crate::core::fraction::Fraction;
use crate::core::ledger::{build_record, validate, CommitLedger, LedgerError, ValidationError};
use crate::core::pattern::{PatternPropagator, PatternSource};
use crate::core::session::{SelectionMask, SessionEntry, SessionError};
use crate::core::summary::{summarize, Summary};
use crate::core::tolerance::{evaluate, Evaluation};
use crate::entities::context::{OrderContext, Phase};
use crate::entities::record::{CellValue, CommittedRecord};
use crate::entities::spec::{MeasurementPointSpec, Size, ToleranceKey};

/// Lifecycle of a (size, key) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    NotStarted,
    Open,
    /// Open again after a commit; the old record returns if the edit is dropped
    Reopened,
    Committed,
}

impl std::fmt::Display for PairStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairStatus::NotStarted => write!(f, "not started"),
            PairStatus::Open => write!(f, "open"),
            PairStatus::Reopened => write!(f, "reopened"),
            PairStatus::Committed => write!(f, "committed"),
        }
    }
}

/// One cell as shown in the grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub value: Option<CellValue>,
    pub writable: bool,
    pub evaluation: Evaluation,
}

/// One point row as shown in the grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub point_id: String,
    pub name_eng: String,
    pub name_local: Option<String>,
    pub nominal: Fraction,
    pub tol_minus: Fraction,
    pub tol_plus: Fraction,
    pub selected: bool,
    pub cells: Vec<GridCell>,
}

/// Read model of a size's grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridView {
    pub size: Size,
    pub tolerance_key: ToleranceKey,
    pub sample_count: usize,
    pub full_columns: SelectionMask,
    pub locked: bool,
    pub rows: Vec<GridRow>,
}

impl GridView {
    fn build(entry: &SessionEntry, points: &[MeasurementPointSpec], locked: bool) -> Self {
        let missing = Fraction::parse("-");
        let rows = points
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let (nominal, tol_minus, tol_plus) = match point.size_spec(entry.size()) {
                    Some(spec) => (
                        spec.nominal.clone(),
                        spec.tol_minus.clone(),
                        spec.tol_plus.clone(),
                    ),
                    None => (missing.clone(), missing.clone(), missing.clone()),
                };
                let cells = (0..entry.sample_count())
                    .map(|sample| {
                        let value = entry.cell(index, sample).cloned();
                        let evaluation =
                            evaluate(value.as_ref().map(|v| v.decimal), &tol_minus, &tol_plus);
                        GridCell {
                            value,
                            writable: !locked && entry.is_writable(index, sample),
                            evaluation,
                        }
                    })
                    .collect();
                GridRow {
                    point_id: point.point_id.clone(),
                    name_eng: point.name_eng.clone(),
                    name_local: point.name_local.clone(),
                    nominal,
                    tol_minus,
                    tol_plus,
                    selected: entry.selected_rows().get(index),
                    cells,
                }
            })
            .collect();

        Self {
            size: entry.size().to_string(),
            tolerance_key: entry.active_key().clone(),
            sample_count: entry.sample_count(),
            full_columns: entry.full_columns().clone(),
            locked,
            rows,
        }
    }
}

/// State of one inspection phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseBook {
    phase: Phase,
    catalog: SpecCatalog,
    #[serde(default)]
    entries: Vec<SessionEntry>,
    #[serde(default)]
    ledger: CommitLedger,
    #[serde(default)]
    patterns: PatternPropagator,
    /// Records taken out of the ledger by a reopen that is not yet re-committed
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    reopened: BTreeMap<Size, CommittedRecord>,
}

impl PhaseBook {
    pub fn new(phase: Phase, catalog: SpecCatalog) -> Self {
        Self {
            phase,
            catalog,
            entries: Vec::new(),
            ledger: CommitLedger::new(),
            patterns: PatternPropagator::new(),
            reopened: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn catalog(&self) -> &SpecCatalog {
        &self.catalog
    }

    /// Sizes in the working set, in the order they were added
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn ledger(&self) -> &CommitLedger {
        &self.ledger
    }

    pub fn patterns(&self) -> &PatternPropagator {
        &self.patterns
    }

    /// Whether nothing has been entered or committed in this phase
    pub fn is_untouched(&self) -> bool {
        self.entries.is_empty() && self.ledger.is_empty() && self.reopened.is_empty()
    }

    pub fn entry(&self, size: &str) -> Result<&SessionEntry, SessionError> {
        self.entries
            .iter()
            .find(|e| e.size() == size)
            .ok_or_else(|| SessionError::SizeNotInWorkingSet(size.to_string()))
    }

    fn position(&self, size: &str) -> Result<usize, SessionError> {
        self.entries
            .iter()
            .position(|e| e.size() == size)
            .ok_or_else(|| SessionError::SizeNotInWorkingSet(size.to_string()))
    }

    /// Points of the key a size is currently on
    pub fn points(&self, size: &str) -> Result<&[MeasurementPointSpec], SessionError> {
        let entry = self.entry(size)?;
        Ok(self.catalog.points_for(entry.active_key()))
    }

    pub fn is_locked(&self, size: &str, key: &ToleranceKey) -> bool {
        self.ledger.is_locked(size, key)
    }

    /// Catalog keys not yet committed for `size`, in catalog order
    pub fn open_keys(&self, size: &str) -> Vec<ToleranceKey> {
        self.catalog
            .available_keys()
            .into_iter()
            .filter(|key| !self.ledger.is_locked(size, key))
            .collect()
    }

    pub fn has_open_tolerance_key(&self, size: &str) -> bool {
        !self.open_keys(size).is_empty()
    }

    pub fn pair_status(&self, size: &str, key: &ToleranceKey) -> PairStatus {
        if self.ledger.is_locked(size, key) {
            return PairStatus::Committed;
        }
        match self.entry(size) {
            Ok(entry) if entry.active_key() == key => {
                if self.reopened.contains_key(size) {
                    PairStatus::Reopened
                } else {
                    PairStatus::Open
                }
            }
            _ => PairStatus::NotStarted,
        }
    }

    /// Start measuring a size on its first uncommitted key
    pub fn add_size(&mut self, size: &str, sample_count: usize) -> Result<PatternSource, SessionError> {
        if self.entry(size).is_ok() {
            return Err(SessionError::SizeAlreadyAdded(size.to_string()));
        }
        let key = self
            .open_keys(size)
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::NoOpenToleranceKey(size.to_string()))?;

        let point_count = self.catalog.point_count(&key);
        let mut entry = SessionEntry::new(size, sample_count, key.clone(), point_count)?;
        let (selection, source) = self.patterns.apply(size, point_count);
        entry.activate_key(key.clone(), point_count, selection);
        self.entries.push(entry);

        info!(phase = %self.phase, size, key = %key, samples = sample_count, "size added");
        Ok(source)
    }

    /// Drop a size from the working set
    ///
    /// Returns `true` when the size was a reopened record, which goes back
    /// into the ledger unchanged.
    pub fn remove_size(&mut self, size: &str) -> Result<bool, SessionError> {
        let position = self.position(size)?;
        self.entries.remove(position);
        let restored = self.restore_reopened(size)?;
        info!(phase = %self.phase, size, restored, "size removed");
        Ok(restored)
    }

    fn restore_reopened(&mut self, size: &str) -> Result<bool, SessionError> {
        match self.reopened.remove(size) {
            Some(record) => {
                debug!(size, key = %record.tolerance_key, "restoring reopened record");
                self.ledger.insert(record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Switch a size to another key
    ///
    /// Clears the grid and applies the remembered pattern. Switching to the
    /// key already active changes nothing and returns `None`.
    pub fn set_active_tolerance_key(
        &mut self,
        size: &str,
        key: &ToleranceKey,
    ) -> Result<Option<PatternSource>, SessionError> {
        let position = self.position(size)?;
        if !self.catalog.has_key(key) {
            return Err(SessionError::UnknownToleranceKey(key.clone()));
        }
        if self.ledger.is_locked(size, key) {
            return Err(LedgerError::AlreadyCommitted {
                size: size.to_string(),
                key: key.clone(),
            }
            .into());
        }
        if self.entries[position].active_key() == key {
            return Ok(None);
        }

        self.restore_reopened(size)?;
        let point_count = self.catalog.point_count(key);
        let (selection, source) = self.patterns.apply(size, point_count);
        self.entries[position].activate_key(key.clone(), point_count, selection);

        info!(phase = %self.phase, size, key = %key, pattern = %source, "tolerance key switched");
        Ok(Some(source))
    }

    /// Entry to edit; a size whose last key is committed reports the lock
    fn entry_mut(&mut self, size: &str) -> Result<&mut SessionEntry, SessionError> {
        let position = match self.position(size) {
            Ok(position) => position,
            Err(err) => {
                return Err(match self.ledger.latest_for_size(size) {
                    Some(record) => LedgerError::AlreadyCommitted {
                        size: size.to_string(),
                        key: record.tolerance_key.clone(),
                    }
                    .into(),
                    None => err,
                })
            }
        };
        Ok(&mut self.entries[position])
    }

    pub fn toggle_row(&mut self, size: &str, point: usize) -> Result<bool, SessionError> {
        self.entry_mut(size)?.toggle_row(point)
    }

    pub fn set_all_rows(&mut self, size: &str, on: bool) -> Result<(), SessionError> {
        self.entry_mut(size)?.set_all_rows(on);
        Ok(())
    }

    pub fn toggle_full_column(&mut self, size: &str, sample: usize) -> Result<bool, SessionError> {
        self.entry_mut(size)?.toggle_full_column(sample)
    }

    pub fn write_cell(
        &mut self,
        size: &str,
        point: usize,
        sample: usize,
        value: CellValue,
    ) -> Result<bool, SessionError> {
        self.entry_mut(size)?.write_cell(point, sample, value)
    }

    /// Parse an inspector entry and store it
    pub fn write_measurement(
        &mut self,
        size: &str,
        point: usize,
        sample: usize,
        text: &str,
    ) -> Result<bool, SessionError> {
        let value = CellValue::parse(text)
            .ok_or_else(|| SessionError::InvalidMeasurement(text.to_string()))?;
        self.write_cell(size, point, sample, value)
    }

    pub fn clear_cell(&mut self, size: &str, point: usize, sample: usize) -> Result<bool, SessionError> {
        self.entry_mut(size)?.clear_cell(point, sample)
    }

    pub fn set_sample_count(&mut self, size: &str, count: usize) -> Result<(), SessionError> {
        self.entry_mut(size)?.set_sample_count(count)
    }

    /// Live verdict of one cell
    pub fn cell_evaluation(
        &self,
        size: &str,
        point: usize,
        sample: usize,
    ) -> Result<Evaluation, SessionError> {
        let entry = self.entry(size)?;
        let points = self.catalog.points_for(entry.active_key());
        let spec = points
            .get(point)
            .ok_or(SessionError::PointOutOfRange {
                index: point,
                len: points.len(),
            })?
            .size_spec(size);
        let measured = entry.cell(point, sample).map(|v| v.decimal);
        Ok(match spec {
            Some(spec) => evaluate(measured, &spec.tol_minus, &spec.tol_plus),
            None => Evaluation::Unmeasured,
        })
    }

    /// Grid of a size in the working set
    pub fn grid(&self, size: &str) -> Result<GridView, SessionError> {
        let entry = self.entry(size)?;
        let points = self.catalog.points_for(entry.active_key());
        Ok(GridView::build(entry, points, false))
    }

    /// Read-only grid of a committed pair
    pub fn committed_grid(&self, size: &str, key: &ToleranceKey) -> Result<GridView, SessionError> {
        let record = self.ledger.get(size, key).ok_or_else(|| LedgerError::AlreadyOpen {
            size: size.to_string(),
            key: key.clone(),
        })?;
        let entry = SessionEntry::from_record(record);
        Ok(GridView::build(&entry, self.catalog.points_for(key), true))
    }

    pub fn validate(&self, size: &str) -> Result<Vec<ValidationError>, SessionError> {
        let entry = self.entry(size)?;
        Ok(validate(entry, self.catalog.points_for(entry.active_key())))
    }

    /// Commit the key a size is currently on
    pub fn commit_active(&mut self, size: &str) -> Result<CommittedRecord, SessionError> {
        let key = self.entry(size)?.active_key().clone();
        self.commit(size, &key)
    }

    /// Validate and lock a pair
    ///
    /// Nothing changes unless every step succeeds: the record goes into the
    /// ledger, its rows become the phase pattern and the size leaves the
    /// working set.
    pub fn commit(&mut self, size: &str, key: &ToleranceKey) -> Result<CommittedRecord, SessionError> {
        if self.ledger.is_locked(size, key) {
            return Err(LedgerError::AlreadyCommitted {
                size: size.to_string(),
                key: key.clone(),
            }
            .into());
        }
        let position = self.position(size)?;
        let entry = &self.entries[position];
        if entry.active_key() != key {
            return Err(SessionError::KeyNotActive {
                size: size.to_string(),
                active: entry.active_key().clone(),
                requested: key.clone(),
            });
        }

        let points = self.catalog.points_for(key);
        let errors = validate(entry, points);
        if !errors.is_empty() {
            debug!(size, missing = errors.len(), "commit rejected");
            return Err(SessionError::Incomplete(errors));
        }

        let record = build_record(entry, points);
        if record.summary.checked_points < record.points.len() {
            warn!(
                size,
                unevaluated = record.points.len() - record.summary.checked_points,
                "some points have no usable tolerance and were not evaluated"
            );
        }
        self.ledger.insert(record.clone())?;
        self.patterns.record(size, &record.selected_rows);
        self.entries.remove(position);
        self.reopened.remove(size);

        info!(
            phase = %self.phase,
            size,
            key = %key,
            checked = record.summary.checked_points,
            failed = record.summary.fail,
            "committed"
        );
        Ok(record)
    }

    /// Unlock a committed pair and put it back in the working set as it was
    pub fn reopen(&mut self, size: &str, key: &ToleranceKey) -> Result<(), SessionError> {
        if !self.ledger.is_locked(size, key) {
            return Err(LedgerError::AlreadyOpen {
                size: size.to_string(),
                key: key.clone(),
            }
            .into());
        }
        if self.entry(size).is_ok() {
            return Err(SessionError::SizeAlreadyAdded(size.to_string()));
        }

        let record = self.ledger.take(size, key)?;
        self.entries.push(SessionEntry::from_record(&record));
        self.reopened.insert(size.to_string(), record);

        info!(phase = %self.phase, size, key = %key, "reopened");
        Ok(())
    }

    pub fn records(&self) -> &[CommittedRecord] {
        self.ledger.records()
    }

    pub fn summary(&self) -> Summary {
        summarize(self.ledger.records())
    }
}

/// The whole inspection of one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    context: OrderContext,
    /// Sizes of the order; empty accepts any catalog size
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sizes: Vec<Size>,
    default_sample_count: usize,
    #[serde(default)]
    phases: BTreeMap<Phase, PhaseBook>,
}

impl Inspection {
    pub fn new(context: OrderContext, sizes: Vec<Size>, default_sample_count: usize) -> Self {
        Self {
            context,
            sizes,
            default_sample_count: default_sample_count.max(1),
            phases: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &OrderContext {
        &self.context
    }

    pub fn sizes(&self) -> &[Size] {
        &self.sizes
    }

    pub fn default_sample_count(&self) -> usize {
        self.default_sample_count
    }

    /// Install the catalog of a phase
    ///
    /// A phase that already has entries or commits keeps its catalog, since
    /// row positions would no longer line up.
    pub fn load_catalog(&mut self, phase: Phase, catalog: SpecCatalog) -> Result<(), SessionError> {
        if let Some(book) = self.phases.get(&phase) {
            if !book.is_untouched() {
                return Err(SessionError::CatalogInUse(phase));
            }
        }
        info!(
            phase = %phase,
            points = catalog.flat().len(),
            keys = catalog.available_keys().len(),
            "catalog loaded"
        );
        self.phases.insert(phase, PhaseBook::new(phase, catalog));
        Ok(())
    }

    pub fn phases(&self) -> impl Iterator<Item = &PhaseBook> {
        self.phases.values()
    }

    pub fn phase(&self, phase: Phase) -> Result<&PhaseBook, SessionError> {
        self.phases
            .get(&phase)
            .ok_or(SessionError::PhaseNotLoaded(phase))
    }

    pub fn phase_mut(&mut self, phase: Phase) -> Result<&mut PhaseBook, SessionError> {
        self.phases
            .get_mut(&phase)
            .ok_or(SessionError::PhaseNotLoaded(phase))
    }

    /// Add a size to a phase, checking it against the order's size list
    pub fn add_size(
        &mut self,
        phase: Phase,
        size: &str,
        sample_count: Option<usize>,
    ) -> Result<PatternSource, SessionError> {
        let known = if self.sizes.is_empty() {
            self.phase(phase)?.catalog().sizes().iter().any(|s| s == size)
        } else {
            self.sizes.iter().any(|s| s == size)
        };
        if !known {
            return Err(SessionError::UnknownSize(size.to_string()));
        }
        let samples = sample_count.unwrap_or(self.default_sample_count);
        self.phase_mut(phase)?.add_size(size, samples)
    }

    /// Roll-up of every committed record across phases
    pub fn summary(&self) -> Summary {
        self.phases
            .values()
            .map(PhaseBook::summary)
            .fold(Summary::default(), Summary::merge)
    }
}
