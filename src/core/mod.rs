//! Core module - measurement engine and its collaborators

pub mod catalog;
pub mod config;
pub mod fraction;
pub mod inspection;
pub mod ledger;
pub mod loader;
pub mod pattern;
pub mod session;
pub mod store;
pub mod summary;
pub mod tolerance;
pub mod workspace;

pub use catalog::{KeyGroup, MalformedSpec, SpecCatalog};
pub use config::{Config, ConfigError};
pub use fraction::{decimal_to_fraction, fraction_to_decimal, Fraction};
pub use inspection::{GridCell, GridRow, GridView, Inspection, PairStatus, PhaseBook};
pub use ledger::{build_record, validate, CommitLedger, LedgerError, ValidationError};
pub use loader::{load_catalog, CatalogFormat, LoadError};
pub use pattern::{PatternPropagator, PatternSource};
pub use session::{CellRef, SelectionMask, SessionEntry, SessionError};
pub use store::{CommitSink, SqliteStore, StoreError, StoredRecord};
pub use summary::{failing_points, point_breakdown, summarize, PointTally, Summary};
pub use tolerance::{evaluate, Evaluation, PointResult};
pub use workspace::{Workspace, WorkspaceError};
