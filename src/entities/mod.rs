//! Entity type definitions

pub mod context;
pub mod record;
pub mod spec;

pub use context::{OrderContext, Phase};
pub use record::{CellValue, CommittedRecord, MeasuredPoint};
pub use spec::{MeasurementPointSpec, RawCatalog, RawPoint, RawSizeSpec, Size, SizeSpec, ToleranceKey};
