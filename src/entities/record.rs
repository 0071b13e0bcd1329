//! Recorded measurements and committed records

use serde::{Deserialize, Serialize};

use crate::core::fraction::{decimal_to_fraction, fraction_to_decimal, Fraction};
use crate::core::session::SelectionMask;
use crate::core::summary::Summary;
use crate::core::tolerance::PointResult;
use crate::entities::spec::{Size, ToleranceKey};

/// A recorded deviation from nominal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellValue {
    /// Signed deviation from the nominal spec value
    pub decimal: f64,
    /// Display form of the deviation
    pub fraction: String,
}

impl CellValue {
    pub fn new(decimal: f64, fraction: impl Into<String>) -> Self {
        Self {
            decimal,
            fraction: fraction.into(),
        }
    }

    /// Value seeded into freshly selected cells
    pub fn zero() -> Self {
        Self::new(0.0, "0")
    }

    pub fn from_decimal(decimal: f64) -> Self {
        Self::new(decimal, decimal_to_fraction(decimal))
    }

    /// Parse an inspector entry such as `-1/8` or `1 1/4`
    pub fn parse(text: &str) -> Option<Self> {
        fraction_to_decimal(text).map(|decimal| Self::new(decimal, text.trim()))
    }
}

/// One measured cell of a committed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredPoint {
    /// Row position within the tolerance key's point list
    pub point_index: usize,
    /// Zero-based sample (piece) index
    pub sample_index: usize,
    pub point_name: String,
    pub measured: CellValue,
    pub nominal: Fraction,
    pub tol_minus: Fraction,
    pub tol_plus: Fraction,
    /// `None` when the spec band did not parse
    #[serde(default)]
    pub result: Option<PointResult>,
}

/// Finalized measurements of one (size, tolerance key) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedRecord {
    pub size: Size,
    pub tolerance_key: ToleranceKey,
    pub sample_count: usize,
    pub selected_rows: SelectionMask,
    pub full_columns: SelectionMask,
    /// Measured cells in (sample, point) order
    pub points: Vec<MeasuredPoint>,
    pub summary: Summary,
}

impl CommittedRecord {
    /// Whether this record belongs to the given pair
    pub fn is_for(&self, size: &str, key: &ToleranceKey) -> bool {
        self.size == size && &self.tolerance_key == key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_parse_keeps_entry_text() {
        let value = CellValue::parse(" -1/8 ").unwrap();
        assert_eq!(value.decimal, -0.125);
        assert_eq!(value.fraction, "-1/8");
        assert!(CellValue::parse("x").is_none());
    }

    #[test]
    fn test_cell_value_from_decimal() {
        assert_eq!(CellValue::from_decimal(0.25), CellValue::new(0.25, "1/4"));
        assert_eq!(CellValue::from_decimal(0.0), CellValue::zero());
    }
}
