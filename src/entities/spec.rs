//! Measurement point specifications
//!
//! A measurement point ("Waist relaxed", "Front rise") carries a nominal spec
//! value and a plus/minus tolerance band for every size of the style. Points
//! are grouped by tolerance key (the "K-value"); the key `NA` marks points that
//! apply under every key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::fraction::Fraction;

/// Size label as supplied by the order; ordering comes from the catalog
pub type Size = String;

/// Tolerance group identifier ("K-value")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToleranceKey(String);

impl ToleranceKey {
    /// Sentinel for points that apply regardless of K-value
    pub const ANY: &'static str = "NA";

    /// Create a key, mapping blank input and any casing of `na` to the `NA` sentinel
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into().trim().to_string();
        if key.is_empty() || key.eq_ignore_ascii_case(Self::ANY) {
            Self::any()
        } else {
            Self(key)
        }
    }

    pub fn any() -> Self {
        Self(Self::ANY.to_string())
    }

    pub fn is_any(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::ANY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tab label shown to inspectors: `General` for `NA`, `K-1` for `1`
    pub fn label(&self) -> String {
        if self.is_any() {
            "General".to_string()
        } else if self.0.chars().all(|c| c.is_ascii_digit()) {
            format!("K-{}", self.0)
        } else {
            self.0.clone()
        }
    }
}

impl std::fmt::Display for ToleranceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ToleranceKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ToleranceKey::new(s))
    }
}

/// Nominal value and tolerance band of a point for one size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeSpec {
    pub nominal: Fraction,
    pub tol_minus: Fraction,
    pub tol_plus: Fraction,
}

/// A measurement point of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPointSpec {
    pub point_id: String,

    /// English point name
    pub name_eng: String,

    /// Local-language point name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_local: Option<String>,

    pub tolerance_key: ToleranceKey,

    /// Spec values by size label
    pub per_size: BTreeMap<Size, SizeSpec>,
}

impl MeasurementPointSpec {
    pub fn size_spec(&self, size: &str) -> Option<&SizeSpec> {
        self.per_size.get(size)
    }

    /// Spec fractions of this point that did not parse
    pub fn malformed_fields(&self) -> Vec<(&str, &'static str, &Fraction)> {
        let mut out = Vec::new();
        for (size, spec) in &self.per_size {
            for (field, value) in [
                ("nominal", &spec.nominal),
                ("tol_minus", &spec.tol_minus),
                ("tol_plus", &spec.tol_plus),
            ] {
                if value.is_malformed() {
                    out.push((size.as_str(), field, value));
                }
            }
        }
        out
    }
}

// =========================================================================
// Catalog payload as supplied by the spec source
// =========================================================================

/// Raw catalog payload for one (style, color, phase)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCatalog {
    /// Size order; when empty, sizes are taken in first-seen order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<Size>,

    #[serde(default)]
    pub points: Vec<RawPoint>,
}

/// One point of the raw payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_id: Option<String>,

    #[serde(default, alias = "name")]
    pub name_eng: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_local: Option<String>,

    #[serde(
        default,
        alias = "k_value",
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub tolerance_key: Option<String>,

    /// Point-level tolerance, used where a size entry gives none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tol_minus: Option<Fraction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tol_plus: Option<Fraction>,

    #[serde(default)]
    pub sizes: Vec<RawSizeSpec>,
}

/// Spec values of a raw point for one size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSizeSpec {
    pub size: Size,

    #[serde(default = "missing_value")]
    pub nominal: Fraction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tol_minus: Option<Fraction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tol_plus: Option<Fraction>,
}

fn missing_value() -> Fraction {
    Fraction::parse("-")
}

/// K-values are often written as bare numbers (`tolerance_key: 1`)
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum KeyRepr {
        Text(String),
        Integer(i64),
        Number(f64),
    }

    Ok(Option::<KeyRepr>::deserialize(deserializer)?.map(|repr| match repr {
        KeyRepr::Text(s) => s,
        KeyRepr::Integer(n) => n.to_string(),
        KeyRepr::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_key_blank_is_any() {
        assert!(ToleranceKey::new("").is_any());
        assert!(ToleranceKey::new("  ").is_any());
        assert!(ToleranceKey::new("na").is_any());
        assert!(!ToleranceKey::new("1").is_any());
        assert_eq!(ToleranceKey::new("na"), ToleranceKey::any());
        assert_eq!(ToleranceKey::new(" Na ").as_str(), "NA");
    }

    #[test]
    fn test_tolerance_key_label() {
        assert_eq!(ToleranceKey::any().label(), "General");
        assert_eq!(ToleranceKey::new("2").label(), "K-2");
        assert_eq!(ToleranceKey::new("Slim").label(), "Slim");
    }

    #[test]
    fn test_raw_point_accepts_aliases() {
        let yaml = "name: Waist\nk_value: '1'\nsizes:\n  - size: M\n    nominal: 30 1/2\n";
        let point: RawPoint = serde_yml::from_str(yaml).unwrap();
        assert_eq!(point.name_eng, "Waist");
        assert_eq!(point.tolerance_key.as_deref(), Some("1"));
        assert_eq!(point.sizes[0].nominal.value(), Some(30.5));
        assert!(point.sizes[0].tol_minus.is_none());
    }

    #[test]
    fn test_numeric_tolerance_key() {
        let point: RawPoint = serde_yml::from_str("name: Hip
tolerance_key: 2
").unwrap();
        assert_eq!(point.tolerance_key.as_deref(), Some("2"));
    }

    #[test]
    fn test_missing_nominal_is_malformed() {
        let yaml = "size: M\ntol_minus: 1/4\n";
        let spec: RawSizeSpec = serde_yml::from_str(yaml).unwrap();
        assert!(spec.nominal.is_malformed());
    }
}
