//! Spec catalog - measurement points grouped by tolerance key
//!
//! Built once per (order, color, phase) from the raw payload. Point order
//! within a key never changes after load; session rows are identified by
//! their position in [`SpecCatalog::points_for`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::fraction::Fraction;
use crate::entities::spec::{MeasurementPointSpec, RawCatalog, Size, SizeSpec, ToleranceKey};

/// Points sharing one tolerance key, `NA` points included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyGroup {
    pub key: ToleranceKey,
    pub points: Vec<MeasurementPointSpec>,
}

/// A spec value that could not be parsed
///
/// Recovered locally: the affected cell evaluates as unmeasured and the value
/// displays as `-`.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedSpec {
    pub point_id: String,
    pub point_name: String,
    pub size: Size,
    pub field: &'static str,
    pub text: String,
}

impl std::fmt::Display for MalformedSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) size {}: {} '{}' is not a fraction",
            self.point_name, self.point_id, self.size, self.field, self.text
        )
    }
}

/// Measurement point catalog for one spec context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecCatalog {
    sizes: Vec<Size>,
    /// Every point in catalog order
    flat: Vec<MeasurementPointSpec>,
    /// Points with the `NA` key
    any: Vec<MeasurementPointSpec>,
    /// Keyed groups in first-seen order
    groups: Vec<KeyGroup>,
}

impl SpecCatalog {
    /// Build a catalog from the raw payload
    ///
    /// Never fails on bad spec values; see [`SpecCatalog::malformed`].
    pub fn load(raw: RawCatalog) -> Self {
        let mut sizes: Vec<Size> = raw.sizes.clone();
        let mut flat = Vec::with_capacity(raw.points.len());

        for (index, point) in raw.points.into_iter().enumerate() {
            let point_id = point
                .point_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("P{:03}", index + 1));
            let name_eng = if point.name_eng.trim().is_empty() {
                format!("Point {}", index + 1)
            } else {
                point.name_eng.trim().to_string()
            };

            let mut per_size = BTreeMap::new();
            for entry in point.sizes {
                if raw.sizes.is_empty() && !sizes.contains(&entry.size) {
                    sizes.push(entry.size.clone());
                }
                let spec = SizeSpec {
                    nominal: entry.nominal,
                    tol_minus: entry
                        .tol_minus
                        .or_else(|| point.tol_minus.clone())
                        .unwrap_or_else(Fraction::zero),
                    tol_plus: entry
                        .tol_plus
                        .or_else(|| point.tol_plus.clone())
                        .unwrap_or_else(Fraction::zero),
                };
                if per_size.insert(entry.size.clone(), spec).is_some() {
                    tracing::warn!(point = %point_id, size = %entry.size, "duplicate size entry, keeping the last one");
                }
            }

            flat.push(MeasurementPointSpec {
                point_id,
                name_eng,
                name_local: point.name_local.filter(|n| !n.trim().is_empty()),
                tolerance_key: ToleranceKey::new(point.tolerance_key.unwrap_or_default()),
                per_size,
            });
        }

        let mut keys: Vec<ToleranceKey> = Vec::new();
        for point in &flat {
            if !point.tolerance_key.is_any() && !keys.contains(&point.tolerance_key) {
                keys.push(point.tolerance_key.clone());
            }
        }

        let groups = keys
            .into_iter()
            .map(|key| KeyGroup {
                points: flat
                    .iter()
                    .filter(|p| p.tolerance_key == key || p.tolerance_key.is_any())
                    .cloned()
                    .collect(),
                key,
            })
            .collect();

        let any = flat
            .iter()
            .filter(|p| p.tolerance_key.is_any())
            .cloned()
            .collect();

        let catalog = Self {
            sizes,
            flat,
            any,
            groups,
        };

        for issue in catalog.malformed() {
            tracing::warn!(
                point = %issue.point_id,
                size = %issue.size,
                field = issue.field,
                value = %issue.text,
                "malformed spec value"
            );
        }

        catalog
    }

    /// Sizes in catalog order
    pub fn sizes(&self) -> &[Size] {
        &self.sizes
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    /// Every point in catalog order
    pub fn flat(&self) -> &[MeasurementPointSpec] {
        &self.flat
    }

    /// Points that apply under any key
    pub fn any_key_points(&self) -> &[MeasurementPointSpec] {
        &self.any
    }

    /// Effective tolerance keys in catalog insertion order
    ///
    /// A catalog made only of `NA` points has the single key `NA`.
    pub fn available_keys(&self) -> Vec<ToleranceKey> {
        if self.groups.is_empty() {
            if self.any.is_empty() {
                Vec::new()
            } else {
                vec![ToleranceKey::any()]
            }
        } else {
            self.groups.iter().map(|g| g.key.clone()).collect()
        }
    }

    pub fn has_key(&self, key: &ToleranceKey) -> bool {
        self.available_keys().contains(key)
    }

    /// Points measured under a key, in row order
    ///
    /// With a single effective key this is the flat list; otherwise the
    /// key's group (including `NA` points); unknown keys give no points.
    pub fn points_for(&self, key: &ToleranceKey) -> &[MeasurementPointSpec] {
        let keys = self.available_keys();
        if keys.len() == 1 && (&keys[0] == key || key.is_any()) {
            return &self.flat;
        }
        self.groups
            .iter()
            .find(|g| &g.key == key)
            .map(|g| g.points.as_slice())
            .unwrap_or(&[])
    }

    pub fn point_count(&self, key: &ToleranceKey) -> usize {
        self.points_for(key).len()
    }

    /// Spec values that did not parse, in catalog order
    pub fn malformed(&self) -> Vec<MalformedSpec> {
        self.flat
            .iter()
            .flat_map(|point| {
                point
                    .malformed_fields()
                    .into_iter()
                    .map(move |(size, field, value)| MalformedSpec {
                        point_id: point.point_id.clone(),
                        point_name: point.name_eng.clone(),
                        size: size.to_string(),
                        field,
                        text: value.text().to_string(),
                    })
            })
            .collect()
    }
}
