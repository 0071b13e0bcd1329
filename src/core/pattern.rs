//! Row-selection reuse across sizes
//!
//! When a size is added or switched to a new key, its rows start from a
//! remembered selection instead of blank. Sources, in order:
//!
//! 1. the phase-wide pattern, when its length matches the point count
//! 2. the most recent committed selection of the same size, same rule
//! 3. nothing selected

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::session::SelectionMask;
use crate::entities::spec::Size;

/// Where an applied selection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSource {
    Global,
    SizeHistory,
    Empty,
}

impl std::fmt::Display for PatternSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternSource::Global => write!(f, "phase pattern"),
            PatternSource::SizeHistory => write!(f, "last commit of this size"),
            PatternSource::Empty => write!(f, "no pattern"),
        }
    }
}

/// Remembered selections for one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternPropagator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    global: Option<SelectionMask>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    by_size: BTreeMap<Size, SelectionMask>,
}

impl PatternPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> Option<&SelectionMask> {
        self.global.as_ref()
    }

    pub fn for_size(&self, size: &str) -> Option<&SelectionMask> {
        self.by_size.get(size)
    }

    /// Initial selection for `size` with `point_count` rows
    pub fn apply(&self, size: &str, point_count: usize) -> (SelectionMask, PatternSource) {
        if let Some(global) = self.global.as_ref().filter(|m| m.len() == point_count) {
            debug!(size, "applying phase pattern");
            return (global.clone(), PatternSource::Global);
        }
        if let Some(recent) = self.by_size.get(size).filter(|m| m.len() == point_count) {
            debug!(size, "applying selection from last commit");
            return (recent.clone(), PatternSource::SizeHistory);
        }
        (SelectionMask::new(point_count), PatternSource::Empty)
    }

    /// Remember a committed selection as both the phase pattern and the size's own
    pub fn record(&mut self, size: &str, selected_rows: &SelectionMask) {
        self.global = Some(selected_rows.clone());
        self.by_size.insert(size.to_string(), selected_rows.clone());
    }
}
