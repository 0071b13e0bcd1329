//! Tolerance evaluation for recorded deviations
//!
//! A single pure function classifies a deviation against a spec's plus/minus
//! band. Live cell display and commit classification both call it, so a cell
//! never shows a different verdict than the one that gets saved.

use serde::{Deserialize, Serialize};

use crate::core::fraction::Fraction;

/// Classification of one measured cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    /// Within the band, boundaries included
    Pass,
    /// Below the minus tolerance
    FailMinus,
    /// Above the plus tolerance
    FailPlus,
    /// No value, or the spec band could not be parsed
    Unmeasured,
}

impl Evaluation {
    pub fn is_fail(&self) -> bool {
        matches!(self, Evaluation::FailMinus | Evaluation::FailPlus)
    }

    /// The committed result, if this evaluation produced one
    pub fn result(&self) -> Option<PointResult> {
        match self {
            Evaluation::Pass => Some(PointResult::Pass),
            Evaluation::FailMinus => Some(PointResult::FailMinus),
            Evaluation::FailPlus => Some(PointResult::FailPlus),
            Evaluation::Unmeasured => None,
        }
    }
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evaluation::Pass => write!(f, "pass"),
            Evaluation::FailMinus => write!(f, "fail-"),
            Evaluation::FailPlus => write!(f, "fail+"),
            Evaluation::Unmeasured => write!(f, "-"),
        }
    }
}

/// Result stored on a committed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointResult {
    Pass,
    FailPlus,
    FailMinus,
}

impl PointResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, PointResult::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, PointResult::FailPlus | PointResult::FailMinus)
    }
}

impl std::fmt::Display for PointResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointResult::Pass => write!(f, "pass"),
            PointResult::FailPlus => write!(f, "fail+"),
            PointResult::FailMinus => write!(f, "fail-"),
        }
    }
}

/// Classify a deviation against a tolerance band
///
/// The band is `[-|tol_minus|, +tol_plus]`, inclusive on both ends. The minus
/// tolerance may be written with or without its sign.
pub fn evaluate(measured: Option<f64>, tol_minus: &Fraction, tol_plus: &Fraction) -> Evaluation {
    let Some(measured) = measured else {
        return Evaluation::Unmeasured;
    };
    let (Some(minus), Some(plus)) = (tol_minus.value(), tol_plus.value()) else {
        return Evaluation::Unmeasured;
    };

    let lower = -minus.abs();
    if measured < lower {
        Evaluation::FailMinus
    } else if measured > plus {
        Evaluation::FailPlus
    } else {
        Evaluation::Pass
    }
}
