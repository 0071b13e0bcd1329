//! Order context and inspection phases

use serde::{Deserialize, Serialize};

/// Identifies the production order being inspected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderContext {
    pub order_no: String,
    pub color: String,
}

impl OrderContext {
    pub fn new(order_no: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            order_no: order_no.into(),
            color: color.into(),
        }
    }
}

impl std::fmt::Display for OrderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.order_no, self.color)
    }
}

/// Inspection phase; each keeps its own catalog, ledger and patterns
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    BeforeWash,
    AfterWash,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[Phase::BeforeWash, Phase::AfterWash]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeWash => "before_wash",
            Phase::AfterWash => "after_wash",
        }
    }

    /// Human label used in tables
    pub fn label(&self) -> &'static str {
        match self {
            Phase::BeforeWash => "Before Wash",
            Phase::AfterWash => "After Wash",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "before_wash" | "before" | "bw" => Ok(Phase::BeforeWash),
            "after_wash" | "after" | "aw" => Ok(Phase::AfterWash),
            _ => Err(format!("Unknown phase: {} (expected before or after)", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parse_aliases() {
        assert_eq!("before".parse::<Phase>().unwrap(), Phase::BeforeWash);
        assert_eq!("After Wash".parse::<Phase>().unwrap(), Phase::AfterWash);
        assert_eq!("after-wash".parse::<Phase>().unwrap(), Phase::AfterWash);
        assert!("during".parse::<Phase>().is_err());
    }

    #[test]
    fn test_phase_display_round_trips() {
        for phase in Phase::all() {
            assert_eq!(phase.to_string().parse::<Phase>().unwrap(), *phase);
        }
    }
}
