//! Imperial fraction arithmetic
//!
//! Garment specs are written as imperial fractions ("1/2", "12 3/8", "⅝") and
//! inspectors enter deviations in the same notation. This module converts
//! between that notation and signed decimals.
//!
//! Round-trips are exact for halves, quarters and eighths. Other denominators
//! are best effort: a value is snapped to the first `n/d` (d in 2..=16) within
//! 0.001, and anything else is rendered as a plain decimal.

use serde::{Deserialize, Serialize};

/// Maximum distance between a decimal and the fraction chosen to display it
const SNAP_TOLERANCE: f64 = 0.001;

/// Largest denominator tried by the best-fit search
const MAX_DENOMINATOR: u32 = 16;

/// Eighths rendered by table lookup before the general search
const EIGHTHS: [(f64, &str); 7] = [
    (0.125, "1/8"),
    (0.25, "1/4"),
    (0.375, "3/8"),
    (0.5, "1/2"),
    (0.625, "5/8"),
    (0.75, "3/4"),
    (0.875, "7/8"),
];

/// Unicode vulgar fractions accepted on input
const VULGAR: [(char, &str); 7] = [
    ('½', "1/2"),
    ('¼', "1/4"),
    ('¾', "3/4"),
    ('⅛', "1/8"),
    ('⅜', "3/8"),
    ('⅝', "5/8"),
    ('⅞', "7/8"),
];

/// Parse a fraction string into a signed decimal
///
/// Accepts `"N"`, `"N/D"`, `"W N/D"`, plain decimals and the unicode vulgar
/// fractions (alone or after a whole number). A leading `-` negates the whole
/// magnitude, so `"-1 1/2"` is `-1.5`. Returns `None` for empty input, a lone
/// `"-"`, a zero denominator or anything else that does not parse.
pub fn fraction_to_decimal(text: &str) -> Option<f64> {
    let mut normalized = text.trim().replace('⁄', "/");
    for (ch, ratio) in VULGAR {
        if normalized.contains(ch) {
            normalized = normalized.replace(ch, &format!(" {}", ratio));
        }
    }

    let trimmed = normalized.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }

    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed).trim_start()),
    };

    let magnitude = parse_magnitude(body)?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_magnitude(body: &str) -> Option<f64> {
    let parts: Vec<&str> = body.split_whitespace().collect();
    match parts.as_slice() {
        [single] if single.contains('/') => parse_ratio(single),
        [single] => parse_unsigned(single),
        [whole, ratio] if ratio.contains('/') && !whole.contains('/') => {
            Some(parse_unsigned(whole)? + parse_ratio(ratio)?)
        }
        _ => None,
    }
}

fn parse_ratio(text: &str) -> Option<f64> {
    let (num, den) = text.split_once('/')?;
    let num = parse_unsigned(num)?;
    let den = parse_unsigned(den)?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

fn parse_unsigned(text: &str) -> Option<f64> {
    if text.starts_with(['+', '-']) {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a signed decimal in fraction notation
///
/// The whole part is emitted as a mixed number (`2.75` → `"2 3/4"`) and the
/// sign is kept (`-0.375` → `"-3/8"`). Non-finite input renders as `"-"`.
pub fn decimal_to_fraction(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    let magnitude = value.abs();
    let whole = magnitude.trunc();
    let part = magnitude - whole;

    let body = if part < SNAP_TOLERANCE {
        format_whole(whole)
    } else if 1.0 - part < SNAP_TOLERANCE {
        format_whole(whole + 1.0)
    } else {
        match snap_fraction(part) {
            Some(ratio) if whole == 0.0 => ratio,
            Some(ratio) => format!("{} {}", format_whole(whole), ratio),
            None => magnitude.to_string(),
        }
    };

    if value < 0.0 && body != "0" {
        format!("-{}", body)
    } else {
        body
    }
}

fn format_whole(whole: f64) -> String {
    format!("{:.0}", whole)
}

fn snap_fraction(part: f64) -> Option<String> {
    if let Some((_, text)) = EIGHTHS
        .iter()
        .find(|(v, _)| (v - part).abs() < SNAP_TOLERANCE)
    {
        return Some((*text).to_string());
    }

    (2..=MAX_DENOMINATOR).find_map(|den| {
        let den_f = f64::from(den);
        let num = (part * den_f).round();
        if num > 0.0 && num < den_f && (num / den_f - part).abs() < SNAP_TOLERANCE {
            Some(format!("{}/{}", num as u32, den))
        } else {
            None
        }
    })
}

/// A spec value as written in the catalog, with its parsed decimal
///
/// Catalog data is not trusted: a value that does not parse keeps its source
/// text but has no decimal, and displays as `-`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FractionRepr", into = "String")]
pub struct Fraction {
    text: String,
    value: Option<f64>,
}

/// Catalog files may carry spec values as strings or bare numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum FractionRepr {
    Text(String),
    Number(f64),
}

impl From<FractionRepr> for Fraction {
    fn from(repr: FractionRepr) -> Self {
        match repr {
            FractionRepr::Text(text) => Fraction::parse(text),
            FractionRepr::Number(n) => Fraction::parse(n.to_string()),
        }
    }
}

impl Fraction {
    /// Parse a spec value, keeping the source text
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into().trim().to_string();
        let value = fraction_to_decimal(&text);
        Self { text, value }
    }

    /// The zero value used for unspecified tolerances
    pub fn zero() -> Self {
        Self::parse("0")
    }

    /// Source text as written in the catalog
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed decimal, `None` when the text is malformed
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn is_malformed(&self) -> bool {
        self.value.is_none()
    }

    /// Display with an explicit sign, as tolerance columns show them
    ///
    /// `sign` is `'-'` or `'+'`. Zero is shown bare and malformed values as `-`.
    pub fn signed_display(&self, sign: char) -> String {
        match self.value {
            None => "-".to_string(),
            Some(v) if v == 0.0 => "0".to_string(),
            Some(_) => {
                let bare = self.text.trim_start_matches(['+', '-']);
                format!("{}{}", sign, bare)
            }
        }
    }
}

impl From<String> for Fraction {
    fn from(text: String) -> Self {
        Fraction::parse(text)
    }
}

impl From<&str> for Fraction {
    fn from(text: &str) -> Self {
        Fraction::parse(text)
    }
}

impl From<Fraction> for String {
    fn from(fraction: Fraction) -> Self {
        fraction.text
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.value.is_some() {
            write!(f, "{}", self.text)
        } else {
            write!(f, "-")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_forms() {
        assert_eq!(fraction_to_decimal("3"), Some(3.0));
        assert_eq!(fraction_to_decimal("1/2"), Some(0.5));
        assert_eq!(fraction_to_decimal("12 3/8"), Some(12.375));
        assert_eq!(fraction_to_decimal("0.25"), Some(0.25));
        assert_eq!(fraction_to_decimal("+1/4"), Some(0.25));
    }

    #[test]
    fn test_parse_vulgar_fractions() {
        assert_eq!(fraction_to_decimal("½"), Some(0.5));
        assert_eq!(fraction_to_decimal("⅞"), Some(0.875));
        assert_eq!(fraction_to_decimal("1½"), Some(1.5));
        assert_eq!(fraction_to_decimal("2 ¾"), Some(2.75));
        assert_eq!(fraction_to_decimal("3⁄8"), Some(0.375));
    }

    #[test]
    fn test_leading_minus_negates_whole_magnitude() {
        assert_eq!(fraction_to_decimal("-1/2"), Some(-0.5));
        assert_eq!(fraction_to_decimal("-1 1/2"), Some(-1.5));
        assert_eq!(fraction_to_decimal("-⅜"), Some(-0.375));
    }

    #[test]
    fn test_unparsable_input_is_none() {
        assert_eq!(fraction_to_decimal(""), None);
        assert_eq!(fraction_to_decimal("   "), None);
        assert_eq!(fraction_to_decimal("-"), None);
        assert_eq!(fraction_to_decimal("1/0"), None);
        assert_eq!(fraction_to_decimal("abc"), None);
        assert_eq!(fraction_to_decimal("1/2/3"), None);
        assert_eq!(fraction_to_decimal("1 2 3/4"), None);
        assert_eq!(fraction_to_decimal("--1"), None);
        assert_eq!(fraction_to_decimal("inf"), None);
    }

    #[test]
    fn test_eighths_round_trip() {
        for eighths in 1..8 {
            let d = f64::from(eighths) / 8.0;
            for value in [d, -d] {
                let text = decimal_to_fraction(value);
                assert_eq!(fraction_to_decimal(&text), Some(value), "via {text}");
            }
        }
    }

    #[test]
    fn test_decimal_to_fraction_forms() {
        assert_eq!(decimal_to_fraction(0.0), "0");
        assert_eq!(decimal_to_fraction(-0.0), "0");
        assert_eq!(decimal_to_fraction(2.0), "2");
        assert_eq!(decimal_to_fraction(0.5), "1/2");
        assert_eq!(decimal_to_fraction(-0.375), "-3/8");
        assert_eq!(decimal_to_fraction(2.75), "2 3/4");
        assert_eq!(decimal_to_fraction(0.0625), "1/16");
        assert_eq!(decimal_to_fraction(0.3), "3/10");
        assert_eq!(decimal_to_fraction(0.123), "0.123");
        assert_eq!(decimal_to_fraction(0.9996), "1");
        assert_eq!(decimal_to_fraction(f64::NAN), "-");
    }

    #[test]
    fn test_fraction_keeps_malformed_text() {
        let ok = Fraction::parse(" 1/4 ");
        assert_eq!(ok.text(), "1/4");
        assert_eq!(ok.value(), Some(0.25));
        assert_eq!(ok.to_string(), "1/4");

        let bad = Fraction::parse("1/x");
        assert!(bad.is_malformed());
        assert_eq!(bad.text(), "1/x");
        assert_eq!(bad.to_string(), "-");
    }

    #[test]
    fn test_signed_display() {
        assert_eq!(Fraction::parse("1/4").signed_display('-'), "-1/4");
        assert_eq!(Fraction::parse("-1/4").signed_display('-'), "-1/4");
        assert_eq!(Fraction::parse("1/2").signed_display('+'), "+1/2");
        assert_eq!(Fraction::parse("0").signed_display('+'), "0");
        assert_eq!(Fraction::parse("").signed_display('+'), "-");
    }

    #[test]
    fn test_fraction_deserializes_numbers_and_strings() {
        let values: Vec<Fraction> = serde_yml::from_str("- 1/2\n- 0.25\n- 3\n").unwrap();
        assert_eq!(values[0].value(), Some(0.5));
        assert_eq!(values[1].value(), Some(0.25));
        assert_eq!(values[2].value(), Some(3.0));
        let text = serde_yml::to_string(&values[0]).unwrap();
        let back: Fraction = serde_yml::from_str(&text).unwrap();
        assert_eq!(back, values[0]);
        assert_eq!(back.to_string(), "1/2");
    }
}
