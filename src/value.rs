// Scalar cell values and rows as delivered by the data binding

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single cell. Rows arrive as JSON objects, so this mirrors the JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// An ordered mapping from column name to value.
pub type Row = IndexMap<String, Value>;

static NULL: Value = Value::Null;

/// Look up a column in a row; absent columns read as null.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

impl Value {
    /// Numeric coercion with the same rules the charting layer has always
    /// used: null is not a number, blank text is zero, other text must parse.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Value::Null => return None,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().ok()?
                }
            }
        };
        if n.is_nan() {
            None
        } else {
            Some(n)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Hashable identity used for grouping. Values group together only when
    /// they are exactly equal, so `1` and `"1"` are different groups.
    pub fn group_key(&self) -> GroupKey {
        match self {
            Value::Null => GroupKey::Null,
            Value::Bool(b) => GroupKey::Bool(*b),
            // -0.0 and 0.0 compare equal and must share a group
            Value::Number(n) if *n == 0.0 => GroupKey::Number(0.0f64.to_bits()),
            Value::Number(n) => GroupKey::Number(n.to_bits()),
            Value::Text(s) => GroupKey::Text(s.clone()),
        }
    }

    /// The string form used for lexicographic axis sorting.
    pub fn to_key_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Number to string the way JavaScript's `String(n)` does it: plain
/// decimals for exponents in -7..21, exponent form outside.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.25e-7"
    let sci = format!("{:e}", n.abs());
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return n.to_string(),
    };
    let exponent: i32 = match exponent.parse() {
        Ok(e) => e,
        Err(_) => return n.to_string(),
    };
    let digits = mantissa.replace('.', "");
    let sign = if n < 0.0 { "-" } else { "" };

    let body = if (-7..21).contains(&exponent) {
        let width = digits.len() as i32;
        if exponent >= width - 1 {
            format!("{}{}", digits, "0".repeat((exponent - width + 1) as usize))
        } else if exponent >= 0 {
            let (whole, frac) = digits.split_at(exponent as usize + 1);
            format!("{}.{}", whole, frac)
        } else {
            format!("0.{}{}", "0".repeat((-exponent - 1) as usize), digits)
        }
    } else {
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() { String::new() } else { format!(".{}", rest) };
        let exp_sign = if exponent >= 0 { "+" } else { "-" };
        format!("{}{}e{}{}", first, rest, exp_sign, exponent.abs())
    };
    format!("{}{}", sign, body)
}

/// Collation for key strings. Letters compare case-insensitively first and
/// lowercase sorts before uppercase on ties. Digits are not read as numbers,
/// so "10" < "9".
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = |s: &str| -> Vec<char> { s.chars().flat_map(char::to_lowercase).collect() };
    let cases = |s: &str| -> Vec<bool> { s.chars().map(char::is_uppercase).collect() };
    folded(a)
        .cmp(&folded(b))
        .then_with(|| cases(a).cmp(&cases(b)))
        .then_with(|| a.cmp(b))
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Null,
    Bool(bool),
    Number(u64),
    Text(String),
}
