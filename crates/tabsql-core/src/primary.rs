use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;

/// Three-valued logic result. Distinct from [`Primary::Boolean`]: a `Ternary`
/// is what a predicate (comparison, `AND`/`OR`/`NOT`, `IN`, ...) evaluates
/// to, while `Primary::Boolean` is how a three-valued boolean is represented
/// when it is *stored* data (a column value, a literal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ternary {
    True,
    False,
    #[default]
    Unknown,
}

impl Ternary {
    pub fn from_bool(b: bool) -> Self {
        if b { Ternary::True } else { Ternary::False }
    }

    pub fn is_true(self) -> bool {
        matches!(self, Ternary::True)
    }

    pub fn not(self) -> Ternary {
        match self {
            Ternary::True => Ternary::False,
            Ternary::False => Ternary::True,
            Ternary::Unknown => Ternary::Unknown,
        }
    }

    pub fn and(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::False, _) | (_, Ternary::False) => Ternary::False,
            (Ternary::True, Ternary::True) => Ternary::True,
            _ => Ternary::Unknown,
        }
    }

    pub fn or(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::True, _) | (_, Ternary::True) => Ternary::True,
            (Ternary::False, Ternary::False) => Ternary::False,
            _ => Ternary::Unknown,
        }
    }
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ternary::True => f.write_str("TRUE"),
            Ternary::False => f.write_str("FALSE"),
            Ternary::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// A dynamically-typed scalar: SQL's value kind.
#[derive(Debug, Clone)]
pub enum Primary {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(Ternary),
    Datetime(NaiveDateTime),
    Null,
}

impl Primary {
    pub fn is_null(&self) -> bool {
        matches!(self, Primary::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Primary::String(_) => "string",
            Primary::Integer(_) => "integer",
            Primary::Float(_) => "float",
            Primary::Boolean(_) => "boolean",
            Primary::Datetime(_) => "datetime",
            Primary::Null => "null",
        }
    }

    /// Coerces this value to a [`Ternary`] the way a predicate context does:
    /// `Null` and a boolean `Unknown` both become `Unknown`; any other value
    /// is an evaluation error at the caller (a non-boolean in a predicate
    /// position), represented here as `Unknown` per SQL's "not true" rule.
    pub fn as_ternary(&self) -> Ternary {
        match self {
            Primary::Boolean(t) => *t,
            Primary::Null => Ternary::Unknown,
            _ => Ternary::Unknown,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Primary::Integer(i) => Some(*i as f64),
            Primary::Float(f) => Some(*f),
            Primary::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Primary::Integer(i) => Some(*i),
            Primary::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Primary::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_str_display(&self) -> String {
        match self {
            Primary::String(s) => s.clone(),
            Primary::Integer(i) => i.to_string(),
            Primary::Float(f) => f.to_string(),
            Primary::Boolean(t) => t.to_string(),
            Primary::Datetime(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
            Primary::Null => String::new(),
        }
    }
}

/// Numeric widening: if either side is a Float, both widen to Float.
/// Mixed Integer/Integer stays Integer. Anything else is not numeric.
pub enum Numeric {
    Integer(i64, i64),
    Float(f64, f64),
}

pub fn coerce_numeric(a: &Primary, b: &Primary) -> Option<Numeric> {
    match (a, b) {
        (Primary::Integer(x), Primary::Integer(y)) => Some(Numeric::Integer(*x, *y)),
        _ => {
            let x = a.as_f64()?;
            let y = b.as_f64()?;
            Some(Numeric::Float(x, y))
        }
    }
}

/// SQL equality/ordering: Null compares Unknown (so equality against Null is
/// never true), strings compare codepoint-wise, numeric mixing widens to
/// Float, Booleans compare as Ternary, Datetimes compare chronologically.
pub fn compare(a: &Primary, b: &Primary) -> Ternary {
    if a.is_null() || b.is_null() {
        return Ternary::Unknown;
    }

    match (a, b) {
        (Primary::String(x), Primary::String(y)) => Ternary::from_bool(x == y).and(ord_eq(x.cmp(y))),
        (Primary::Boolean(x), Primary::Boolean(y)) => Ternary::from_bool(x == y),
        (Primary::Datetime(x), Primary::Datetime(y)) => Ternary::from_bool(x == y),
        _ => match coerce_numeric(a, b) {
            Some(Numeric::Integer(x, y)) => Ternary::from_bool(x == y),
            Some(Numeric::Float(x, y)) => Ternary::from_bool(x == y),
            None => Ternary::Unknown,
        },
    }
}

fn ord_eq(o: Ordering) -> Ternary {
    Ternary::from_bool(o == Ordering::Equal)
}

/// Three-way ordering comparison used by `<`, `<=`, `>`, `>=` and `ORDER BY`.
/// Returns `None` when the two values cannot be ordered (e.g. either is
/// `Null`), in which case the caller treats the predicate as `Unknown`.
pub fn order(a: &Primary, b: &Primary) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }

    match (a, b) {
        (Primary::String(x), Primary::String(y)) => Some(x.as_str().cmp(y.as_str())),
        (Primary::Datetime(x), Primary::Datetime(y)) => Some(x.cmp(y)),
        (Primary::Boolean(x), Primary::Boolean(y)) => Some(ternary_rank(*x).cmp(&ternary_rank(*y))),
        _ => match coerce_numeric(a, b) {
            Some(Numeric::Integer(x, y)) => Some(x.cmp(&y)),
            Some(Numeric::Float(x, y)) => x.partial_cmp(&y),
            None => None,
        },
    }
}

fn ternary_rank(t: Ternary) -> u8 {
    match t {
        Ternary::False => 0,
        Ternary::Unknown => 1,
        Ternary::True => 2,
    }
}

impl PartialEq for Primary {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other).is_true()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_compares_unknown() {
        assert_eq!(compare(&Primary::Null, &Primary::Integer(1)), Ternary::Unknown);
        assert_eq!(compare(&Primary::Null, &Primary::Null), Ternary::Unknown);
    }

    #[test]
    fn numeric_mixing_widens_to_float() {
        let a = Primary::Integer(2);
        let b = Primary::Float(2.0);
        assert_eq!(compare(&a, &b), Ternary::True);
    }

    #[test]
    fn strings_compare_codepoint_wise() {
        assert_eq!(order(&Primary::String("a".into()), &Primary::String("b".into())), Some(Ordering::Less));
    }

    #[test]
    fn ternary_kleene_logic() {
        assert_eq!(Ternary::Unknown.and(Ternary::False), Ternary::False);
        assert_eq!(Ternary::Unknown.or(Ternary::True), Ternary::True);
        assert_eq!(Ternary::Unknown.and(Ternary::True), Ternary::Unknown);
    }
}
