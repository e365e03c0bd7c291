//! Cell values and declared field types.
//!
//! Numbers compare by value across representations: `Int(1)` and `Float(1.0)`
//! are equal, order the same and hash the same, so keys survive a trip through
//! a format that stores every number as a double.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single scalar value in a row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent marker. Written as an empty cell.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

// 2^63 as f64; floats in [-2^63, 2^63) convert to i64 without loss of integrality.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ord) => ord,
        // NaN sorts after every number and equals itself
        None => a.is_nan().cmp(&b.is_nan()),
    }
}

fn cmp_int_float(i: i64, f: f64) -> Ordering {
    match integral_f64(f) {
        Some(fi) => i.cmp(&fi),
        None => cmp_f64(i as f64, f),
    }
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or the empty string: the two spellings of "nothing here".
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => integral_f64(*f),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }

    /// Coerce to `field_type`, or `None` when the value cannot represent it.
    ///
    /// Blank values pass through untouched for every type.
    pub fn coerce(&self, field_type: FieldType) -> Option<Value> {
        if self.is_blank() {
            return Some(self.clone());
        }
        match field_type {
            FieldType::Any => Some(match self {
                Value::Float(f) => integral_f64(*f).map(Value::Int).unwrap_or(Value::Float(*f)),
                other => other.clone(),
            }),
            FieldType::Int => match self {
                Value::Int(i) => Some(Value::Int(*i)),
                Value::Float(f) => integral_f64(*f).map(Value::Int),
                Value::Text(s) => s.trim().parse::<i64>().ok().map(Value::Int),
                _ => None,
            },
            FieldType::Float => match self {
                Value::Int(i) => Some(Value::Float(*i as f64)),
                Value::Float(f) => Some(Value::Float(*f)),
                Value::Text(s) => s.trim().parse::<f64>().ok().map(Value::Float),
                _ => None,
            },
            FieldType::Text => Some(Value::Text(self.to_string())),
            FieldType::Bool => match self {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Int(0) => Some(Value::Bool(false)),
                Value::Int(1) => Some(Value::Bool(true)),
                Value::Float(f) if *f == 0.0 => Some(Value::Bool(false)),
                Value::Float(f) if *f == 1.0 => Some(Value::Bool(true)),
                Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(Value::Bool(true)),
                    "false" | "0" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => cmp_f64(*a, *b),
            (Value::Int(a), Value::Float(b)) => cmp_int_float(*a, *b),
            (Value::Float(a), Value::Int(b)) => cmp_int_float(*b, *a).reverse(),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => match integral_f64(*f) {
                Some(i) => i.hash(state),
                None if f.is_nan() => u64::MAX.hash(state),
                None => f.to_bits().hash(state),
            },
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => match integral_f64(*x) {
                Some(i) => write!(f, "{}", i),
                None => write!(f, "{}", x),
            },
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
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

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Declared type of a field. `Any` keeps whatever the source produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Any,
    Int,
    Float,
    Text,
    Bool,
}

impl FieldType {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Any => "any",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Text => "text",
            FieldType::Bool => "bool",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        v.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_int_and_integral_float_are_one_key() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(hash_of(&Value::Int(1)), hash_of(&Value::Float(1.0)));
        assert_ne!(Value::Int(1), Value::Float(1.5));
        assert_ne!(Value::Int(1), Value::Text("1".into()));
    }

    #[test]
    fn test_ordering_across_kinds() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Float(0.23),
            Value::Null,
            Value::Int(1),
            Value::Bool(true),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Float(0.23),
                Value::Int(1),
                Value::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_nan_equals_itself() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert!(Value::Float(f64::NAN) > Value::Int(i64::MAX));
    }

    #[test]
    fn test_coerce_any_collapses_integral_floats() {
        assert!(matches!(Value::Float(12.0).coerce(FieldType::Any), Some(Value::Int(12))));
        assert!(matches!(Value::Float(0.5).coerce(FieldType::Any), Some(Value::Float(_))));
    }

    #[test]
    fn test_coerce_text_renders_numbers_without_fraction() {
        assert_eq!(
            Value::Float(1.0).coerce(FieldType::Text),
            Some(Value::Text("1".into()))
        );
        assert_eq!(
            Value::Bool(false).coerce(FieldType::Text),
            Some(Value::Text("false".into()))
        );
    }

    #[test]
    fn test_coerce_rejects_unrepresentable() {
        assert_eq!(Value::Float(2.5).coerce(FieldType::Int), None);
        assert_eq!(Value::Text("abc".into()).coerce(FieldType::Float), None);
        assert_eq!(Value::Int(7).coerce(FieldType::Bool), None);
    }

    #[test]
    fn test_blank_passes_every_type() {
        for ty in [FieldType::Int, FieldType::Float, FieldType::Bool, FieldType::Text] {
            assert_eq!(Value::Text(String::new()).coerce(ty), Some(Value::Text(String::new())));
            assert_eq!(Value::Null.coerce(ty), Some(Value::Null));
        }
    }

    #[test]
    fn test_untagged_serde() {
        let parsed: Vec<Value> = serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(3),
                Value::Float(2.5),
                Value::Text("x".into()),
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_int_float_agree(i in -1_000_000_000i64..1_000_000_000) {
            let as_float = Value::Float(i as f64);
            prop_assert_eq!(Value::Int(i).cmp(&as_float), Ordering::Equal);
            prop_assert_eq!(hash_of(&Value::Int(i)), hash_of(&as_float));
        }

        #[test]
        fn prop_order_is_antisymmetric(a in any::<f64>(), b in any::<i64>()) {
            let x = Value::Float(a);
            let y = Value::Int(b);
            prop_assert_eq!(x.cmp(&y), y.cmp(&x).reverse());
        }
    }
}
