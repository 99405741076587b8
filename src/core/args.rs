//! Message arguments carried by a record

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value substituted into a message template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            FieldValue::Null => write!(f, "None"),
        }
    }
}

impl FieldValue {
    /// Quoted representation used by `%r` and `!r` conversions
    pub fn repr(&self) -> String {
        match self {
            FieldValue::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other => other.to_string(),
        }
    }

    /// Numeric view used by integer conversions; floats truncate toward zero
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            FieldValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    /// Name of the value kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "str",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Bool(_) => "bool",
            FieldValue::Null => "None",
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        i64::try_from(i)
            .map(FieldValue::Int)
            .unwrap_or(FieldValue::Float(i as f64))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Arguments merged into a record's message template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Args {
    /// The template is used verbatim
    #[default]
    None,
    Positional(Vec<FieldValue>),
    Named(BTreeMap<String, FieldValue>),
}

impl Args {
    /// Positional arguments from anything convertible
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Args::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Named arguments from `(key, value)` pairs
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Args::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Args::None)
    }

    pub fn get_index(&self, index: usize) -> Option<&FieldValue> {
        match self {
            Args::Positional(values) => values.get(index),
            _ => None,
        }
    }

    pub fn get_name(&self, name: &str) -> Option<&FieldValue> {
        match self {
            Args::Named(values) => values.get(name),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Args::None => 0,
            Args::Positional(values) => values.len(),
            Args::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::from("x").to_string(), "x");
        assert_eq!(FieldValue::from(42).to_string(), "42");
        assert_eq!(FieldValue::from(true).to_string(), "True");
        assert_eq!(FieldValue::Null.to_string(), "None");
        assert_eq!(FieldValue::from(None::<i32>), FieldValue::Null);
    }

    #[test]
    fn test_repr_quotes_strings() {
        assert_eq!(FieldValue::from("it's").repr(), "'it\\'s'");
        assert_eq!(FieldValue::from(1.5).repr(), "1.5");
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(FieldValue::from(3.9).as_int(), Some(3));
        assert_eq!(FieldValue::from(true).as_int(), Some(1));
        assert_eq!(FieldValue::from("3").as_int(), None);
        assert_eq!(FieldValue::from(2).as_float(), Some(2.0));
    }

    #[test]
    fn test_args_accessors() {
        let args = Args::positional([1, 2]);
        assert_eq!(args.get_index(1), Some(&FieldValue::Int(2)));
        assert_eq!(args.get_name("a"), None);

        let args = Args::named([("user", "ann")]);
        assert_eq!(args.get_name("user"), Some(&FieldValue::from("ann")));
        assert_eq!(args.len(), 1);
        assert!(Args::None.is_none());
    }

    #[test]
    fn test_field_value_deserializes_untagged() {
        let values: Vec<FieldValue> = serde_json::from_str(r#"["a", 1, 2.5, true, null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue::from("a"),
                FieldValue::Int(1),
                FieldValue::Float(2.5),
                FieldValue::Bool(true),
                FieldValue::Null,
            ]
        );
    }
}
