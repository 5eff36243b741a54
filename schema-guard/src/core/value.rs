//! Scalar values and the feature types they map to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared or observed type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    /// Integer or floating point values
    Numeric,
    /// Free text or categorical values
    String,
    /// `true` / `false`
    Boolean,
}

impl FeatureType {
    /// Lowercase name used in messages and serialized documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Numeric => "numeric",
            FeatureType::String => "string",
            FeatureType::Boolean => "boolean",
        }
    }

    /// Whether value frequencies (rather than a numeric histogram) describe
    /// columns of this type.
    pub fn is_categorical(&self) -> bool {
        matches!(self, FeatureType::String | FeatureType::Boolean)
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl Value {
    /// Returns the feature type of this value, or `None` when it counts as missing.
    ///
    /// `Double(NaN)` is treated as missing.
    pub fn feature_type(&self) -> Option<FeatureType> {
        match self {
            Value::Null => None,
            Value::Double(v) if v.is_nan() => None,
            Value::Integer(_) | Value::Double(_) => Some(FeatureType::Numeric),
            Value::String(_) => Some(FeatureType::String),
            Value::Boolean(_) => Some(FeatureType::Boolean),
        }
    }

    /// Whether this value counts as missing.
    pub fn is_missing(&self) -> bool {
        self.feature_type().is_none()
    }

    /// Numeric view of the value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Double(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// The key under which a categorical value is counted.
    pub fn categorical_key(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Short type label used in error messages, including for missing values.
    pub fn type_name(&self) -> &'static str {
        self.feature_type().map(|t| t.as_str()).unwrap_or("null")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_type_of_values() {
        assert_eq!(Value::from(3).feature_type(), Some(FeatureType::Numeric));
        assert_eq!(Value::from(2.5).feature_type(), Some(FeatureType::Numeric));
        assert_eq!(Value::from("a").feature_type(), Some(FeatureType::String));
        assert_eq!(Value::from(true).feature_type(), Some(FeatureType::Boolean));
        assert_eq!(Value::Null.feature_type(), None);
        assert!(Value::Double(f64::NAN).is_missing());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
    }

    #[test]
    fn test_categorical_key() {
        assert_eq!(Value::from(false).categorical_key().as_deref(), Some("false"));
        assert_eq!(Value::from("GB").categorical_key().as_deref(), Some("GB"));
        assert_eq!(Value::from(1).categorical_key(), None);
    }
}
