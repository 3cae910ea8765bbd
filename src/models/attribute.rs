//! Product attribute models
//!
//! An attribute defines a typed property (`weight`, `colour`) that products
//! can carry a value for. Values are stored as JSON and checked against the
//! attribute type on write.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attribute definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductAttribute {
    pub id: i64,
    /// Human-readable name
    pub name: String,
    /// Identifier-like code, unique across attributes
    pub code: String,
    /// Value type
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Whether products must provide a value
    pub required: bool,
}

/// Supported attribute value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    #[default]
    Text,
    Richtext,
    Integer,
    Boolean,
    Float,
    Date,
    Datetime,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Text => "text",
            AttributeType::Richtext => "richtext",
            AttributeType::Integer => "integer",
            AttributeType::Boolean => "boolean",
            AttributeType::Float => "float",
            AttributeType::Date => "date",
            AttributeType::Datetime => "datetime",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(AttributeType::Text),
            "richtext" => Some(AttributeType::Richtext),
            "integer" => Some(AttributeType::Integer),
            "boolean" => Some(AttributeType::Boolean),
            "float" => Some(AttributeType::Float),
            "date" => Some(AttributeType::Date),
            "datetime" => Some(AttributeType::Datetime),
            _ => None,
        }
    }

    /// Check a JSON value against this type.
    ///
    /// Returns the value to store; `float` accepts integers and normalizes
    /// them to floats. The error is a message suitable for a client.
    pub fn validate_value(&self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (_, Value::Null) => Err("value must not be null".to_string()),
            (AttributeType::Text | AttributeType::Richtext, Value::String(_)) => Ok(value.clone()),
            (AttributeType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(value.clone())
            }
            (AttributeType::Float, Value::Number(n)) => n
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("{} is not a valid float", n)),
            (AttributeType::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (AttributeType::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|_| value.clone())
                .map_err(|_| format!("'{}' is not a date (YYYY-MM-DD)", s)),
            (AttributeType::Datetime, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|_| value.clone())
                .map_err(|_| format!("'{}' is not an RFC 3339 datetime", s)),
            (ty, other) => Err(format!("expected a {} value, got {}", ty, other)),
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attribute codes must look like identifiers: a letter or underscore followed
/// by letters, digits or underscores.
pub fn is_valid_attribute_code(code: &str) -> bool {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Input for creating an attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttributeInput {
    pub name: String,
    pub code: String,
    #[serde(default, rename = "type")]
    pub attr_type: AttributeType,
    #[serde(default)]
    pub required: bool,
}

impl CreateAttributeInput {
    pub fn new(name: impl Into<String>, code: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            attr_type,
            required: false,
        }
    }
}

/// Input for updating an attribute
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAttributeInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "type")]
    pub attr_type: Option<AttributeType>,
    #[serde(default)]
    pub required: Option<bool>,
}

/// A product's value for one attribute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductAttributeValue {
    pub id: i64,
    pub product_id: i64,
    pub attribute_id: i64,
    pub value: Value,
}

/// Input for creating an attribute value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttributeValueInput {
    pub product_id: i64,
    pub attribute_id: i64,
    pub value: Value,
}

/// Input for updating an attribute value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAttributeValueInput {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub attribute_id: Option<i64>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_codes() {
        assert!(is_valid_attribute_code("weight"));
        assert!(is_valid_attribute_code("_internal_2"));
        assert!(!is_valid_attribute_code("2nd"));
        assert!(!is_valid_attribute_code("has space"));
        assert!(!is_valid_attribute_code("dash-ed"));
        assert!(!is_valid_attribute_code(""));
    }

    #[test]
    fn test_validate_values() {
        assert!(AttributeType::Text.validate_value(&json!("red")).is_ok());
        assert!(AttributeType::Text.validate_value(&json!(3)).is_err());
        assert!(AttributeType::Integer.validate_value(&json!(3)).is_ok());
        assert!(AttributeType::Integer.validate_value(&json!(3.5)).is_err());
        assert_eq!(
            AttributeType::Float.validate_value(&json!(3)).unwrap(),
            json!(3.0)
        );
        assert!(AttributeType::Boolean.validate_value(&json!(true)).is_ok());
        assert!(AttributeType::Boolean.validate_value(&json!("yes")).is_err());
        assert!(AttributeType::Date.validate_value(&json!("2024-02-29")).is_ok());
        assert!(AttributeType::Date.validate_value(&json!("2023-02-29")).is_err());
        assert!(AttributeType::Datetime
            .validate_value(&json!("2024-01-01T10:00:00Z"))
            .is_ok());
        assert!(AttributeType::Datetime.validate_value(&json!("yesterday")).is_err());
        assert!(AttributeType::Text.validate_value(&Value::Null).is_err());
    }

    #[test]
    fn test_type_roundtrip() {
        let ty: AttributeType = serde_json::from_str("\"richtext\"").unwrap();
        assert_eq!(ty, AttributeType::Richtext);
        assert_eq!(AttributeType::from_str(ty.as_str()), Some(ty));
        assert_eq!(AttributeType::from_str("file"), None);
    }
}
