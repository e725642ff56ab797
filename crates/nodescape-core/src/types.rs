//! Value types and runtime values carried by node slots.
//!
//! [`ValueType`] is the static type of a slot, checked when value
//! connections are made. [`Value`] is the dynamic value flowing through
//! those connections during an evaluation pass.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Static type of a value slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Byte,
    Int,
    Long,
    Float,
    Double,
    Text,
    /// Accepts a value of any type.
    Any,
}

impl ValueType {
    /// Returns `true` for the numeric types.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::Byte | ValueType::Int | ValueType::Long | ValueType::Float | ValueType::Double
        )
    }

    /// Human-readable name of the type.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Bool => "Bool",
            ValueType::Byte => "Byte",
            ValueType::Int => "Int",
            ValueType::Long => "Long",
            ValueType::Float => "Float",
            ValueType::Double => "Double",
            ValueType::Text => "Text",
            ValueType::Any => "Any",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A runtime value produced or consumed by a node.
///
/// `Array` only appears as the packed argument of a variable-size input slot
/// or as the value a node writes to a variable-size output slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Byte(u8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Array(Vec<Value>),
}

impl Value {
    /// The default value of a type: `false`, zero, empty text, or `Null`
    /// for [`ValueType::Any`].
    pub fn default_for(ty: ValueType) -> Value {
        match ty {
            ValueType::Bool => Value::Bool(false),
            ValueType::Byte => Value::Byte(0),
            ValueType::Int => Value::Int(0),
            ValueType::Long => Value::Long(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Double => Value::Double(0.0),
            ValueType::Text => Value::Text(String::new()),
            ValueType::Any => Value::Null,
        }
    }

    /// Returns the static type of this value.
    ///
    /// `Null` and `Array` report [`ValueType::Any`].
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Byte(_) => ValueType::Byte,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::Text(_) => ValueType::Text,
            Value::Null | Value::Array(_) => ValueType::Any,
        }
    }

    /// Converts the value to its display text.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Reads any integer-valued variant as `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Reads any numeric variant as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}
