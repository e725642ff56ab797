//! Type coercion rules for value connections.
//!
//! Decides how an output of one type may feed an input of another:
//!
//! - Same type, or any type into an `Any` input: connect directly.
//! - Lossless numeric widening (Byte -> Int -> Long -> Float -> Double and
//!   Float -> Double): connect through an auto-inserted cast node.
//! - Anything into a `Text` input: connect through an auto-inserted
//!   to-text node.
//! - Everything else is rejected.
//!
//! No narrowing and no Text -> number parsing happens implicitly.

use nodescape_core::types::{Value, ValueType};

/// An adapter node the graph inserts between two incompatible slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Cast { from: ValueType, to: ValueType },
    ToText { from: ValueType },
}

/// How a connection from one type to another is realised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Direct,
    Adapted(Adapter),
}

/// Resolves how `from` connects to `to`, or `None` if it cannot.
pub fn resolve(from: ValueType, to: ValueType) -> Option<Coercion> {
    if is_assignable(from, to) {
        return Some(Coercion::Direct);
    }
    if has_implicit_cast(from, to) {
        return Some(Coercion::Adapted(Adapter::Cast { from, to }));
    }
    if to == ValueType::Text {
        return Some(Coercion::Adapted(Adapter::ToText { from }));
    }
    None
}

/// Returns `true` if a value of type `from` can be passed to `to` unchanged.
pub fn is_assignable(from: ValueType, to: ValueType) -> bool {
    from == to || to == ValueType::Any
}

/// Returns `true` if an implicit (lossless) numeric conversion exists.
pub fn has_implicit_cast(from: ValueType, to: ValueType) -> bool {
    match (numeric_rank(from), numeric_rank(to)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

/// Converts a numeric value to the target numeric type.
///
/// Returns `None` if the value is not numeric or the target is not a
/// numeric type reachable by widening.
pub fn cast_value(value: &Value, to: ValueType) -> Option<Value> {
    let from = value.value_type();
    if from == to {
        return Some(value.clone());
    }
    if !has_implicit_cast(from, to) {
        return None;
    }
    match to {
        ValueType::Int => value.as_i64().map(|v| Value::Int(v as i32)),
        ValueType::Long => value.as_i64().map(Value::Long),
        ValueType::Float => value.as_f64().map(|v| Value::Float(v as f32)),
        ValueType::Double => value.as_f64().map(Value::Double),
        _ => None,
    }
}

/// Widening rank of a numeric type. Higher rank means wider type.
fn numeric_rank(ty: ValueType) -> Option<u8> {
    match ty {
        ValueType::Byte => Some(1),
        ValueType::Int => Some(2),
        ValueType::Long => Some(3),
        ValueType::Float => Some(4),
        ValueType::Double => Some(5),
        _ => None,
    }
}
