//! Preference values, loose equality and type inference
//!
//! OS preference values come back from the preference database in a looser
//! shape than they were declared (numbers may read back as strings), so
//! equality is forgiving between numbers and strings and strict for
//! everything else.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A declared or observed settings value.
///
/// Closed variant: anything the preference database can hold that this
/// tool knows how to write. Array elements may be declared as any scalar;
/// they are kept in their string form, which is how `defaults write -array`
/// stores them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    StringArray(Vec<String>),
    Dict(BTreeMap<String, Value>),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        RawValue::deserialize(deserializer).map(Self::from)
    }
}

/// Accepted input shape for [`Value`]
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<RawScalar>),
    Dict(BTreeMap<String, Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<RawScalar> for String {
    fn from(scalar: RawScalar) -> Self {
        match scalar {
            RawScalar::Bool(b) => b.to_string(),
            RawScalar::Int(i) => i.to_string(),
            RawScalar::Float(x) => x.to_string(),
            RawScalar::String(s) => s,
        }
    }
}

impl From<RawValue> for Value {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Bool(b) => Self::Bool(b),
            RawValue::Int(i) => Self::Int(i),
            RawValue::Float(x) => Self::Float(x),
            RawValue::String(s) => Self::String(s),
            RawValue::Array(items) => {
                Self::StringArray(items.into_iter().map(String::from).collect())
            }
            RawValue::Dict(entries) => Self::Dict(entries),
        }
    }
}

/// Wire type tag passed to the preference write command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    Array,
    Dict,
}

impl ValueType {
    /// Type flag for `defaults write` (e.g. `-bool`).
    pub fn flag(self) -> &'static str {
        match self {
            Self::Bool => "-bool",
            Self::Int => "-int",
            Self::Float => "-float",
            Self::String => "-string",
            Self::Array => "-array",
            Self::Dict => "-dict",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Dict => "dict",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Canonical serialization used for structural comparison.
    ///
    /// Order-sensitive for arrays. Dict keys are sorted by construction.
    pub fn canonical(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    fn is_scalar(&self) -> bool {
        !matches!(self, Self::StringArray(_) | Self::Dict(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::StringArray(_) | Self::Dict(_) => f.write_str(&self.canonical()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::StringArray(items)
    }
}

/// Decide whether an observed value matches a declared one.
///
/// Same-kind scalars compare directly, a number and a string compare by
/// the number's string form, everything else by canonical serialization.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    use Value::{Bool, Float, Int, String};

    match (a, b) {
        (Bool(x), Bool(y)) => x == y,
        (Int(x), Int(y)) => x == y,
        (Float(x), Float(y)) => x == y,
        (Int(x), Float(y)) | (Float(y), Int(x)) => (*x as f64) == *y,
        (String(x), String(y)) => x == y,
        (Int(n), String(s)) | (String(s), Int(n)) => n.to_string() == *s,
        (Float(n), String(s)) | (String(s), Float(n)) => n.to_string() == *s,
        _ => a.canonical() == b.canonical(),
    }
}

/// Infer the wire type of a value that was declared without a type tag.
pub fn infer_type(value: &Value) -> ValueType {
    match value {
        Value::Bool(_) => ValueType::Bool,
        Value::Int(_) => ValueType::Int,
        Value::Float(x) if x.fract() == 0.0 && x.is_finite() => ValueType::Int,
        Value::Float(_) => ValueType::Float,
        Value::String(_) => ValueType::String,
        Value::StringArray(_) => ValueType::Array,
        Value::Dict(_) => ValueType::Dict,
    }
}

/// Format `value` as the trailing arguments of `defaults write <domain> <key>`.
///
/// The first element is the type flag. Arrays expand into one argument per
/// element, dicts into key/typed-value triples.
pub fn format_write_args(value: &Value, value_type: ValueType) -> Result<Vec<String>> {
    let mut args = vec![value_type.flag().to_string()];

    match value_type {
        ValueType::Array => match value {
            Value::StringArray(items) => args.extend(items.iter().cloned()),
            Value::Dict(_) => return Err(invalid(value, value_type, "dict cannot be an array")),
            scalar => args.push(scalar.to_string()),
        },
        ValueType::Dict => match value {
            Value::Dict(entries) => {
                for (key, entry) in entries {
                    if !entry.is_scalar() {
                        return Err(invalid(
                            value,
                            value_type,
                            &format!("nested value under '{key}' is not a scalar"),
                        ));
                    }
                    args.push(key.clone());
                    args.extend(format_write_args(entry, infer_type(entry))?);
                }
            }
            _ => return Err(invalid(value, value_type, "expected a table of keys")),
        },
        scalar_type => args.push(format_scalar(value, scalar_type)?),
    }

    Ok(args)
}

/// Check that an explicit type tag can carry `value`.
pub fn check_compatible(value: &Value, value_type: ValueType) -> Result<()> {
    format_write_args(value, value_type).map(|_| ())
}

/// The value as the preference database holds it after a write with
/// `value_type`, e.g. `"true"` tagged `bool` becomes `Bool(true)` and a
/// scalar tagged `array` a one-element array.
pub fn coerce(value: &Value, value_type: ValueType) -> Result<Value> {
    match value_type {
        ValueType::Array => match value {
            Value::StringArray(_) => Ok(value.clone()),
            Value::Dict(_) => Err(invalid(value, value_type, "dict cannot be an array")),
            scalar => Ok(Value::StringArray(vec![scalar.to_string()])),
        },
        ValueType::Dict => match value {
            Value::Dict(_) => Ok(value.clone()),
            _ => Err(invalid(value, value_type, "expected a table of keys")),
        },
        ValueType::Bool => Ok(Value::Bool(format_scalar(value, value_type)? == "true")),
        ValueType::Int => format_scalar(value, value_type)?
            .parse()
            .map(Value::Int)
            .map_err(|_| invalid(value, value_type, "not an integer")),
        ValueType::Float => format_scalar(value, value_type)?
            .parse()
            .map(Value::Float)
            .map_err(|_| invalid(value, value_type, "not a number")),
        ValueType::String => format_scalar(value, value_type).map(Value::String),
    }
}

fn format_scalar(value: &Value, value_type: ValueType) -> Result<String> {
    match (value_type, value) {
        (ValueType::Bool, Value::Bool(b)) => Ok(b.to_string()),
        (ValueType::Bool, Value::Int(0)) => Ok("false".to_string()),
        (ValueType::Bool, Value::Int(1)) => Ok("true".to_string()),
        (ValueType::Bool, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok("true".to_string()),
            "false" | "no" | "0" => Ok("false".to_string()),
            _ => Err(invalid(value, value_type, "not a boolean")),
        },
        (ValueType::Int, Value::Int(i)) => Ok(i.to_string()),
        (ValueType::Int, Value::Float(x)) if x.fract() == 0.0 => Ok((*x as i64).to_string()),
        (ValueType::Int, Value::Bool(b)) => Ok(i64::from(*b).to_string()),
        (ValueType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|i| i.to_string())
            .map_err(|_| invalid(value, value_type, "not an integer")),
        (ValueType::Float, Value::Float(x)) => Ok(x.to_string()),
        (ValueType::Float, Value::Int(i)) => Ok(i.to_string()),
        (ValueType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|x| x.to_string())
            .map_err(|_| invalid(value, value_type, "not a number")),
        (ValueType::String, v) if v.is_scalar() => Ok(v.to_string()),
        _ => Err(invalid(value, value_type, "incompatible value")),
    }
}

fn invalid(value: &Value, value_type: ValueType, reason: &str) -> Error {
    Error::InvalidValue {
        value: value.to_string(),
        value_type: value_type.to_string(),
        reason: reason.to_string(),
    }
}
