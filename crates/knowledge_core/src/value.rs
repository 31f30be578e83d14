use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueType {
    Null = 0,
    Str = 1,
    Int = 2,
    Float = 3,
    Bool = 4,
}

/// The logical value of a vertical property.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Str(_) => ValueType::Str,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Str(value) => write!(f, "'{value}'"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A typed storage column of a polymorphic vertical row.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ValueColumn {
    Int,
    Char,
    Float,
    Bool,
}

impl ValueColumn {
    pub const ALL: [ValueColumn; 4] = [
        ValueColumn::Int,
        ValueColumn::Char,
        ValueColumn::Float,
        ValueColumn::Bool,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueColumn::Int => "int_value",
            ValueColumn::Char => "char_value",
            ValueColumn::Float => "float_value",
            ValueColumn::Bool => "bool_value",
        }
    }

    pub fn accepts(self, value_type: ValueType) -> bool {
        matches!(
            (self, value_type),
            (ValueColumn::Int, ValueType::Int)
                | (ValueColumn::Char, ValueType::Str)
                | (ValueColumn::Float, ValueType::Float)
                | (ValueColumn::Bool, ValueType::Bool)
        )
    }
}
