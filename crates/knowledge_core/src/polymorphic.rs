//! Vertical rows whose value is spread over several typed columns.
//!
//! The row keeps one column per storable type (`int_value`, `char_value`,
//! ...) plus a discriminator naming the live column. [`TypeMap`] is the static
//! table from [`ValueType`] to `(discriminator, column)` for one concrete row
//! type:
//!
//! ```text
//! Int  => ("integer", int_value)
//! Str  => ("varchar", char_value)
//! Null => (none, none)
//! ```
//!
//! [`PolymorphicVerticalProperty::value`] reads through the discriminator and
//! [`PolymorphicVerticalProperty::set_value`] keeps the discriminator and the
//! columns in step, so only the selected column is ever non-null.

use std::fmt;
use std::marker::PhantomData;

use crate::{Id, KnowledgeError, KnowledgeResult, PropertyRow, Value, ValueColumn, ValueType};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TypeMapping {
    pub value_type: ValueType,
    pub discriminator: Option<&'static str>,
    pub column: Option<ValueColumn>,
}

impl TypeMapping {
    pub const fn new(
        value_type: ValueType,
        discriminator: Option<&'static str>,
        column: Option<ValueColumn>,
    ) -> Self {
        Self {
            value_type,
            discriminator,
            column,
        }
    }
}

pub trait TypeMap {
    /// Row type name used when rendering rows.
    const NAME: &'static str;
    const ENTRIES: &'static [TypeMapping];

    fn entry(value_type: ValueType) -> Option<&'static TypeMapping> {
        Self::ENTRIES
            .iter()
            .find(|entry| entry.value_type == value_type)
    }

    fn entry_for_discriminator(discriminator: Option<&str>) -> Option<&'static TypeMapping> {
        Self::ENTRIES
            .iter()
            .find(|entry| entry.discriminator == discriminator)
    }
}

/// Storage columns of a polymorphic row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueColumns {
    pub int_value: Option<i64>,
    pub char_value: Option<String>,
    pub float_value: Option<f64>,
    pub bool_value: Option<bool>,
}

impl ValueColumns {
    pub fn read(&self, column: ValueColumn) -> Value {
        match column {
            ValueColumn::Int => self.int_value.into(),
            ValueColumn::Char => self.char_value.clone().into(),
            ValueColumn::Float => self.float_value.into(),
            ValueColumn::Bool => self.bool_value.into(),
        }
    }

    pub fn is_set(&self, column: ValueColumn) -> bool {
        match column {
            ValueColumn::Int => self.int_value.is_some(),
            ValueColumn::Char => self.char_value.is_some(),
            ValueColumn::Float => self.float_value.is_some(),
            ValueColumn::Bool => self.bool_value.is_some(),
        }
    }

    pub fn live_columns(&self) -> Vec<ValueColumn> {
        ValueColumn::ALL
            .into_iter()
            .filter(|column| self.is_set(*column))
            .collect()
    }

    fn clear(&mut self, column: ValueColumn) {
        match column {
            ValueColumn::Int => self.int_value = None,
            ValueColumn::Char => self.char_value = None,
            ValueColumn::Float => self.float_value = None,
            ValueColumn::Bool => self.bool_value = None,
        }
    }

    fn store(&mut self, column: ValueColumn, value: Value) -> KnowledgeResult<()> {
        match (column, value) {
            (ValueColumn::Int, Value::Int(value)) => self.int_value = Some(value),
            (ValueColumn::Char, Value::Str(value)) => self.char_value = Some(value),
            (ValueColumn::Float, Value::Float(value)) => self.float_value = Some(value),
            (ValueColumn::Bool, Value::Bool(value)) => self.bool_value = Some(value),
            (_, value) => return Err(KnowledgeError::unsupported_type(value.value_type())),
        }
        Ok(())
    }
}

/// A key/value row with polymorphic value storage, typed by its [`TypeMap`].
#[derive(Clone, Debug, PartialEq)]
pub struct PolymorphicVerticalProperty<M> {
    id: Id,
    key: String,
    discriminator: Option<String>,
    columns: ValueColumns,
    types: PhantomData<M>,
}

impl<M: TypeMap> PolymorphicVerticalProperty<M> {
    pub fn new(key: impl Into<String>, value: Value) -> KnowledgeResult<Self> {
        let mut row = Self {
            id: Id::new(),
            key: key.into(),
            discriminator: None,
            columns: ValueColumns::default(),
            types: PhantomData,
        };
        row.set_value(value)?;
        Ok(row)
    }

    /// Rebuilds a row from stored parts as-is.
    pub fn from_columns(
        id: Id,
        key: impl Into<String>,
        discriminator: Option<String>,
        columns: ValueColumns,
    ) -> Self {
        Self {
            id,
            key: key.into(),
            discriminator,
            columns,
            types: PhantomData,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    pub fn columns(&self) -> &ValueColumns {
        &self.columns
    }

    /// The logical value: the column selected by the discriminator, or null
    /// when no mapping matches.
    pub fn value(&self) -> Value {
        let current = self.discriminator.as_deref();
        for entry in M::ENTRIES {
            if entry.discriminator == current {
                return entry
                    .column
                    .map(|column| self.columns.read(column))
                    .unwrap_or(Value::Null);
            }
        }
        Value::Null
    }

    /// Writes `value` into its mapped column and clears every other declared
    /// column. Nothing changes when the write fails.
    pub fn set_value(&mut self, value: Value) -> KnowledgeResult<()> {
        let value_type = value.value_type();
        let selected =
            M::entry(value_type).ok_or_else(|| KnowledgeError::unsupported_type(value_type))?;
        if selected
            .column
            .is_some_and(|column| !column.accepts(value_type))
        {
            return Err(KnowledgeError::unsupported_type(value_type));
        }

        let mut columns = self.columns.clone();
        for entry in M::ENTRIES {
            if let Some(column) = entry.column {
                columns.clear(column);
            }
        }
        if let Some(column) = selected.column {
            columns.store(column, value)?;
        }
        self.columns = columns;
        self.discriminator = selected.discriminator.map(str::to_string);
        Ok(())
    }

    /// A copy of this row under a fresh id.
    pub fn renewed(&self) -> Self {
        Self {
            id: Id::new(),
            key: self.key.clone(),
            discriminator: self.discriminator.clone(),
            columns: self.columns.clone(),
            types: PhantomData,
        }
    }

    pub fn clear_value(&mut self) -> KnowledgeResult<()> {
        self.set_value(Value::Null)
    }
}

impl<M: TypeMap> PropertyRow for PolymorphicVerticalProperty<M> {
    type Value = Value;

    fn create(key: String, value: Value) -> KnowledgeResult<Self> {
        Self::new(key, value)
    }

    fn id(&self) -> Id {
        self.id
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> Value {
        PolymorphicVerticalProperty::value(self)
    }

    fn set_value(&mut self, value: Value) -> KnowledgeResult<()> {
        PolymorphicVerticalProperty::set_value(self, value)
    }
}

impl<M: TypeMap> fmt::Display for PolymorphicVerticalProperty<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} '{}'={}>", M::NAME, self.key, self.value())
    }
}
