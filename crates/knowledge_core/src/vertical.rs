//! Vertical (key/value row) properties and the dictionary adapter over them.
//!
//! A vertical table stores free-form attributes of a parent entity as rows of
//! `(owner, key, value)` instead of fixed columns. [`VerticalPropertyMap`] is
//! the per-parent collection of those rows keyed by `key`, and
//! [`VerticalPropertyDict`] lets a host type expose the collection with
//! dictionary semantics:
//!
//! ```text
//! entity.set_item("species", "apple")   // inserts VerticalProperty("species", "apple")
//! entity.set_item("species", "pear")    // updates that row in place
//! entity.get_item("species")            // reads the row's value
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::{self, Entry};
use std::fmt;

use crate::{Id, KnowledgeError, KnowledgeResult};

/// A row type that can live in a [`VerticalPropertyMap`].
pub trait PropertyRow: Sized {
    type Value: Clone;

    /// Builds a new row for a key that is not yet present.
    fn create(key: String, value: Self::Value) -> KnowledgeResult<Self>;

    fn id(&self) -> Id;

    fn key(&self) -> &str;

    fn value(&self) -> Self::Value;

    /// Replaces the logical value without touching the row identity.
    fn set_value(&mut self, value: Self::Value) -> KnowledgeResult<()>;
}

pub type RowValue<R> = <R as PropertyRow>::Value;

/// A plain key/value pair.
#[derive(Clone, Debug, PartialEq)]
pub struct VerticalProperty<V> {
    id: Id,
    key: String,
    value: V,
}

impl<V> VerticalProperty<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            id: Id::new(),
            key: key.into(),
            value,
        }
    }
}

impl<V: Clone> PropertyRow for VerticalProperty<V> {
    type Value = V;

    fn create(key: String, value: V) -> KnowledgeResult<Self> {
        Ok(Self::new(key, value))
    }

    fn id(&self) -> Id {
        self.id
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> V {
        self.value.clone()
    }

    fn set_value(&mut self, value: V) -> KnowledgeResult<()> {
        self.value = value;
        Ok(())
    }
}

impl<V: fmt::Debug> fmt::Display for VerticalProperty<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<VerticalProperty {:?}={:?}>", self.key, self.value)
    }
}

/// The rows of one parent entity, at most one per key.
#[derive(Clone, Debug)]
pub struct VerticalPropertyMap<R> {
    rows: BTreeMap<String, R>,
}

impl<R> Default for VerticalPropertyMap<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<R: PropertyRow> VerticalPropertyMap<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a map from persisted rows. Two rows sharing a key are rejected.
    pub fn from_rows(rows: impl IntoIterator<Item = R>) -> KnowledgeResult<Self> {
        let mut map = Self::new();
        for row in rows {
            match map.rows.entry(row.key().to_string()) {
                Entry::Occupied(entry) => {
                    return Err(KnowledgeError::invalid(format!(
                        "duplicate property key '{}'",
                        entry.key()
                    )));
                }
                Entry::Vacant(entry) => {
                    entry.insert(row);
                }
            }
        }
        Ok(map)
    }

    pub fn get_item(&self, key: &str) -> KnowledgeResult<R::Value> {
        self.rows
            .get(key)
            .map(R::value)
            .ok_or_else(|| KnowledgeError::key_not_found(key))
    }

    pub fn get_attr(&self, name: &str) -> KnowledgeResult<R::Value> {
        self.rows
            .get(name)
            .map(R::value)
            .ok_or_else(|| KnowledgeError::attribute_not_found(name))
    }

    pub fn get(&self, key: &str) -> Option<R::Value> {
        self.rows.get(key).map(R::value)
    }

    pub fn get_or(&self, key: &str, default: R::Value) -> R::Value {
        self.get(key).unwrap_or(default)
    }

    /// Inserts a new row for an absent key, otherwise updates the existing row
    /// in place so its id survives the write.
    pub fn set_item(&mut self, key: impl Into<String>, value: R::Value) -> KnowledgeResult<()> {
        match self.rows.entry(key.into()) {
            Entry::Occupied(mut entry) => entry.get_mut().set_value(value),
            Entry::Vacant(entry) => {
                let row = R::create(entry.key().clone(), value)?;
                entry.insert(row);
                Ok(())
            }
        }
    }

    pub fn delete_item(&mut self, key: &str) -> KnowledgeResult<R> {
        self.rows
            .remove(key)
            .ok_or_else(|| KnowledgeError::key_not_found(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.rows.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<R::Value> {
        self.rows.values().map(R::value).collect()
    }

    pub fn items(&self) -> Vec<(String, R::Value)> {
        self.rows
            .iter()
            .map(|(key, row)| (key.clone(), row.value()))
            .collect()
    }

    pub fn iter(&self) -> Keys<'_, R> {
        Keys {
            inner: self.rows.keys(),
        }
    }

    pub fn row(&self, key: &str) -> Option<&R> {
        self.rows.get(key)
    }

    pub fn rows(&self) -> impl Iterator<Item = &R> + '_ {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lazy iterator over the keys of a [`VerticalPropertyMap`].
pub struct Keys<'a, R> {
    inner: btree_map::Keys<'a, String, R>,
}

impl<'a, R> Iterator for Keys<'a, R> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.inner.next().map(String::as_str)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, R: PropertyRow> IntoIterator for &'a VerticalPropertyMap<R> {
    type Item = &'a str;
    type IntoIter = Keys<'a, R>;

    fn into_iter(self) -> Keys<'a, R> {
        self.iter()
    }
}

/// Dictionary access for a host type that embeds a [`VerticalPropertyMap`].
///
/// Implementors supply the map accessors; every other method forwards to the
/// map. Attribute-style lookups consult [`declared_field`] before the map.
///
/// [`declared_field`]: VerticalPropertyDict::declared_field
pub trait VerticalPropertyDict {
    type Row: PropertyRow;

    fn property_map(&self) -> &VerticalPropertyMap<Self::Row>;

    fn property_map_mut(&mut self) -> &mut VerticalPropertyMap<Self::Row>;

    /// Statically declared fields of the host, as property values.
    fn declared_field(&self, _name: &str) -> Option<RowValue<Self::Row>> {
        None
    }

    fn get_item(&self, key: &str) -> KnowledgeResult<RowValue<Self::Row>> {
        self.property_map().get_item(key)
    }

    fn get_attr(&self, name: &str) -> KnowledgeResult<RowValue<Self::Row>> {
        if let Some(value) = self.declared_field(name) {
            return Ok(value);
        }
        self.property_map().get_attr(name)
    }

    fn get_dynamic(&self, name: &str) -> KnowledgeResult<RowValue<Self::Row>> {
        self.get_attr(name)
    }

    fn get(&self, key: &str) -> Option<RowValue<Self::Row>> {
        self.property_map().get(key)
    }

    fn get_or(&self, key: &str, default: RowValue<Self::Row>) -> RowValue<Self::Row> {
        self.property_map().get_or(key, default)
    }

    fn set_item(
        &mut self,
        key: impl Into<String>,
        value: impl Into<RowValue<Self::Row>>,
    ) -> KnowledgeResult<()> {
        self.property_map_mut().set_item(key, value.into())
    }

    fn delete_item(&mut self, key: &str) -> KnowledgeResult<Self::Row> {
        self.property_map_mut().delete_item(key)
    }

    fn delete_attr(&mut self, name: &str) -> KnowledgeResult<Self::Row> {
        self.property_map_mut().delete_item(name)
    }

    fn contains(&self, key: &str) -> bool {
        self.property_map().contains(key)
    }

    fn keys(&self) -> Vec<String> {
        self.property_map().keys()
    }

    fn values(&self) -> Vec<RowValue<Self::Row>> {
        self.property_map().values()
    }

    fn items(&self) -> Vec<(String, RowValue<Self::Row>)> {
        self.property_map().items()
    }

    fn iter(&self) -> Keys<'_, Self::Row> {
        self.property_map().iter()
    }
}
