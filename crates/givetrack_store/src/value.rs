//! Row values.
//!
//! Rows are explicit field maps. Each entity maps itself to and from a row
//! through [`crate::Record`]; stores never inspect entity types.

use crate::error::{StoreError, StoreResult};
use crate::types::{Collection, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// UTF-8 text.
    Text(String),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
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

/// One stored row: owner, identity key and named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Owning identity.
    pub owner: OwnerId,
    /// Identity of the row within the owner's collection.
    pub key: String,
    /// Field values by name.
    pub fields: BTreeMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    pub fn new(owner: OwnerId, key: impl Into<String>) -> Self {
        Self {
            owner,
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field, builder style.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Sets a field in place.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a reader that reports errors against `collection`.
    #[must_use]
    pub fn reader(&self, collection: Collection) -> RowReader<'_> {
        RowReader {
            row: self,
            collection,
        }
    }
}

/// Typed field access for `from_row` implementations.
#[derive(Debug, Clone, Copy)]
pub struct RowReader<'a> {
    row: &'a Row,
    collection: Collection,
}

impl<'a> RowReader<'a> {
    fn invalid(&self, field: &str, reason: &'static str) -> StoreError {
        StoreError::InvalidRow {
            collection: self.collection,
            field: field.to_string(),
            reason,
        }
    }

    fn field(&self, name: &str) -> StoreResult<&'a Value> {
        self.row
            .fields
            .get(name)
            .ok_or_else(|| self.invalid(name, "is missing"))
    }

    /// Reads a text field.
    pub fn text(&self, name: &str) -> StoreResult<String> {
        match self.field(name)? {
            Value::Text(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            _ => Err(self.invalid(name, "is not text")),
        }
    }

    /// Reads an integer field.
    pub fn integer(&self, name: &str) -> StoreResult<i64> {
        match self.field(name)? {
            Value::Integer(v) => Ok(*v),
            _ => Err(self.invalid(name, "is not an integer")),
        }
    }

    /// Reads a real field. Integers widen.
    pub fn real(&self, name: &str) -> StoreResult<f64> {
        match self.field(name)? {
            Value::Real(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            _ => Err(self.invalid(name, "is not a number")),
        }
    }

    /// Reads a boolean field.
    pub fn boolean(&self, name: &str) -> StoreResult<bool> {
        match self.field(name)? {
            Value::Bool(v) => Ok(*v),
            _ => Err(self.invalid(name, "is not a boolean")),
        }
    }

    /// Reads a non-negative counter.
    pub fn count(&self, name: &str) -> StoreResult<u32> {
        let value = self.integer(name)?;
        u32::try_from(value).map_err(|_| self.invalid(name, "is out of range"))
    }
}
