//! # Attribute values, key/value pairs, and functional mutators.
//!
//! Attributes are the payload that scopes accumulate: a scope's effective
//! attribute map is its parent's map with local mutations applied. Maps are
//! never edited through shared references — a [`Mutator`] is applied to a
//! fresh copy, so older snapshots keep the values they were resolved with.
//!
//! ## Mutator semantics
//! | Mutator    | Key absent        | Key present        |
//! |------------|-------------------|--------------------|
//! | `Insert`   | sets the value    | no-op              |
//! | `Update`   | no-op             | replaces the value |
//! | `Upsert`   | sets the value    | replaces the value |
//! | `Delete`   | no-op             | removes the key    |
//!
//! Within one mutation list, later entries win (last-write-wins per key).
//!
//! ## Example
//! ```rust
//! use spanloom::{Attr, AttrMap, Mutator};
//!
//! let mut map = AttrMap::new();
//! Mutator::upsert("host", "db-1").apply(&mut map);
//! Mutator::insert("host", "db-2").apply(&mut map); // no-op, key present
//! assert_eq!(map.get("host"), Some(&"db-1".into()));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// UTF-8 string value.
    Str(Arc<str>),
    /// Signed integer value.
    I64(i64),
    /// Floating-point value.
    F64(f64),
    /// Boolean value.
    Bool(bool),
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(Arc::from(v))
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(Arc::from(v.as_str()))
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::I64(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::F64(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

/// A key/value attribute pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    /// Attribute key.
    pub key: Arc<str>,
    /// Attribute value.
    pub value: AttrValue,
}

impl Attr {
    /// Creates a new attribute pair.
    pub fn new(key: impl Into<Arc<str>>, value: impl Into<AttrValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Resolved attribute map: key → value, last-write-wins per key.
pub type AttrMap = HashMap<Arc<str>, AttrValue>;

/// A functional attribute mutation.
///
/// Mutators are applied to a copy of the base map; the base snapshot is
/// never touched.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutator {
    /// Sets the value only if the key is absent.
    Insert(Attr),
    /// Replaces the value only if the key is present.
    Update(Attr),
    /// Sets the value unconditionally.
    Upsert(Attr),
    /// Removes the key if present.
    Delete(Arc<str>),
}

impl Mutator {
    /// Insert-if-absent mutator.
    #[inline]
    pub fn insert(key: impl Into<Arc<str>>, value: impl Into<AttrValue>) -> Self {
        Mutator::Insert(Attr::new(key, value))
    }

    /// Update-if-present mutator.
    #[inline]
    pub fn update(key: impl Into<Arc<str>>, value: impl Into<AttrValue>) -> Self {
        Mutator::Update(Attr::new(key, value))
    }

    /// Unconditional set mutator.
    #[inline]
    pub fn upsert(key: impl Into<Arc<str>>, value: impl Into<AttrValue>) -> Self {
        Mutator::Upsert(Attr::new(key, value))
    }

    /// Key removal mutator.
    #[inline]
    pub fn delete(key: impl Into<Arc<str>>) -> Self {
        Mutator::Delete(key.into())
    }

    /// Returns the key this mutator targets.
    pub fn key(&self) -> &str {
        match self {
            Mutator::Insert(a) | Mutator::Update(a) | Mutator::Upsert(a) => a.key.as_ref(),
            Mutator::Delete(k) => k.as_ref(),
        }
    }

    /// Applies the mutation to `map` in place.
    pub fn apply(&self, map: &mut AttrMap) {
        match self {
            Mutator::Insert(a) => {
                if !map.contains_key(a.key.as_ref()) {
                    map.insert(a.key.clone(), a.value.clone());
                }
            }
            Mutator::Update(a) => {
                if map.contains_key(a.key.as_ref()) {
                    map.insert(a.key.clone(), a.value.clone());
                }
            }
            Mutator::Upsert(a) => {
                map.insert(a.key.clone(), a.value.clone());
            }
            Mutator::Delete(k) => {
                map.remove(k.as_ref());
            }
        }
    }
}
