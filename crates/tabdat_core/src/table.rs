//! Table shapes held by an instance.
//!
//! - [`KeyedTable`]: composite primary key -> [`Record`]
//! - [`RowTable`]: keyless, materialized rows (duplicates kept)
//! - [`GeneratorTable`]: keyless, lazy and restartable

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Composite primary key. Single-field keys are one-element tuples.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<Value>);

impl Key {
    pub fn new(values: Vec<Value>) -> Self {
        Key(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Value::Text(s) => write!(f, "'{}'", s)?,
                Value::Null => f.write_str("null")?,
                other => write!(f, "{}", other)?,
            }
        }
        f.write_str(")")
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Key(vec![value])
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key(vec![value.into()])
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key(vec![value.into()])
    }
}

impl From<Vec<Value>> for Key {
    fn from(values: Vec<Value>) -> Self {
        Key(values)
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Key {
    fn from((a, b): (A, B)) -> Self {
        Key(vec![a.into(), b.into()])
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for Key {
    fn from((a, b, c): (A, B, C)) -> Self {
        Key(vec![a.into(), b.into(), c.into()])
    }
}

/// Field name -> value for one row. Undeclared fields may be present and are
/// ignored by comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Values for `fields` in order; absent fields yield `None`.
    pub fn project<'a, I>(&'a self, fields: I) -> Vec<Option<&'a Value>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        fields.into_iter().map(|f| self.fields.get(f)).collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Primary key -> record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedTable {
    rows: BTreeMap<Key, Record>,
}

impl KeyedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Key) -> Option<&Record> {
        self.rows.get(key)
    }

    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Record> {
        self.rows.get_mut(key)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.rows.contains_key(key)
    }

    /// Insert or replace; returns the previous record for `key`.
    pub fn insert(&mut self, key: Key, record: Record) -> Option<Record> {
        self.rows.insert(key, record)
    }

    pub fn remove(&mut self, key: &Key) -> Option<Record> {
        self.rows.remove(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.rows.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Key, Record> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a KeyedTable {
    type Item = (&'a Key, &'a Record);
    type IntoIter = btree_map::Iter<'a, Key, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Keyless rows kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowTable {
    rows: Vec<Record>,
}

impl RowTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.rows.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.rows.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }
}

/// Iterator handed out by [`GeneratorTable::rows`].
pub type RowIter = Box<dyn Iterator<Item = Record> + Send>;

type RowSource = Arc<dyn Fn() -> RowIter + Send + Sync>;

/// A keyless table exposed as a zero-argument row source.
///
/// Every call to [`rows`](GeneratorTable::rows) starts a new traversal; no
/// cursor is shared between calls, so the sequence can be replayed.
#[derive(Clone)]
pub struct GeneratorTable {
    source: RowSource,
}

impl GeneratorTable {
    pub fn from_fn<F>(source: F) -> Self
    where
        F: Fn() -> RowIter + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(source),
        }
    }

    /// Replay a fixed set of rows. Rows are cloned lazily as the iterator advances.
    pub fn from_rows(rows: Vec<Record>) -> Self {
        let rows: Arc<[Record]> = rows.into();
        Self::from_fn(move || {
            let rows = Arc::clone(&rows);
            Box::new((0..rows.len()).map(move |i| rows[i].clone()))
        })
    }

    pub fn rows(&self) -> RowIter {
        (self.source)()
    }
}

impl fmt::Debug for GeneratorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorTable").finish_non_exhaustive()
    }
}

/// A table in one of its three shapes.
#[derive(Debug, Clone)]
pub enum Table {
    Keyed(KeyedTable),
    Rows(RowTable),
    Generator(GeneratorTable),
}

impl Table {
    pub fn shape(&self) -> &'static str {
        match self {
            Table::Keyed(_) => "keyed",
            Table::Rows(_) => "a row table",
            Table::Generator(_) => "a generator",
        }
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, Table::Keyed(_))
    }

    pub fn is_generator(&self) -> bool {
        matches!(self, Table::Generator(_))
    }

    /// Every row as a record, for keyless shapes. Keyed tables return `None`.
    pub fn keyless_rows(&self) -> Option<Vec<Record>> {
        match self {
            Table::Keyed(_) => None,
            Table::Rows(rows) => Some(rows.iter().cloned().collect()),
            Table::Generator(generator) => Some(generator.rows().collect()),
        }
    }
}
