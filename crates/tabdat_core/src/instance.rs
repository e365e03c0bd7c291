//! Materialized table collections.
//!
//! Mutable and frozen instances share one representation. Read access is the
//! same for both; every path that hands out `&mut` goes through
//! [`TicDat::ensure_mutable`], so a frozen instance can never be changed and a
//! rejected write leaves it exactly as it was.

use std::collections::BTreeMap;

use crate::error::{TabError, TabResult};
use crate::table::{GeneratorTable, Key, KeyedTable, Record, RowTable, Table};
use crate::value::Value;

/// A table collection built by a factory.
#[derive(Debug, Clone)]
pub struct TicDat {
    tables: BTreeMap<String, Table>,
    frozen: bool,
}

impl TicDat {
    pub(crate) fn from_tables(tables: BTreeMap<String, Table>, frozen: bool) -> Self {
        Self { tables, frozen }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Consume the instance and return a frozen copy of the same data.
    pub fn freeze(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table(&self, name: &str) -> TabResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| TabError::MissingTable(name.to_string()))
    }

    pub fn keyed(&self, name: &str) -> TabResult<&KeyedTable> {
        match self.table(name)? {
            Table::Keyed(table) => Ok(table),
            other => Err(shape_error(name, "keyed", other)),
        }
    }

    pub fn rows(&self, name: &str) -> TabResult<&RowTable> {
        match self.table(name)? {
            Table::Rows(table) => Ok(table),
            other => Err(shape_error(name, "a row table", other)),
        }
    }

    pub fn generator(&self, name: &str) -> TabResult<&GeneratorTable> {
        match self.table(name)? {
            Table::Generator(table) => Ok(table),
            other => Err(shape_error(name, "a generator", other)),
        }
    }

    /// Look up one field of one keyed row.
    pub fn value(&self, table: &str, key: &Key, field: &str) -> TabResult<Option<&Value>> {
        Ok(self.keyed(table)?.get(key).and_then(|r| r.get(field)))
    }

    pub fn keyed_mut(&mut self, name: &str) -> TabResult<&mut KeyedTable> {
        self.ensure_mutable(name, "*")?;
        match self.table_mut(name)? {
            Table::Keyed(table) => Ok(table),
            other => Err(shape_error(name, "keyed", other)),
        }
    }

    pub fn rows_mut(&mut self, name: &str) -> TabResult<&mut RowTable> {
        self.ensure_mutable(name, "*")?;
        match self.table_mut(name)? {
            Table::Rows(table) => Ok(table),
            other => Err(shape_error(name, "a row table", other)),
        }
    }

    /// Assign one field of an existing keyed row.
    pub fn set_field(
        &mut self,
        table: &str,
        key: impl Into<Key>,
        field: &str,
        value: impl Into<Value>,
    ) -> TabResult<()> {
        self.ensure_mutable(table, field)?;
        let key = key.into();
        let record = self
            .keyed_mut(table)?
            .get_mut(&key)
            .ok_or_else(|| TabError::MissingKey {
                table: table.to_string(),
                key: key.to_string(),
            })?;
        record.set(field, value);
        Ok(())
    }

    /// Insert or replace a keyed row; returns the record it replaced.
    pub fn insert(
        &mut self,
        table: &str,
        key: impl Into<Key>,
        record: Record,
    ) -> TabResult<Option<Record>> {
        Ok(self.keyed_mut(table)?.insert(key.into(), record))
    }

    fn ensure_mutable(&self, table: &str, field: &str) -> TabResult<()> {
        if self.frozen {
            return Err(TabError::immutable(table, field));
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> TabResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| TabError::MissingTable(name.to_string()))
    }
}

fn shape_error(table: &str, expected: &'static str, actual: &Table) -> TabError {
    TabError::TableShape {
        table: table.to_string(),
        expected,
        actual: actual.shape(),
    }
}
