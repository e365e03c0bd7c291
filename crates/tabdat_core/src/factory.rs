//! The factory: validates a schema once, then builds and compares instances.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::config::{DuplicateKeyPolicy, FactoryConfig};
use crate::error::{TabError, TabResult};
use crate::instance::TicDat;
use crate::schema::{ForeignKey, SchemaDescriptor, TableSchema};
use crate::table::{GeneratorTable, Key, KeyedTable, Record, RowTable, Table};
use crate::value::Value;

/// One source row, addressed by field name. Undeclared names are ignored.
pub type RawRow = BTreeMap<String, Value>;

/// Source rows per table name, in source order.
pub type RawTables = BTreeMap<String, Vec<RawRow>>;

/// Child rows whose foreign-key values match no parent key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyFailure {
    pub native_table: String,
    pub foreign_table: String,
    /// The native field values, in mapping order.
    pub native_values: Vec<Value>,
    /// How many child rows carry these values.
    pub row_count: usize,
}

/// Builds table collections for one validated schema.
#[derive(Debug, Clone)]
pub struct TicDatFactory {
    schema: SchemaDescriptor,
    config: FactoryConfig,
}

impl TicDatFactory {
    pub fn new(schema: SchemaDescriptor) -> TabResult<Self> {
        Self::with_config(schema, FactoryConfig::default())
    }

    pub fn with_config(schema: SchemaDescriptor, config: FactoryConfig) -> TabResult<Self> {
        schema.validate()?;
        info!(
            "Schema validated: {} tables, {} foreign keys",
            schema.tables.len(),
            schema.foreign_keys.len()
        );
        Ok(Self { schema, config })
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn all_tables(&self) -> impl Iterator<Item = &str> {
        self.schema.tables.keys().map(String::as_str)
    }

    pub fn table_schema(&self, table: &str) -> TabResult<&TableSchema> {
        self.schema
            .table(table)
            .ok_or_else(|| TabError::UnknownTable(table.to_string()))
    }

    pub fn primary_key_fields(&self, table: &str) -> TabResult<&[String]> {
        Ok(&self.table_schema(table)?.primary_key_fields)
    }

    pub fn data_fields(&self, table: &str) -> TabResult<&[String]> {
        Ok(&self.table_schema(table)?.data_fields)
    }

    pub fn default_value(&self, table: &str, field: &str) -> Option<&Value> {
        self.schema.table(table)?.default_value(field)
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.schema.foreign_keys
    }

    /// Build a mutable instance.
    pub fn tic_dat(&self, raw: &RawTables) -> TabResult<TicDat> {
        self.build(raw, true)
    }

    /// Build a frozen instance.
    pub fn frozen_tic_dat(&self, raw: &RawTables) -> TabResult<TicDat> {
        self.build(raw, false)
    }

    /// Build every schema table from `raw`. Tables absent from `raw` are empty.
    ///
    /// Either every table builds or the call fails.
    pub fn build(&self, raw: &RawTables, mutable: bool) -> TabResult<TicDat> {
        if let Some(unknown) = raw.keys().find(|t| self.schema.table(t).is_none()) {
            return Err(TabError::UnknownTable(unknown.clone()));
        }

        let mut tables = BTreeMap::new();
        for (name, schema) in &self.schema.tables {
            let rows = raw.get(name).map(Vec::as_slice).unwrap_or(&[]);
            let table = self.build_table(name, schema, rows)?;
            debug!("Built table {} ({} source rows)", name, rows.len());
            tables.insert(name.clone(), table);
        }
        Ok(TicDat::from_tables(tables, !mutable))
    }

    fn build_table(&self, name: &str, schema: &TableSchema, rows: &[RawRow]) -> TabResult<Table> {
        if !schema.is_keyed() {
            let records = rows
                .iter()
                .map(|row| self.record_from_row(name, schema, row))
                .collect::<TabResult<Vec<_>>>()?;
            return Ok(if schema.generator {
                Table::Generator(GeneratorTable::from_rows(records))
            } else {
                Table::Rows(RowTable::from_rows(records))
            });
        }

        let mut table = KeyedTable::new();
        for row in rows {
            let key = self.key_from_row(name, schema, row)?;
            let record = self.record_from_row(name, schema, row)?;
            if let Some(existing) = table.get(&key) {
                if existing != &record {
                    if self.config.duplicate_keys == DuplicateKeyPolicy::Strict {
                        return Err(TabError::DuplicateKey {
                            table: name.to_string(),
                            key: key.to_string(),
                        });
                    }
                    debug!("Duplicate key {} in {}: later row wins", key, name);
                }
            }
            table.insert(key, record);
        }
        Ok(Table::Keyed(table))
    }

    fn key_from_row(&self, table: &str, schema: &TableSchema, row: &RawRow) -> TabResult<Key> {
        schema
            .primary_key_fields
            .iter()
            .map(|field| {
                let value = row.get(field).ok_or_else(|| TabError::MissingKeyField {
                    table: table.to_string(),
                    field: field.clone(),
                })?;
                coerce(table, schema, field, value)
            })
            .collect::<TabResult<Vec<_>>>()
            .map(Key::new)
    }

    fn record_from_row(&self, table: &str, schema: &TableSchema, row: &RawRow) -> TabResult<Record> {
        let mut record = Record::new();
        for field in &schema.data_fields {
            let value = match row.get(field) {
                Some(value) => coerce(table, schema, field, value)?,
                None => schema.default_value(field).cloned().unwrap_or(Value::Null),
            };
            record.set(field.as_str(), value);
        }
        Ok(record)
    }

    /// The coerced primary key of `row` as construction would compute it.
    pub fn key(&self, table: &str, row: &RawRow) -> TabResult<Key> {
        let schema = self.table_schema(table)?;
        if !schema.is_keyed() {
            return Err(TabError::TableShape {
                table: table.to_string(),
                expected: "keyed",
                actual: "keyless",
            });
        }
        self.key_from_row(table, schema, row)
    }

    /// A raw row from values listed in header order (key fields, then data fields).
    pub fn row(&self, table: &str, values: Vec<Value>) -> TabResult<RawRow> {
        let schema = self.table_schema(table)?;
        let expected = schema.primary_key_fields.len() + schema.data_fields.len();
        check_arity(table, expected, values.len())?;
        Ok(schema.all_fields().map(str::to_string).zip(values).collect())
    }

    /// A record from data field values listed in declared order.
    pub fn record(&self, table: &str, values: Vec<Value>) -> TabResult<Record> {
        let schema = self.table_schema(table)?;
        check_arity(table, schema.data_fields.len(), values.len())?;
        schema
            .data_fields
            .iter()
            .zip(values)
            .map(|(field, value)| -> TabResult<(String, Value)> {
                Ok((field.clone(), coerce(table, schema, field, &value)?))
            })
            .collect()
    }

    /// True when both instances hold the same data for every table of this schema.
    ///
    /// Only fields this schema declares are compared. Keyless tables compare as
    /// multisets of rows. An instance lacking one of the schema's tables is an
    /// error, not a mismatch.
    pub fn same_data(&self, a: &TicDat, b: &TicDat) -> TabResult<bool> {
        for (name, schema) in &self.schema.tables {
            let left = a.table(name)?;
            let right = b.table(name)?;
            let equal = match (left, right) {
                (Table::Keyed(x), Table::Keyed(y)) if schema.is_keyed() => {
                    keyed_equal(&schema.data_fields, x, y)
                }
                _ if schema.is_keyed() => {
                    let odd = if left.is_keyed() { right } else { left };
                    return Err(TabError::TableShape {
                        table: name.clone(),
                        expected: "keyed",
                        actual: odd.shape(),
                    });
                }
                (Table::Keyed(_), _) | (_, Table::Keyed(_)) => {
                    return Err(TabError::TableShape {
                        table: name.clone(),
                        expected: "keyless",
                        actual: "keyed",
                    });
                }
                _ => {
                    let fields: Vec<&str> = schema.all_fields().collect();
                    rows_equal(&fields, left, right)
                }
            };
            if !equal {
                debug!("Table {} differs", name);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// A copy of `dat` with primary key fields folded into every record.
    ///
    /// Keyed tables become row tables; keyless tables are carried over.
    pub fn keyless(&self, dat: &TicDat) -> TabResult<TicDat> {
        let mut tables = BTreeMap::new();
        for (name, schema) in &self.schema.tables {
            let table = match dat.table(name)? {
                Table::Keyed(keyed) => Table::Rows(RowTable::from_rows(fold_keys(schema, keyed))),
                other => other.clone(),
            };
            tables.insert(name.clone(), table);
        }
        Ok(TicDat::from_tables(tables, dat.is_frozen()))
    }

    /// Child rows whose foreign key values have no matching parent key.
    pub fn find_foreign_key_failures(&self, dat: &TicDat) -> TabResult<Vec<ForeignKeyFailure>> {
        let mut failures = Vec::new();
        for fk in &self.schema.foreign_keys {
            let parent_schema = self.table_schema(&fk.foreign_table)?;
            let positions: Vec<usize> = fk
                .foreign_fields()
                .filter_map(|f| parent_schema.primary_key_fields.iter().position(|p| p == f))
                .collect();
            let parent_keys: BTreeSet<Vec<Value>> = dat
                .keyed(&fk.foreign_table)?
                .keys()
                .map(|key| positions.iter().map(|&i| key.values()[i].clone()).collect())
                .collect();

            let child_schema = self.table_schema(&fk.native_table)?;
            let child_rows = match dat.table(&fk.native_table)? {
                Table::Keyed(keyed) => fold_keys(child_schema, keyed),
                other => other.keyless_rows().unwrap_or_default(),
            };

            let mut missing: BTreeMap<Vec<Value>, usize> = BTreeMap::new();
            for row in &child_rows {
                let values: Vec<Value> = fk
                    .native_fields()
                    .map(|f| row.get(f).cloned().unwrap_or_default())
                    .collect();
                if !parent_keys.contains(&values) {
                    *missing.entry(values).or_default() += 1;
                }
            }

            for (native_values, row_count) in missing {
                failures.push(ForeignKeyFailure {
                    native_table: fk.native_table.clone(),
                    foreign_table: fk.foreign_table.clone(),
                    native_values,
                    row_count,
                });
            }
        }
        if !failures.is_empty() {
            debug!("Found {} foreign key failures", failures.len());
        }
        Ok(failures)
    }
}

fn check_arity(table: &str, expected: usize, actual: usize) -> TabResult<()> {
    if expected != actual {
        return Err(TabError::Arity {
            table: table.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn coerce(table: &str, schema: &TableSchema, field: &str, value: &Value) -> TabResult<Value> {
    let field_type = schema.field_type(field);
    value.coerce(field_type).ok_or_else(|| TabError::TypeMismatch {
        table: table.to_string(),
        field: field.to_string(),
        expected: field_type.type_name(),
        value: value.to_string(),
    })
}

fn fold_keys(schema: &TableSchema, keyed: &KeyedTable) -> Vec<Record> {
    keyed
        .iter()
        .map(|(key, record)| {
            let mut row = record.clone();
            for (field, value) in schema.primary_key_fields.iter().zip(key.values()) {
                row.set(field.as_str(), value.clone());
            }
            row
        })
        .collect()
}

fn keyed_equal(data_fields: &[String], x: &KeyedTable, y: &KeyedTable) -> bool {
    x.len() == y.len()
        && x.iter().all(|(key, left)| match y.get(key) {
            Some(right) => data_fields.iter().all(|f| left.get(f) == right.get(f)),
            None => false,
        })
}

fn rows_equal(fields: &[&str], left: &Table, right: &Table) -> bool {
    let project = |table: &Table| -> Vec<Vec<Option<Value>>> {
        let mut rows: Vec<Vec<Option<Value>>> = table
            .keyless_rows()
            .unwrap_or_default()
            .iter()
            .map(|r| fields.iter().map(|f| r.get(f).cloned()).collect())
            .collect();
        rows.sort();
        rows
    };
    project(left) == project(right)
}
