//! Workbook reading and writing for a [`TicDatFactory`].

use anyhow::Context;
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

use tabdat_core::{
    Key, RawRow, RawTables, Record, TabError, TabResult, Table, TableSchema, TicDat,
    TicDatFactory, Value,
};

use crate::cells::{header_name, is_blank_row, read_cell, write_cell, xlsx_error};
use crate::staging::StagedFile;

/// Duplicate primary keys found per keyed sheet, with occurrence counts.
pub type Duplicates = BTreeMap<String, BTreeMap<Key, usize>>;

/// Hidden sheet recording how many body rows each table sheet was written with.
///
/// Rows whose cells are all Null or empty text leave nothing in the file, so
/// the count is what lets a read restore them.
pub const ROW_COUNT_SHEET: &str = "_tabdat_rows";

const MAX_SHEET_NAME_CHARS: usize = 31;
const INVALID_SHEET_NAME_CHARS: [char; 7] = ['*', '?', ':', '[', ']', '\\', '/'];

/// Reads and writes `.xlsx` workbooks with one sheet per table.
///
/// Each sheet's first row holds field names; body rows follow. Columns are
/// matched to fields by name, so column order and extra columns don't matter.
/// Written workbooks also carry the hidden [`ROW_COUNT_SHEET`].
#[derive(Debug, Clone, Copy)]
pub struct XlsAdapter<'a> {
    factory: &'a TicDatFactory,
}

impl<'a> XlsAdapter<'a> {
    pub fn new(factory: &'a TicDatFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &'a TicDatFactory {
        self.factory
    }

    /// Write every schema table of `dat` to `path`, one sheet per table.
    ///
    /// Fails with [`TabError::DestinationExists`] if `path` exists and
    /// `allow_overwrite` is false. The instance is checked before anything
    /// touches the filesystem, and the workbook is staged next to the
    /// destination then renamed into place.
    pub fn write_file(&self, dat: &TicDat, path: &Path, allow_overwrite: bool) -> TabResult<()> {
        if path.exists() && !allow_overwrite {
            return Err(TabError::DestinationExists {
                path: path.to_path_buf(),
            });
        }
        self.check_writable(dat)?;

        let mut workbook = Workbook::new();
        let mut row_counts = Vec::new();
        for (name, schema) in &self.factory.schema().tables {
            let table = dat.table(name)?;
            let rows = self.render_table(name, schema, table)?;
            let fields: Vec<&str> = schema.all_fields().collect();

            let sheet = workbook.add_worksheet();
            sheet
                .set_name(name.as_str())
                .map_err(xlsx_error)
                .with_context(|| format!("Failed to name sheet '{}'", name))?;

            for (col, field) in fields.iter().enumerate() {
                let col = column_index(col)?;
                sheet
                    .write_string(0, col, *field)
                    .map_err(xlsx_error)
                    .with_context(|| format!("Failed to write header for sheet '{}'", name))?;
            }
            for (i, values) in rows.iter().enumerate() {
                let row = u32::try_from(i + 1)
                    .with_context(|| format!("Sheet '{}' has too many rows", name))?;
                for (col, value) in values.iter().enumerate() {
                    write_cell(sheet, row, column_index(col)?, value)
                        .with_context(|| format!("Failed to write sheet '{}'", name))?;
                }
            }
            debug!("Rendered sheet '{}' ({} rows)", name, rows.len());
            row_counts.push((name.as_str(), rows.len()));
        }
        if !row_counts.is_empty() {
            write_row_counts(&mut workbook, &row_counts)?;
        }

        let bytes = workbook
            .save_to_buffer()
            .map_err(xlsx_error)
            .context("Failed to render workbook")?;

        let stage = StagedFile::new(path)?;
        stage.write_all(&bytes)?;
        stage.commit()?;

        info!(
            "Wrote {} tables to {}",
            self.factory.schema().tables.len(),
            path.display()
        );
        Ok(())
    }

    /// Read `path` into a mutable instance.
    pub fn create_tic_dat(&self, path: &Path) -> TabResult<TicDat> {
        self.read(path, true)
    }

    /// Read `path` into a frozen instance.
    pub fn create_frozen_tic_dat(&self, path: &Path) -> TabResult<TicDat> {
        self.read(path, false)
    }

    pub fn read(&self, path: &Path, mutable: bool) -> TabResult<TicDat> {
        let raw = self.read_raw(path)?;
        let dat = self.factory.build(&raw, mutable)?;
        info!(
            "Read {} tables from {} ({})",
            raw.len(),
            path.display(),
            if mutable { "mutable" } else { "frozen" }
        );
        Ok(dat)
    }

    /// Primary keys that occur more than once in a keyed sheet.
    ///
    /// Construction keeps one row per key, so this is the only way to see
    /// what a duplicate-laden workbook collapsed.
    pub fn find_duplicates(&self, path: &Path) -> TabResult<Duplicates> {
        let raw = self.read_raw(path)?;
        let mut duplicates = Duplicates::new();

        for (name, rows) in &raw {
            if !self.factory.table_schema(name)?.is_keyed() {
                continue;
            }
            let mut counts: BTreeMap<Key, usize> = BTreeMap::new();
            for row in rows {
                *counts.entry(self.factory.key(name, row)?).or_default() += 1;
            }
            counts.retain(|_, count| *count > 1);
            if !counts.is_empty() {
                debug!("Sheet '{}' has {} duplicated keys", name, counts.len());
                duplicates.insert(name.clone(), counts);
            }
        }
        Ok(duplicates)
    }

    /// Raw rows for every schema table that has a sheet in `path`.
    ///
    /// Workbooks carrying [`ROW_COUNT_SHEET`] keep every body row, blank
    /// ones included, and get back any trailing blank rows the file could
    /// not hold. Without it, blank rows are dropped from keyed sheets and
    /// kept in keyless ones.
    pub fn read_raw(&self, path: &Path) -> TabResult<RawTables> {
        let mut workbook = open_workbook::<Xlsx<_>, _>(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;
        let sheet_names = workbook.sheet_names();
        let row_counts = if sheet_names.iter().any(|sheet| sheet == ROW_COUNT_SHEET) {
            Some(read_row_counts(&mut workbook)?)
        } else {
            None
        };

        let mut raw = RawTables::new();
        for (name, schema) in &self.factory.schema().tables {
            if !sheet_names.iter().any(|sheet| sheet == name) {
                warn!("No sheet for table '{}'; reading it as empty", name);
                continue;
            }
            let range = workbook
                .worksheet_range(name)
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("Failed to read sheet '{}'", name))?;

            let mut rows = range.rows();
            let Some(header) = rows.next() else {
                debug!("Sheet '{}' is empty", name);
                continue;
            };
            let columns = self.resolve_columns(name, schema, header)?;

            let written = row_counts.as_ref().and_then(|counts| counts.get(name).copied());
            let mut table_rows = Vec::new();
            for row in rows {
                if written.is_none() && schema.is_keyed() && is_blank_row(row) {
                    continue;
                }
                table_rows.push(self.raw_row(name, &columns, row));
            }
            if let Some(count) = written {
                while table_rows.len() < count {
                    table_rows.push(self.raw_row(name, &columns, &[]));
                }
            }
            debug!("Read sheet '{}' ({} rows)", name, table_rows.len());
            raw.insert(name.clone(), table_rows);
        }
        Ok(raw)
    }

    /// Column index for each schema field present in the header.
    ///
    /// Every primary-key field must be present, as must every foreign-key
    /// native field that has no default to fall back on.
    fn resolve_columns(
        &self,
        table: &str,
        schema: &TableSchema,
        header: &[Data],
    ) -> TabResult<Vec<(usize, String)>> {
        let mut positions: BTreeMap<String, usize> = BTreeMap::new();
        for (col, cell) in header.iter().enumerate() {
            if let Some(name) = header_name(cell) {
                positions.entry(name).or_insert(col);
            }
        }

        for field in &schema.primary_key_fields {
            if !positions.contains_key(field) {
                return Err(TabError::field_resolution(table, field.as_str()));
            }
        }
        for fk in self.factory.foreign_keys() {
            if fk.native_table != table {
                continue;
            }
            for field in fk.native_fields() {
                if !positions.contains_key(field) && schema.default_value(field).is_none() {
                    return Err(TabError::field_resolution(table, field));
                }
            }
        }

        let columns = schema
            .all_fields()
            .filter_map(|field| positions.get(field).map(|col| (*col, field.to_string())))
            .collect();
        Ok(columns)
    }

    fn raw_row(&self, table: &str, columns: &[(usize, String)], row: &[Data]) -> RawRow {
        let mut raw = RawRow::new();
        for (col, field) in columns {
            match row.get(*col).and_then(read_cell) {
                Some(value) => {
                    raw.insert(field.clone(), value);
                }
                None => {
                    let has_default = self.factory.default_value(table, field).is_some();
                    if !(has_default && self.factory.config().empty_cell_as_default) {
                        raw.insert(field.clone(), Value::Text(String::new()));
                    }
                }
            }
        }
        raw
    }

    /// Every schema table must be present with a shape its schema allows,
    /// under a name a workbook accepts as a sheet name.
    fn check_writable(&self, dat: &TicDat) -> TabResult<()> {
        let mut sheet_names = BTreeSet::new();
        for (name, schema) in &self.factory.schema().tables {
            check_sheet_name(name)?;
            if !sheet_names.insert(name.to_lowercase()) {
                return Err(TabError::SheetName {
                    table: name.clone(),
                    reason: "sheet names are case-insensitive and another table has the same name"
                        .to_string(),
                });
            }
            let table = dat.table(name)?;
            let compatible = if schema.is_keyed() {
                table.is_keyed()
            } else {
                !table.is_keyed()
            };
            if !compatible {
                return Err(TabError::TableShape {
                    table: name.clone(),
                    expected: if schema.is_keyed() { "keyed" } else { "keyless" },
                    actual: table.shape(),
                });
            }
            if let Table::Keyed(keyed) = table {
                let width = schema.primary_key_fields.len();
                if let Some(key) = keyed.keys().find(|key| key.len() != width) {
                    return Err(TabError::Arity {
                        table: name.clone(),
                        expected: width,
                        actual: key.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Body rows in header order: key values then data fields for keyed
    /// tables, all declared fields for keyless ones.
    fn render_table(
        &self,
        name: &str,
        schema: &TableSchema,
        table: &Table,
    ) -> TabResult<Vec<Vec<Value>>> {
        let data_row = |record: &Record, fields: &[String]| -> Vec<Value> {
            fields
                .iter()
                .map(|field| record.get(field).cloned().unwrap_or_default())
                .collect()
        };

        let rows = match table {
            Table::Keyed(keyed) => keyed
                .iter()
                .map(|(key, record)| {
                    let mut values = key.values().to_vec();
                    values.extend(data_row(record, schema.data_fields.as_slice()));
                    values
                })
                .collect(),
            Table::Rows(_) | Table::Generator(_) => {
                let fields: Vec<String> =
                    schema.all_fields().map(String::from).collect();
                table
                    .keyless_rows()
                    .ok_or_else(|| TabError::TableShape {
                        table: name.to_string(),
                        expected: "keyless",
                        actual: table.shape(),
                    })?
                    .iter()
                    .map(|record| data_row(record, fields.as_slice()))
                    .collect()
            }
        };
        Ok(rows)
    }
}

/// The sheet-name rules `.xlsx` workbooks impose, plus the reserved row-count sheet.
fn check_sheet_name(name: &str) -> TabResult<()> {
    let reason = if name.is_empty() {
        "sheet names cannot be empty".to_string()
    } else if name.chars().count() > MAX_SHEET_NAME_CHARS {
        format!("sheet names are limited to {} characters", MAX_SHEET_NAME_CHARS)
    } else if let Some(ch) = name.chars().find(|ch| INVALID_SHEET_NAME_CHARS.contains(ch)) {
        format!("sheet names cannot contain '{}'", ch)
    } else if name.starts_with('\'') || name.ends_with('\'') {
        "sheet names cannot start or end with an apostrophe".to_string()
    } else if name == ROW_COUNT_SHEET {
        "the name is reserved for the row-count sheet".to_string()
    } else {
        return Ok(());
    };
    Err(TabError::SheetName {
        table: name.to_string(),
        reason,
    })
}

fn write_row_counts(workbook: &mut Workbook, counts: &[(&str, usize)]) -> TabResult<()> {
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(ROW_COUNT_SHEET)
        .map_err(xlsx_error)
        .context("Failed to add the row-count sheet")?;
    sheet.set_hidden(true);
    sheet.write_string(0, 0, "table").map_err(xlsx_error)?;
    sheet.write_string(0, 1, "rows").map_err(xlsx_error)?;
    for (i, (name, count)) in counts.iter().enumerate() {
        let row = u32::try_from(i + 1).context("Too many tables for the row-count sheet")?;
        sheet.write_string(row, 0, *name).map_err(xlsx_error)?;
        sheet.write_number(row, 1, *count as f64).map_err(xlsx_error)?;
    }
    Ok(())
}

/// Written row count per table name. Malformed rows are ignored.
fn read_row_counts<RS>(workbook: &mut Xlsx<RS>) -> TabResult<BTreeMap<String, usize>>
where
    RS: std::io::Read + std::io::Seek,
{
    let range = workbook
        .worksheet_range(ROW_COUNT_SHEET)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to read the row-count sheet")?;

    let mut counts = BTreeMap::new();
    for row in range.rows().skip(1) {
        let (Some(Data::String(name)), Some(count)) = (row.first(), row.get(1)) else {
            continue;
        };
        let count = match count {
            Data::Int(n) => usize::try_from(*n).ok(),
            Data::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as usize),
            _ => None,
        };
        match count {
            Some(count) => {
                counts.insert(name.clone(), count);
            }
            None => warn!("Ignoring malformed row count for sheet '{}'", name),
        }
    }
    Ok(counts)
}

fn column_index(col: usize) -> TabResult<u16> {
    Ok(u16::try_from(col).context("Too many columns for a worksheet")?)
}
