//! Spreadsheet adapter for tabdat
//!
//! Writes a [`TicDat`](tabdat_core::TicDat) as an `.xlsx` workbook with one
//! sheet per table and reads such workbooks back through the factory.
//!
//! ```no_run
//! use std::path::Path;
//! use tabdat_core::{SchemaDescriptor, TableSchema, TicDatFactory};
//! use tabdat_xls::XlsExt;
//!
//! # fn main() -> tabdat_core::TabResult<()> {
//! let factory = TicDatFactory::new(
//!     SchemaDescriptor::new().with_table("foods", TableSchema::new(["name"], ["cost"])),
//! )?;
//! let dat = factory.xls().create_tic_dat(Path::new("diet.xlsx"))?;
//! factory.xls().write_file(&dat, Path::new("diet_copy.xlsx"), false)?;
//! # Ok(())
//! # }
//! ```
//!
//! Cell round trips are lossy in a few ways:
//!
//! - a Null value is written as an empty cell and reads back as the empty
//!   string (or the field's default);
//! - every number reads back as a float unless it is integral;
//! - integers wider than 2^53 are written as text to keep their digits, so
//!   they read back as integers only through a [`FieldType::Int`] field
//!   and as text otherwise.
//!
//! Row counts survive even when every cell of a row is empty: written
//! workbooks carry a hidden [`ROW_COUNT_SHEET`] that reads use to restore
//! blank rows of keyless tables.
//!
//! [`FieldType::Int`]: tabdat_core::FieldType::Int

mod adapter;
mod cells;
mod staging;

pub use adapter::{Duplicates, XlsAdapter, ROW_COUNT_SHEET};

use tabdat_core::TicDatFactory;

/// `factory.xls()` access to the spreadsheet adapter.
pub trait XlsExt {
    fn xls(&self) -> XlsAdapter<'_>;
}

impl XlsExt for TicDatFactory {
    fn xls(&self) -> XlsAdapter<'_> {
        XlsAdapter::new(self)
    }
}
