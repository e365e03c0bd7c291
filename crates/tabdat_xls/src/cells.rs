//! Conversion between spreadsheet cells and [`Value`]s.

use anyhow::{Context, Result};
use calamine::Data;
use rust_xlsxwriter::Worksheet;
use tabdat_core::Value;

/// The value stored in a cell, or `None` for an empty cell.
///
/// Dates, durations and error cells come back as their display text.
pub(crate) fn read_cell(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::Int(i) => Some(Value::Int(*i)),
        Data::Float(f) => Some(Value::Float(*f)),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::String(s) => Some(Value::Text(s.clone())),
        other => Some(Value::Text(other.to_string())),
    }
}

/// Header cell text used to match columns against field names.
pub(crate) fn header_name(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|cell| matches!(cell, Data::Empty))
}

/// Write `value` at (`row`, `col`). Null leaves the cell empty.
///
/// Excel has no representation for NaN or infinities, so non-finite floats
/// are written as text ("inf", "-inf", "NaN"). A float-typed field parses
/// them back on read.
pub(crate) fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b).map_err(xlsx_error)?;
        }
        Value::Int(i) => {
            // f64 holds integers exactly up to 2^53; wider ones keep their digits as text
            if i.unsigned_abs() <= (1u64 << 53) {
                sheet.write_number(row, col, *i as f64).map_err(xlsx_error)?;
            } else {
                sheet.write_string(row, col, i.to_string()).map_err(xlsx_error)?;
            }
        }
        Value::Float(f) if f.is_finite() => {
            sheet.write_number(row, col, *f).map_err(xlsx_error)?;
        }
        Value::Float(f) => {
            sheet.write_string(row, col, f.to_string()).map_err(xlsx_error)?;
        }
        Value::Text(s) => {
            sheet
                .write_string(row, col, s.as_str())
                .map_err(xlsx_error)
                .with_context(|| format!("Failed to write text cell at row {} col {}", row, col))?;
        }
    }
    Ok(())
}

pub(crate) fn xlsx_error(err: rust_xlsxwriter::XlsxError) -> anyhow::Error {
    anyhow::anyhow!("{}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cell_kinds() {
        assert_eq!(read_cell(&Data::Empty), None);
        assert_eq!(read_cell(&Data::Float(2.5)), Some(Value::Float(2.5)));
        assert_eq!(read_cell(&Data::Int(4)), Some(Value::Int(4)));
        assert_eq!(read_cell(&Data::Bool(true)), Some(Value::Bool(true)));
        assert_eq!(
            read_cell(&Data::String("Boston".into())),
            Some(Value::Text("Boston".into()))
        );
    }

    #[test]
    fn test_integral_float_cell_equals_int() {
        // Excel stores every number as a double
        assert_eq!(read_cell(&Data::Float(100.0)), Some(Value::Int(100)));
    }

    #[test]
    fn test_blank_row() {
        assert!(is_blank_row(&[Data::Empty, Data::Empty]));
        assert!(!is_blank_row(&[Data::Empty, Data::Float(0.0)]));
        assert!(is_blank_row(&[]));
    }

    #[test]
    fn test_header_name() {
        assert_eq!(header_name(&Data::String("qty".into())), Some("qty".into()));
        assert_eq!(header_name(&Data::Empty), None);
    }
}
