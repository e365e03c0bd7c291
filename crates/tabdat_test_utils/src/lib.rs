//! Shared test fixtures for tabdat crates.
//!
//! Three schemas with data, each exercising a different corner:
//!
//! - `diet`: single and two-field keys, an infinite float bound
//! - `netflow`: key-only tables, three-field keys, foreign keys
//! - `silly`: mixed value kinds in keys, a keyless row table with duplicates

pub mod fixtures;

pub use fixtures::{
    diet_data, diet_schema, netflow_data, netflow_schema, raw_rows, silly_data, silly_schema,
};
