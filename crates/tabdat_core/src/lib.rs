//! Schema-driven table collections
//!
//! A [`SchemaDescriptor`] declares tables: primary key fields, data fields,
//! defaults, types, foreign keys and which keyless tables are generators. A
//! [`TicDatFactory`] validates the descriptor once and then builds
//! [`TicDat`] instances from raw rows, either mutable or frozen.
//!
//! File adapters live in sibling crates and share this contract: they turn a
//! source into [`RawTables`] and hand it to [`TicDatFactory::build`], and they
//! write instances back in the factory's field order.
//!
//! # Modules
//!
//! - [`schema`]: descriptor types and validation
//! - [`factory`]: construction, comparison, key folding, foreign key checks
//! - [`table`]: keyed, row and generator table shapes
//! - [`instance`]: the mutable/frozen collection
//! - [`value`]: scalar values and field types
//! - [`config`]: factory options

pub mod config;
pub mod error;
pub mod factory;
pub mod instance;
pub mod schema;
pub mod table;
pub mod value;

pub use config::{DuplicateKeyPolicy, FactoryConfig};
pub use error::{TabError, TabResult};
pub use factory::{ForeignKeyFailure, RawRow, RawTables, TicDatFactory};
pub use instance::TicDat;
pub use schema::{FieldMapping, ForeignKey, SchemaDescriptor, TableSchema};
pub use table::{GeneratorTable, Key, KeyedTable, Record, RowIter, RowTable, Table};
pub use value::{FieldType, Value};
