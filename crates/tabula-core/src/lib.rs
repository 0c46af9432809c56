//! Tabula Core - Data model and collaborator contracts for the table view engine
//!
//! This crate provides the fundamental types that the view engine consumes
//! and the traits it calls out through. It defines:
//!
//! - `Value`, `Row`, `Column`, `ResultSet` - the raw `(columns, rows)` data
//! - `ForeignKeyInfo` - foreign-key schema already extracted by a driver
//! - `LookupSource` - async trait for resolving foreign records and schema
//! - `ExportWriter` - trait for the byte-level export writers
//!
//! Nothing in here performs I/O. Drivers and writers live elsewhere and are
//! plugged in through the traits.

mod error;
mod export;
mod schema;
mod types;

pub use error::*;
pub use export::*;
pub use schema::*;
pub use types::*;
