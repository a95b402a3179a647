//! Error kinds surfaced by the storage core.
//!
//! Every public operation returns [`Result<T>`] rather than panicking, so a
//! caller (eventually the command-language layer this crate is built for)
//! can match on failure mode instead of parsing a message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("name {name:?} is longer than {max} bytes")]
    NameTooLong { name: String, max: usize },

    #[error("catalog is full (max {max} tables)")]
    CatalogFull { max: usize },

    #[error("table has too many columns (max {max})")]
    TooManyColumns { max: usize },

    #[error("unknown column type code {code}")]
    UnknownType { code: u8 },

    #[error("table {0:?} not found")]
    TableNotFound(String),

    #[error("expected {expected} values, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("column {column:?} expected a {expected} value")]
    Type { column: String, expected: &'static str },

    #[error("table {table:?} has no column {column:?}")]
    UnknownColumn { table: String, column: String },

    #[error("database file is corrupt: {0}")]
    Corrupt(String),
}
