//! A single-file, fixed-width relational store: one catalog of up to
//! [`layout::MAX_TABLES`] tables, each a linked list of fixed-size pages of
//! fixed-width records.
//!
//! [`Database`] is the entry point. It owns no state beyond a path and a
//! [`Config`]; every operation opens the backing file, takes an advisory
//! lock for its duration, and releases both when it returns.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod layout;
pub mod ops;
pub mod pager;
pub mod record;
pub mod value;

pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use layout::ColumnType;
pub use ops::ProjectedRow;
pub use value::{AcceptAll, Cell, Predicate, Row};
