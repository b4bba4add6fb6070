pub mod db;
pub mod qdrant;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A result row keyed by column name, in the column order of the select list.
pub type Row = serde_json::Map<String, serde_json::Value>;
