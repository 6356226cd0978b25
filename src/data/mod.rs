//! Data ingestion and storage
//!
//! Raw CSV tables, field parsers, record normalization and SQLite storage.

pub mod database;
pub mod normalize;
pub mod parse;
pub mod raw;

pub use database::{Database, DatabaseStats};
pub use normalize::{CompetitorProfile, NormalizedHistory, RecordNormalizer};
pub use raw::RawTables;
