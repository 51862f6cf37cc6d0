//! Provenance ledger common core types and utilities.

pub mod error;
pub mod id;
pub mod timestamp;

pub use error::{Error, Result};
pub use id::{FileId, IdParseError, RecordId};
pub use timestamp::{Timestamp, TimestampParseError};
