//! Forward-only schema migrations tracked in `_provenance_migrations`.

pub mod runner;
pub mod types;

pub use runner::*;
pub use types::*;
