//! Provenance CLI library.
//!
//! Argument parsing, commands and output formatting for the `provenance`
//! binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod storage;

pub use cli::{Cli, Exit};
pub use error::CliError;
