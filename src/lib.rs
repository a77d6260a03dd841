//! Load delimited text files as typed tables and query them with read-only SQL.
//!
//! The usual entry point is [`session::Session`]: load files, run statements,
//! get [`projection::GenericTable`]s back for display or export.

pub mod catalog;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod export;
pub mod projection;
pub mod session;
pub mod utils;

pub use error::{Error, QueryError, Result};
