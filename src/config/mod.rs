//! Configuration module
//!
//! Settings are read from a TOML file; every section falls back to defaults.

pub mod config;

pub use config::{Config, DisplayConfig, LoaderConfig, LoggingConfig, QueryConfig};
