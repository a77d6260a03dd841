//! Data layer: raw delimited text in, typed tables out.

// Core data modules
pub mod data_provider;
pub mod datatable;
pub mod identifiers;
pub mod type_inference;

// Loading
pub mod load_report;
pub mod raw_dataset;
pub mod table_loader;
