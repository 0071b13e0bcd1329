//! Embedded input schemas

pub mod registry;

pub use registry::{SchemaRegistry, CATALOG_SCHEMA};
