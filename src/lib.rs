//! QCM: garment measurement recording and tolerance evaluation
//!
//! Inspectors record deviations from nominal for sampled garments, per size
//! and tolerance group, against a catalog of measurement points whose specs
//! are written as imperial fractions. Committed (size, key) pairs are locked
//! until reopened.

pub mod cli;
pub mod core;
pub mod entities;
pub mod schema;
pub mod yaml;
