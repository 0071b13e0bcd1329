//! CLI command implementations

pub mod catalog;
pub mod commit;
pub mod completions;
pub mod frac;
pub mod grid;
pub mod init;
pub mod records;
pub mod report;
pub mod size;
pub mod sync;
