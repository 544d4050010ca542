//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - stage exports (CSV) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
