//! `leo-mrr` library crate.
//!
//! Estimates how many ships passing a maritime corridor could buy LEO
//! satellite internet, and the monthly recurring revenue they represent:
//!
//! 1. unique ships per year from a transit series (`estimate::unique`)
//! 2. per-type allocation and adoption ranges (`estimate::demand`)
//! 3. capacity-driven revenue from plan caps and usage (`estimate::revenue`)
//!
//! plus a projection of LEO-equipped transits (`estimate::transits`).
//!
//! The binary (`leo`) is a thin wrapper around this library so the stages are
//! testable without spawning processes.

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod estimate;
pub mod io;
pub mod plot;
pub mod report;
