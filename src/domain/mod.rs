//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed vessel-type set (`VesselType`) and per-type tables (`TypeTable`)
//! - stage inputs (`TransitSeries`, `TypeTransits`, `Plan`)
//! - stage outputs (`UniqueShipEstimates`, `DemandEstimate`, `RevenueProjection`)

pub mod types;

pub use types::*;
