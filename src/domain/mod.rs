//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - instrument families and scanned fields (`InstrumentKind`, `Field`)
//! - validated values (`Isin`, `Rate`)
//! - scanner output (`RawRecord`) and priced output (`BondQuote`)
//! - run configuration (`ScrapeConfig`)

pub mod types;

pub use types::*;
