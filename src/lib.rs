//! `btp-tracker` library crate.
//!
//! The binary (`btp`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable against fixture pages without spawning processes
//! - the scanner, yield math, and snapshot writer are reusable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod report;
pub mod scan;
pub mod snapshot;
