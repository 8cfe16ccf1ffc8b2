//! Record recovery from listing-page HTML.
//!
//! - `grammar`: per-family field sequences and recognizers
//! - `scanner`: the finite-state scanner driving them
//! - `text`: value cleanup helpers

pub mod grammar;
pub mod scanner;
pub mod text;

pub use grammar::{FamilyGrammar, FieldRule};
pub use scanner::{RecordScanner, ScanReport, scan_document};
