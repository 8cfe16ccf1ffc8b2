//! Input/output helpers.
//!
//! - snapshot JSON read/write (`snapshot`)
//! - local HTML pages for offline scans (`html`)

pub mod html;
pub mod snapshot;

pub use html::*;
pub use snapshot::*;
