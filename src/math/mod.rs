//! Yield arithmetic.

pub mod yields;

pub use yields::*;
