//! Analysis modules.
//!
//! Reductions over loaded measurement tables and the unit conversions used
//! for derived columns.

pub mod aggregator;
pub mod units;

pub use aggregator::*;
