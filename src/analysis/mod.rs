//! Aggregation and issue detection over the normalized event stream.

pub mod aggregator;
pub mod issues;

pub use aggregator::*;
pub use issues::*;
