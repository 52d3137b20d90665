//! The temporal aggregation engine. Everything here is a pure function over borrowed records:
//! inputs are never mutated and every call builds fresh structures for the presentation layer.
//!
//! - [temporal] resolves instants, including legacy string dates.
//! - [range] filters by inclusive day ranges.
//! - [grouping] buckets by day or month.
//! - [calendar], [chart] and [hierarchy] shape data for the three visualizations.
//! - [color] derives theme colors.

pub mod calendar;
pub mod chart;
pub mod color;
pub mod grouping;
pub mod hierarchy;
pub mod range;
pub mod temporal;
