//! Tender evaluation engine.
//!
//! The crate is a pure transformation layer: a validated [`evaluation::CriteriaTree`]
//! plus raw reviewer scores go in, aggregated totals, ranks, comparison diffs, and a
//! summary report come out. No persistence, no hidden state beyond the criteria a
//! session was opened with; the hosting service owns record lifecycles.

pub mod comparison;
pub mod config;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod summary;
pub mod telemetry;
