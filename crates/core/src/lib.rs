//! # mantis-core
//!
//! Reliability analytics engine for maintenance history: MTBF/MTTR metrics,
//! Pareto (80/20) rankings, failure-mode clustering, and an interval-based
//! next-failure predictor.
//!
//! The engine is a pure computation boundary. The storage layer batch-fetches
//! a tenant's maintenance history, joins it in memory into an
//! [`records::AnalyticsDataset`], and calls a report builder with an explicit
//! "now". Given the same dataset and instant, every builder is deterministic;
//! no state is held between invocations.
//!
//! ## Modules
//!
//! - [`records`] — hydrated input rows and the dataset lookups
//! - [`filters`] — report filters and date window resolution
//! - [`stats`] — mean, sample standard deviation, cumulative shares
//! - [`reliability`] — MTBF and MTTR reports
//! - [`pareto`] — vital-few/trivial-many rankings over four dimensions
//! - [`failure_modes`] — cause clustering, monthly and root-cause trends
//! - [`prediction`] — next-failure estimate with severity/confidence grading
//!
//! Dangling references degrade to "Unknown"/"Uncategorized" labels, thin
//! history yields an explicit insufficient-data outcome, and zero
//! denominators yield `None` fields; a report either computes completely or
//! fails fast with a validation error.

pub mod error;
pub mod failure_modes;
pub mod filters;
pub mod pareto;
pub mod prediction;
pub mod records;
pub mod reliability;
pub mod stats;
pub mod types;
