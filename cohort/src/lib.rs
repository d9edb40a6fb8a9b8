//! Cohort resolution and parameter validation for neuroimaging group studies.
//!
//! The crate turns a BIDS or CAPS directory into a deterministic list of
//! subject/session pairs, checks pipeline parameters, and resolves the
//! per-image input files a group analysis needs. The architecture enforces
//! a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (identifiers, aggregation,
//!   parameter checks, pattern rendering). No I/O.
//! - **[`io`]**: Side-effecting operations (directory scans, TSV tables,
//!   globbing, config files).
//!
//! [`pipelines`] coordinates core logic with I/O for the statistics-surface
//! and t1-volume-parcellation group pipelines; the numeric computation and
//! workflow scheduling behind them are supplied by the caller.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipelines;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
