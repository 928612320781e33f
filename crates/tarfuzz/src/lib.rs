//! Generation-based robustness harness for tar extractors.
//!
//! The harness builds a fixed, enumerable battery of deliberately malformed
//! or boundary-valued tar archives (via [`tar_record`]), feeds each one to
//! an external extractor program, and classifies every run as crashed,
//! rejected with an error, or silent. It is not a coverage-guided fuzzer:
//! the test set is a catalog, not an evolving corpus, so two campaigns
//! against the same extractor produce the same tallies.
//!
//! The crate is organized the way the campaign runs:
//!
//! - [`mutation`] — the catalog of named field mutations;
//! - [`harness`] — one subprocess run: spawn, classify, persist crashes;
//! - [`campaign`] — the orchestrator sequencing every field and scenario;
//! - [`report`] — the colored operator-facing summary.

pub mod campaign;
pub mod harness;
pub mod mutation;
pub mod report;
