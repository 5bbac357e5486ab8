//! The buffer-overflow analysis engine.
//!
//! Classifies every memory access that goes through pointer arithmetic as
//! safe, overflowing, or indeterminate. The machinery: a demand-driven range
//! solver over the def-use graph, predicate-based refinement from dominating
//! branches, buffer-size inference, a three-valued overflow decision, and
//! interprocedural propagation through per-parameter summaries and deferred
//! triggers. Functions are analyzed callee-first.

mod analyzer;
mod buffer;
mod common;
mod context;
mod gsa;
mod interproc;
mod overflow;
mod range;
mod refine;
mod report;

pub use analyzer::Analyzer;
pub use buffer::AllocationOracle;
pub use context::{ArgKey, Trigger, Verdict, VulnerabilityInfo};
pub use gsa::{GatingCond, GsaBuilder};
pub use refine::REACHABILITY_VISIT_LIMIT;
pub use report::{
    CollectingReporter, Finding, FindingKind, ReportSink, Severity, TextReporter, Totals,
};
