//! Flowopt data model
//!
//! The shared vocabulary of the optimization engine:
//! - Parameter sets and their schema invariants
//! - Performance metrics and the valid/invalid scoring outcome
//! - Candidates with generation counters and lineage
//! - Workflow graphs with structural validation
//! - Run records and the append-only cost ledger
//!
//! Everything here is plain data plus invariant checks; the loops that
//! produce and consume these values live in `flowopt-engine`.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod candidate;
pub mod cost;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod params;
pub mod run;

// Re-exports for convenience
pub use candidate::{Candidate, CandidateId, GraphCandidate, ParamCandidate};
pub use cost::CostLedger;
pub use error::ModelError;
pub use graph::{OperatorPattern, OperatorVocabulary, WorkflowGraph, WorkflowNode};
pub use metrics::{PerformanceResult, ScoreOutcome};
pub use params::{ParamValue, ParameterSet};
pub use run::{OptimizationRun, RunId, TerminationReason};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
