//! Flowopt engine
//!
//! Two cooperating optimization loops over the `flowopt-model` vocabulary:
//!
//! - [`search::WorkflowSearch`] -- the outer loop. Maintains a tree of
//!   workflow-graph variants, selects promising nodes with a soft mixed
//!   probability, expands them through the Proposer, evaluates children and
//!   backpropagates scores.
//! - [`optimizer::ParameterOptimizer`] -- the inner loop. For a fixed
//!   workflow structure, iteratively refines a numeric parameter vector with
//!   batches of concurrent Proposer suggestions validated by the Scorer,
//!   under a consecutive-stall convergence rule.
//!
//! The outer loop treats one full inner run as the evaluation step for a
//! workflow variant: a variant's fitness is the best performance its inner
//! optimizer converges to.
//!
//! # Example
//!
//! ```rust,ignore
//! use flowopt_engine::{OptimizerConfig, ParameterOptimizer};
//! use flowopt_model::ParameterSet;
//! use std::sync::Arc;
//!
//! # async fn example(scorer: Arc<MyScorer>, proposer: Arc<MyProposer>) {
//! let config = OptimizerConfig::new().with_max_iterations(50);
//! let optimizer = ParameterOptimizer::new(scorer, proposer, config);
//!
//! let seed = ParameterSet::new().with("take_profit", 2.5).with("stop_loss", 1.0);
//! let run = optimizer.optimize(seed, "eurusd-2019-2024").await.unwrap();
//! println!("best: {:?}", run.best);
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod convergence;
pub mod error;
pub mod optimizer;
pub mod persist;
pub mod search;
pub mod traits;

// Re-exports for convenience
pub use config::{OptimizerConfig, SearchConfig};
pub use convergence::{ConvergenceTracker, PlateauDetector};
pub use error::{EngineError, PersistError};
pub use optimizer::ParameterOptimizer;
pub use persist::RunArtifact;
pub use search::{SearchNode, SearchReport, WorkflowSearch};
pub use traits::{
    FeedbackEntry, Proposal, ProposalContext, ProposeError, Proposer, Scorer, WorkflowEval,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the engine
    pub use crate::{
        EngineError, OptimizerConfig, ParameterOptimizer, Proposal, ProposalContext,
        ProposeError, Proposer, RunArtifact, Scorer, SearchConfig, SearchReport, WorkflowEval,
        WorkflowSearch,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
