//! Collaborator interfaces
//!
//! The engine consumes two narrow async contracts: a [`Scorer`] that assigns
//! performance metrics to a candidate, and a [`Proposer`] that generates new
//! candidates from a current one plus feedback. Both are suspension points;
//! the engine fans batches of calls out concurrently and joins them before
//! ranking.
//!
//! Proposer output is untyped JSON. It crosses a strict validation boundary
//! inside the engine (deserialization plus invariant checks) before anything
//! is scored; nothing unvalidated ever reaches a Scorer.

use async_trait::async_trait;
use flowopt_model::{Candidate, OperatorVocabulary, ParameterSet, ScoreOutcome, WorkflowGraph};

/// Proposer failure modes
///
/// Transport failures are fatal and abort the run; a malformed response is
/// recoverable and is recorded as feedback instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProposeError {
    /// The Proposer itself is unreachable (connection-level failure)
    #[error("proposer transport failure: {0}")]
    Transport(String),

    /// The Proposer answered, but the response is unusable
    #[error("malformed proposal: {reason}")]
    Malformed {
        /// Why the response was rejected
        reason: String,
        /// Spend incurred by the failed call; cost accrues either way
        cost: f64,
    },
}

/// One proposal returned by a Proposer
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Raw, unvalidated payload
    pub payload: serde_json::Value,
    /// Spend incurred by this call
    pub cost: f64,
}

impl Proposal {
    /// Create a proposal
    #[inline]
    #[must_use]
    pub fn new(payload: serde_json::Value, cost: f64) -> Self {
        Self { payload, cost }
    }
}

/// Feedback accumulated across iterations and handed back to the Proposer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackEntry {
    /// A candidate was scored; its generation and primary metric
    Scored {
        /// Generation of the scored candidate
        generation: u64,
        /// Primary metric value
        primary: f64,
    },
    /// A proposal was rejected before or during scoring
    Rejected {
        /// Rejection reason
        reason: String,
    },
}

/// Context handed to the Proposer for one call
#[derive(Debug)]
pub struct ProposalContext<'a, P> {
    /// The candidate to improve on
    pub current: &'a Candidate<P>,
    /// Accumulated feedback: prior scores and prior failures
    pub feedback: &'a [FeedbackEntry],
    /// Allowed sub-graph patterns, present for workflow proposals only
    pub vocabulary: Option<&'a OperatorVocabulary>,
}

/// External generator of new candidates
#[async_trait]
pub trait Proposer<P>: Send + Sync {
    /// Propose a modified candidate payload
    ///
    /// # Errors
    /// - `ProposeError::Transport` on connection-level failure (fatal)
    /// - `ProposeError::Malformed` on an unusable response (recoverable)
    async fn propose(&self, ctx: ProposalContext<'_, P>) -> Result<Proposal, ProposeError>;
}

/// External evaluator of candidates against a dataset
///
/// Implementations must be safe to call concurrently with different
/// candidates against the same dataset, and must not fail on malformed
/// input -- malformed input yields [`ScoreOutcome::Invalid`].
#[async_trait]
pub trait Scorer<C>: Send + Sync {
    /// Score one candidate
    async fn score(&self, candidate: &C, dataset: &str) -> ScoreOutcome;
}

/// Input to a workflow-level Scorer: a graph fixed for the inner loop plus
/// one parameter set produced by it
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowEval {
    /// The workflow structure under evaluation
    pub graph: WorkflowGraph,
    /// The parameter set to score within that structure
    pub params: ParameterSet,
}
