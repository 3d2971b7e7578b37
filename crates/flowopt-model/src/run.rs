//! Optimization run records
//!
//! The top-level session record for one optimizer invocation: best candidate
//! so far, iteration count, convergence state and total Proposer spend.
//! Updated after every iteration, frozen at termination.

use crate::candidate::Candidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique run identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate a new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Improvement stayed below the threshold for the patience window
    Converged,
    /// Iteration budget exhausted
    BudgetExhausted,
    /// Wall-clock deadline expired; best-so-far returned
    DeadlineExpired,
    /// No valid candidate was ever produced
    NoViableResult,
}

/// Session record for one optimizer invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRun<P> {
    /// Run identifier
    pub id: RunId,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Best candidate found so far, `None` until a valid score lands
    pub best: Option<Candidate<P>>,
    /// Iterations completed
    pub iterations: u64,
    /// Whether convergence was declared
    pub converged: bool,
    /// Total Proposer spend across the run
    pub total_cost: f64,
    /// Set exactly once, at termination
    pub termination: Option<TerminationReason>,
}

impl<P> OptimizationRun<P> {
    /// Start a fresh run record
    #[must_use]
    pub fn start() -> Self {
        Self {
            id: RunId::new(),
            started_at: Utc::now(),
            best: None,
            iterations: 0,
            converged: false,
            total_cost: 0.0,
            termination: None,
        }
    }

    /// Whether the run ended without ever seeing a valid candidate
    #[inline]
    #[must_use]
    pub fn is_viable(&self) -> bool {
        self.best.is_some()
    }

    /// Freeze the record with its terminal state
    pub fn finish(&mut self, reason: TerminationReason) {
        self.converged = matches!(reason, TerminationReason::Converged);
        self.termination = Some(reason);
    }
}
