//! Engine configuration
//!
//! The configuration surface the engine consumes but does not own: iteration
//! budgets, convergence thresholds, batch width, timeouts, and the outer
//! loop's exploration and plateau tuning.

use flowopt_model::OperatorVocabulary;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of the recursive parameter optimizer (inner loop)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Maximum inner iterations
    pub max_iterations: u64,
    /// Minimum primary-metric improvement that resets the stall counter
    pub convergence_threshold: f64,
    /// Consecutive below-threshold iterations before convergence is declared
    pub convergence_patience: u32,
    /// Concurrent Proposer/Scorer calls per batch
    pub parallel_evaluations: usize,
    /// Timeout applied to each Scorer call
    pub scorer_timeout: Duration,
    /// Optional wall-clock budget; expiry returns the best found so far
    pub deadline: Option<Duration>,
}

impl OptimizerConfig {
    /// Create the default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With iteration budget
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = max;
        self
    }

    /// With convergence threshold
    #[inline]
    #[must_use]
    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    /// With convergence patience
    #[inline]
    #[must_use]
    pub fn with_convergence_patience(mut self, patience: u32) -> Self {
        self.convergence_patience = patience.max(1);
        self
    }

    /// With batch width
    #[inline]
    #[must_use]
    pub fn with_parallel_evaluations(mut self, n: usize) -> Self {
        self.parallel_evaluations = n.max(1);
        self
    }

    /// With per-score timeout
    #[inline]
    #[must_use]
    pub fn with_scorer_timeout(mut self, timeout: Duration) -> Self {
        self.scorer_timeout = timeout;
        self
    }

    /// With wall-clock deadline
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            convergence_threshold: 0.01,
            convergence_patience: 3,
            parallel_evaluations: 4,
            scorer_timeout: Duration::from_secs(30),
            deadline: None,
        }
    }
}

/// Configuration of the workflow search tree (outer loop)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum outer iterations
    pub max_iterations: u64,
    /// Improvement below this counts toward the plateau window
    pub plateau_epsilon: f64,
    /// Iterations without meaningful improvement before the search stops
    pub plateau_window: u32,
    /// Blend between uniform and score-weighted selection, in (0, 1].
    /// Higher values explore more; clamped away from zero so every node
    /// keeps strictly positive selection probability.
    pub exploration_mix: f64,
    /// Maximum edge count a proposed graph may carry
    pub complexity_ceiling: usize,
    /// Retries granted to the Proposer per expansion before the iteration
    /// is skipped
    pub expansion_retries: u32,
    /// Wall-clock budget for one node evaluation (one full inner run)
    pub node_deadline: Option<Duration>,
    /// RNG seed for selection sampling; `None` seeds from entropy
    pub rng_seed: Option<u64>,
    /// Sub-graph patterns offered to the Proposer
    pub vocabulary: OperatorVocabulary,
    /// Inner-loop configuration applied to every node evaluation
    pub optimizer: OptimizerConfig,
}

impl SearchConfig {
    /// Create the default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With outer iteration budget
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = max;
        self
    }

    /// With plateau detection window
    #[inline]
    #[must_use]
    pub fn with_plateau(mut self, epsilon: f64, window: u32) -> Self {
        self.plateau_epsilon = epsilon;
        self.plateau_window = window.max(1);
        self
    }

    /// With exploration mix
    #[inline]
    #[must_use]
    pub fn with_exploration_mix(mut self, mix: f64) -> Self {
        self.exploration_mix = mix.clamp(1e-6, 1.0);
        self
    }

    /// With complexity ceiling
    #[inline]
    #[must_use]
    pub fn with_complexity_ceiling(mut self, ceiling: usize) -> Self {
        self.complexity_ceiling = ceiling;
        self
    }

    /// With expansion retry budget
    #[inline]
    #[must_use]
    pub fn with_expansion_retries(mut self, retries: u32) -> Self {
        self.expansion_retries = retries;
        self
    }

    /// With per-node evaluation deadline
    #[inline]
    #[must_use]
    pub fn with_node_deadline(mut self, deadline: Duration) -> Self {
        self.node_deadline = Some(deadline);
        self
    }

    /// With RNG seed (deterministic selection)
    #[inline]
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// With operator vocabulary
    #[inline]
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: OperatorVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// With inner-loop configuration
    #[inline]
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            plateau_epsilon: 0.01,
            plateau_window: 5,
            exploration_mix: 0.35,
            complexity_ceiling: 16,
            expansion_retries: 3,
            node_deadline: None,
            rng_seed: None,
            vocabulary: OperatorVocabulary::new(),
            optimizer: OptimizerConfig::default(),
        }
    }
}
