//! Recursive parameter optimizer (inner loop)
//!
//! Given a starting parameter set, a dataset identifier, a Scorer and a
//! Proposer, converge on a parameter set with near-maximal performance under
//! a fixed evaluation budget.
//!
//! Per iteration the optimizer fans out a batch of concurrent proposals,
//! validates each at the schema boundary, scores the survivors concurrently
//! under a per-call timeout, ranks the batch deterministically and feeds the
//! winner into a consecutive-stall convergence rule. All per-candidate
//! failures are caught at the batch boundary; only a Proposer transport
//! failure escapes as an error.

use crate::config::OptimizerConfig;
use crate::convergence::ConvergenceTracker;
use crate::error::EngineError;
use crate::traits::{FeedbackEntry, ProposalContext, ProposeError, Proposer, Scorer};
use flowopt_model::{
    CostLedger, OptimizationRun, ParamCandidate, ParameterSet, ScoreOutcome, TerminationReason,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;

/// Number of feedback entries retained for Proposer context
const FEEDBACK_WINDOW: usize = 64;

/// The inner optimization loop
#[derive(Debug)]
pub struct ParameterOptimizer<S, P> {
    scorer: Arc<S>,
    proposer: Arc<P>,
    config: OptimizerConfig,
    ledger: Arc<CostLedger>,
}

impl<S, P> ParameterOptimizer<S, P>
where
    S: Scorer<ParameterSet>,
    P: Proposer<ParameterSet>,
{
    /// Create an optimizer with its own cost ledger
    #[must_use]
    pub fn new(scorer: Arc<S>, proposer: Arc<P>, config: OptimizerConfig) -> Self {
        Self::with_ledger(scorer, proposer, config, Arc::new(CostLedger::new()))
    }

    /// Create an optimizer sharing an existing cost ledger
    ///
    /// The outer search tree uses this so that one ledger spans all inner
    /// runs of a session.
    #[must_use]
    pub fn with_ledger(
        scorer: Arc<S>,
        proposer: Arc<P>,
        config: OptimizerConfig,
        ledger: Arc<CostLedger>,
    ) -> Self {
        Self {
            scorer,
            proposer,
            config,
            ledger,
        }
    }

    /// The cost ledger for this optimizer
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    /// Run the optimization loop to termination
    ///
    /// The schema of `initial` (key set and value types) is binding for every
    /// proposal; proposals that drop keys, add keys or change types are
    /// rejected at the validation boundary and recorded as feedback.
    ///
    /// # Errors
    /// `EngineError::ProposerUnreachable` if the Proposer reports a
    /// transport-level failure. All other per-candidate failures are
    /// recoverable and never abort the run.
    pub async fn optimize(
        &self,
        initial: ParameterSet,
        dataset: &str,
    ) -> Result<OptimizationRun<ParameterSet>, EngineError> {
        let started = Instant::now();
        let mut run: OptimizationRun<ParameterSet> = OptimizationRun::start();
        tracing::info!(run_id = %run.id, dataset, "starting parameter optimization");

        let schema = initial.clone();
        let baseline = ParamCandidate::seed(initial);

        let mut feedback: Vec<FeedbackEntry> = Vec::new();
        let mut best: Option<ParamCandidate> = None;

        // Baseline score for the seed. An invalid seed leaves `best` empty;
        // the unscored seed still anchors proposal generation.
        match self.score_one(&baseline.payload, dataset).await {
            ScoreOutcome::Valid(result) => {
                let primary = result.primary();
                feedback.push(FeedbackEntry::Scored {
                    generation: 0,
                    primary,
                });
                best = Some(baseline.clone().scored(result));
                tracing::debug!(primary, "seed scored");
            }
            ScoreOutcome::Invalid { reason } => {
                tracing::warn!(%reason, "seed did not score");
                feedback.push(FeedbackEntry::Rejected { reason });
            }
        }
        run.best = best.clone();

        let mut tracker = ConvergenceTracker::new(
            self.config.convergence_threshold,
            self.config.convergence_patience,
        );
        let mut reason = TerminationReason::BudgetExhausted;

        for iteration in 0..self.config.max_iterations {
            if let Some(deadline) = self.config.deadline {
                if started.elapsed() >= deadline {
                    tracing::info!(iteration, "deadline expired, keeping best so far");
                    reason = TerminationReason::DeadlineExpired;
                    break;
                }
            }

            let base = best.clone().unwrap_or_else(|| baseline.clone());

            // Fan out one batch of proposals; duplicates are fine, the
            // Proposer is stochastic and scoring is the cheap side.
            let requests = (0..self.config.parallel_evaluations).map(|_| {
                self.proposer.propose(ProposalContext {
                    current: &base,
                    feedback: &feedback,
                    vocabulary: None,
                })
            });
            let responses = join_all(requests).await;

            let mut batch_cost = 0.0;
            let mut rejections: Vec<String> = Vec::new();
            let mut staged: Vec<ParamCandidate> = Vec::new();

            for response in responses {
                match response {
                    Err(ProposeError::Transport(msg)) => {
                        // Spend from earlier responses in this batch still counts.
                        self.ledger.record(batch_cost);
                        tracing::error!(%msg, "proposer unreachable, aborting run");
                        return Err(EngineError::ProposerUnreachable(msg));
                    }
                    Err(ProposeError::Malformed { reason, cost }) => {
                        batch_cost += cost;
                        rejections.push(reason);
                    }
                    Ok(proposal) => {
                        batch_cost += proposal.cost;
                        match Self::validate_proposal(&schema, proposal.payload) {
                            Ok(params) => staged.push(base.child(params)),
                            Err(reason) => rejections.push(reason),
                        }
                    }
                }
            }

            // Score the batch concurrently. Results come back in slot order,
            // so ranking below is independent of completion order.
            let scored: Vec<(ParamCandidate, ScoreOutcome)> =
                join_all(staged.into_iter().map(|candidate| async move {
                    let outcome = self.score_one(&candidate.payload, dataset).await;
                    (candidate, outcome)
                }))
                .await;

            // Single accumulation point per batch, after the join barrier.
            self.ledger.record(batch_cost);
            run.total_cost = self.ledger.total();

            // Deterministic ranking: highest primary metric, ties broken by
            // the earliest slot (strict comparison keeps the first winner).
            let mut batch_best: Option<ParamCandidate> = None;
            for (candidate, outcome) in scored {
                match outcome {
                    ScoreOutcome::Valid(result) => {
                        let candidate = candidate.scored(result);
                        let primary = candidate.primary().unwrap_or(f64::NEG_INFINITY);
                        feedback.push(FeedbackEntry::Scored {
                            generation: candidate.generation,
                            primary,
                        });
                        let current_best = batch_best
                            .as_ref()
                            .and_then(ParamCandidate::primary)
                            .unwrap_or(f64::NEG_INFINITY);
                        if primary > current_best {
                            batch_best = Some(candidate);
                        }
                    }
                    ScoreOutcome::Invalid { reason } => {
                        tracing::debug!(%reason, "candidate excluded from ranking");
                        rejections.push(reason);
                    }
                }
            }
            for reason in rejections {
                tracing::warn!(iteration, %reason, "proposal rejected");
                feedback.push(FeedbackEntry::Rejected { reason });
            }
            if feedback.len() > FEEDBACK_WINDOW {
                feedback.drain(..feedback.len() - FEEDBACK_WINDOW);
            }

            let improvement = match (&batch_best, &best) {
                (Some(winner), Some(running)) => {
                    let delta = winner.primary().unwrap_or(f64::NEG_INFINITY)
                        - running.primary().unwrap_or(f64::NEG_INFINITY);
                    if delta > 0.0 {
                        best = batch_best;
                        delta
                    } else {
                        0.0
                    }
                }
                (Some(_), None) => {
                    // First viable candidate of the run.
                    best = batch_best;
                    f64::INFINITY
                }
                (None, _) => 0.0,
            };

            run.best = best.clone();
            run.iterations += 1;
            tracing::info!(
                iteration,
                improvement,
                best_primary = ?best.as_ref().and_then(ParamCandidate::primary),
                total_cost = run.total_cost,
                "iteration complete"
            );

            if best.is_some() && tracker.observe(improvement) {
                tracing::info!(iteration, "convergence declared");
                reason = TerminationReason::Converged;
                break;
            }
        }

        if best.is_none() {
            reason = TerminationReason::NoViableResult;
        }
        run.finish(reason);
        tracing::info!(
            run_id = %run.id,
            ?reason,
            iterations = run.iterations,
            total_cost = run.total_cost,
            "parameter optimization finished"
        );
        Ok(run)
    }

    /// Schema-validation boundary for raw Proposer output
    ///
    /// Converts untyped JSON into a `ParameterSet` and checks the descendant
    /// invariants against the initial schema. Anything that fails here is a
    /// recoverable rejection, never a scored candidate.
    fn validate_proposal(
        schema: &ParameterSet,
        payload: serde_json::Value,
    ) -> Result<ParameterSet, String> {
        let params: ParameterSet = serde_json::from_value(payload)
            .map_err(|e| format!("unparseable parameter proposal: {e}"))?;
        schema
            .validate_successor(&params)
            .map_err(|e| e.to_string())?;
        Ok(params)
    }

    /// Score one candidate under the configured timeout
    ///
    /// A timed-out call is indistinguishable from any other invalid outcome.
    async fn score_one(&self, params: &ParameterSet, dataset: &str) -> ScoreOutcome {
        match tokio::time::timeout(
            self.config.scorer_timeout,
            self.scorer.score(params, dataset),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => ScoreOutcome::invalid(format!(
                "scorer timed out after {:?}",
                self.config.scorer_timeout
            )),
        }
    }
}
