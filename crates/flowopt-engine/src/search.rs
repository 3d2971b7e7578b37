//! Workflow search tree (outer loop)
//!
//! Searches the space of workflow-graph structures with a tree-search
//! strategy balancing exploitation of known-good structures against
//! exploration of novel ones. Nodes live in an arena indexed by position;
//! parent links are indices, so lineage never creates reference cycles and
//! backpropagation is a plain walk.
//!
//! One iteration is Selection (soft mixed probability over all nodes),
//! Expansion (one bounded Proposer modification, validated and retried),
//! Evaluation (a full inner-loop run under a per-node deadline) and
//! Backpropagation (visit counts and cumulative scores up the parent chain).

use crate::config::SearchConfig;
use crate::convergence::PlateauDetector;
use crate::error::EngineError;
use crate::optimizer::ParameterOptimizer;
use crate::traits::{
    FeedbackEntry, ProposalContext, ProposeError, Proposer, Scorer, WorkflowEval,
};
use async_trait::async_trait;
use flowopt_model::{
    CostLedger, GraphCandidate, OptimizationRun, ParameterSet, ScoreOutcome, TerminationReason,
    WorkflowGraph,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// One workflow variant in the search tree
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// The graph candidate wrapped by this node
    pub candidate: GraphCandidate,
    /// Arena index of the parent, `None` for the root
    pub parent: Option<usize>,
    /// Arena indices of children
    pub children: Vec<usize>,
    /// Backpropagated visit count
    pub visits: u64,
    /// Backpropagated cumulative score
    pub cumulative_score: f64,
    /// This node's own evaluation, `None` if its inner run found nothing
    pub score: Option<f64>,
    /// The inner run that evaluated this node
    pub inner_run: Option<OptimizationRun<ParameterSet>>,
}

impl SearchNode {
    fn new(candidate: GraphCandidate, parent: Option<usize>) -> Self {
        Self {
            candidate,
            parent,
            children: Vec::new(),
            visits: 0,
            cumulative_score: 0.0,
            score: None,
            inner_run: None,
        }
    }

    /// Average backpropagated score; zero before the first visit
    #[inline]
    #[must_use]
    pub fn average_score(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.cumulative_score / self.visits as f64
        }
    }
}

/// Result of a completed search
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Highest-scoring workflow variant, `None` if nothing ever scored
    pub best: Option<GraphCandidate>,
    /// The inner run behind the best variant
    pub best_run: Option<OptimizationRun<ParameterSet>>,
    /// Outer iterations completed
    pub iterations: u64,
    /// Nodes in the tree at termination
    pub nodes_explored: usize,
    /// Total Proposer spend across the session (outer and inner)
    pub total_cost: f64,
    /// Why the search stopped
    pub termination: TerminationReason,
}

/// Adapter fixing a workflow graph as the structural context for
/// parameter-level scoring during one node evaluation
struct BoundScorer<S> {
    scorer: Arc<S>,
    graph: WorkflowGraph,
}

#[async_trait]
impl<S> Scorer<ParameterSet> for BoundScorer<S>
where
    S: Scorer<WorkflowEval>,
{
    async fn score(&self, candidate: &ParameterSet, dataset: &str) -> ScoreOutcome {
        let eval = WorkflowEval {
            graph: self.graph.clone(),
            params: candidate.clone(),
        };
        self.scorer.score(&eval, dataset).await
    }
}

/// The outer search loop
///
/// Generic over the workflow-level Scorer `S`, the graph Proposer `GP` and
/// the parameter Proposer `PP`; in production the two proposers are usually
/// the same LLM collaborator behind two prompts.
pub struct WorkflowSearch<S, GP, PP> {
    scorer: Arc<S>,
    graph_proposer: Arc<GP>,
    param_proposer: Arc<PP>,
    config: SearchConfig,
    ledger: Arc<CostLedger>,
    arena: Vec<SearchNode>,
    rng: StdRng,
}

impl<S, GP, PP> WorkflowSearch<S, GP, PP>
where
    S: Scorer<WorkflowEval> + 'static,
    GP: Proposer<WorkflowGraph>,
    PP: Proposer<ParameterSet>,
{
    /// Create a search session
    #[must_use]
    pub fn new(
        scorer: Arc<S>,
        graph_proposer: Arc<GP>,
        param_proposer: Arc<PP>,
        config: SearchConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            scorer,
            graph_proposer,
            param_proposer,
            config,
            ledger: Arc::new(CostLedger::new()),
            arena: Vec::new(),
            rng,
        }
    }

    /// The session-wide cost ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    /// Nodes explored so far
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[SearchNode] {
        &self.arena
    }

    /// Run the search to termination
    ///
    /// `seed_graph` becomes the root node and is evaluated once before the
    /// loop so the tree starts with a baseline score. `seed_params` seeds
    /// every node's inner optimization run.
    ///
    /// # Errors
    /// - `EngineError::InvalidSeed` if the seed graph violates an invariant
    /// - `EngineError::ProposerUnreachable` on Proposer transport failure
    pub async fn run(
        &mut self,
        seed_graph: WorkflowGraph,
        seed_params: ParameterSet,
        dataset: &str,
    ) -> Result<SearchReport, EngineError> {
        seed_graph.validate(self.config.complexity_ceiling)?;
        tracing::info!(
            nodes = seed_graph.node_count(),
            edges = seed_graph.edge_count(),
            "starting workflow search"
        );

        self.arena.clear();
        self.arena
            .push(SearchNode::new(GraphCandidate::seed(seed_graph), None));

        // Baseline: evaluate the root before the loop.
        let root_score = self.evaluate(0, &seed_params, dataset).await?;
        self.backpropagate(0, root_score.unwrap_or(0.0));

        let mut plateau = PlateauDetector::new(
            self.config.plateau_epsilon,
            self.config.plateau_window,
        );
        let mut iterations = 0u64;
        let mut termination = TerminationReason::BudgetExhausted;

        for iteration in 0..self.config.max_iterations {
            let selected = self.select();
            tracing::debug!(iteration, selected, "node selected for expansion");

            let child = match self.expand(selected).await? {
                Some(idx) => idx,
                None => {
                    // Retries exhausted; the iteration still counts.
                    iterations += 1;
                    if self.observe_plateau(&mut plateau) {
                        termination = TerminationReason::Converged;
                        break;
                    }
                    continue;
                }
            };

            let score = self.evaluate(child, &seed_params, dataset).await?;
            self.backpropagate(child, score.unwrap_or(0.0));

            iterations += 1;
            tracing::info!(
                iteration,
                child,
                score = ?score,
                nodes = self.arena.len(),
                total_cost = self.ledger.total(),
                "outer iteration complete"
            );

            if self.observe_plateau(&mut plateau) {
                tracing::info!(iteration, "score plateau reached");
                termination = TerminationReason::Converged;
                break;
            }
        }

        let best_idx = self.best_node();
        if best_idx.is_none() {
            termination = TerminationReason::NoViableResult;
        }
        let report = SearchReport {
            best: best_idx.map(|idx| self.arena[idx].candidate.clone()),
            best_run: best_idx.and_then(|idx| self.arena[idx].inner_run.clone()),
            iterations,
            nodes_explored: self.arena.len(),
            total_cost: self.ledger.total(),
            termination,
        };
        tracing::info!(
            ?termination,
            iterations,
            nodes = report.nodes_explored,
            total_cost = report.total_cost,
            "workflow search finished"
        );
        Ok(report)
    }

    /// Selection weights over every node in the arena
    ///
    /// Each weight blends a uniform term with a term proportional to the
    /// node's average backpropagated score. The uniform share keeps every
    /// weight strictly positive regardless of score history.
    #[must_use]
    pub fn selection_weights(&self) -> Vec<f64> {
        let n = self.arena.len();
        if n == 0 {
            return Vec::new();
        }
        let mix = self.config.exploration_mix;
        let uniform = 1.0 / n as f64;

        let averages: Vec<f64> = self.arena.iter().map(SearchNode::average_score).collect();
        let min = averages.iter().copied().fold(f64::INFINITY, f64::min);
        let shifted: Vec<f64> = averages.iter().map(|a| a - min).collect();
        let mass: f64 = shifted.iter().sum();

        (0..n)
            .map(|i| {
                let score_term = if mass > 0.0 {
                    shifted[i] / mass
                } else {
                    uniform
                };
                mix * uniform + (1.0 - mix) * score_term
            })
            .collect()
    }

    /// Sample one node index according to the soft mixed probability
    fn select(&mut self) -> usize {
        let weights = self.selection_weights();
        let total: f64 = weights.iter().sum();
        let mut draw = self.rng.gen::<f64>() * total;
        for (idx, weight) in weights.iter().enumerate() {
            draw -= weight;
            if draw <= 0.0 {
                return idx;
            }
        }
        weights.len() - 1
    }

    /// Ask the Proposer for one bounded modification of the selected graph
    ///
    /// Proposals that fail structural validation are rejected and retried up
    /// to the configured retry budget; exhausting it skips the iteration.
    /// Spend is recorded once, after the retry loop.
    async fn expand(&mut self, selected: usize) -> Result<Option<usize>, EngineError> {
        let parent_candidate = self.arena[selected].candidate.clone();
        let mut feedback: Vec<FeedbackEntry> = Vec::new();
        let mut attempt_cost = 0.0;
        let mut accepted: Option<WorkflowGraph> = None;

        for attempt in 0..=self.config.expansion_retries {
            let response = self
                .graph_proposer
                .propose(ProposalContext {
                    current: &parent_candidate,
                    feedback: &feedback,
                    vocabulary: Some(&self.config.vocabulary),
                })
                .await;

            match response {
                Err(ProposeError::Transport(msg)) => {
                    self.ledger.record(attempt_cost);
                    return Err(EngineError::ProposerUnreachable(msg));
                }
                Err(ProposeError::Malformed { reason, cost }) => {
                    attempt_cost += cost;
                    tracing::warn!(attempt, %reason, "graph proposal malformed");
                    feedback.push(FeedbackEntry::Rejected { reason });
                }
                Ok(proposal) => {
                    attempt_cost += proposal.cost;
                    match self.validate_graph_proposal(proposal.payload) {
                        Ok(graph) => {
                            accepted = Some(graph);
                            break;
                        }
                        Err(reason) => {
                            tracing::warn!(attempt, %reason, "graph proposal rejected");
                            feedback.push(FeedbackEntry::Rejected { reason });
                        }
                    }
                }
            }
        }

        self.ledger.record(attempt_cost);

        let Some(graph) = accepted else {
            tracing::warn!(selected, "expansion retries exhausted, skipping iteration");
            return Ok(None);
        };

        let child_candidate = parent_candidate.child(graph);
        let child_idx = self.arena.len();
        self.arena.push(SearchNode::new(child_candidate, Some(selected)));
        self.arena[selected].children.push(child_idx);
        Ok(Some(child_idx))
    }

    /// Validation boundary for raw graph proposals
    fn validate_graph_proposal(&self, payload: serde_json::Value) -> Result<WorkflowGraph, String> {
        let graph: WorkflowGraph = serde_json::from_value(payload)
            .map_err(|e| format!("unparseable graph proposal: {e}"))?;
        graph
            .validate(self.config.complexity_ceiling)
            .map_err(|e| e.to_string())?;
        Ok(graph)
    }

    /// Evaluate one node: a full inner-loop run with this node's graph fixed
    ///
    /// The inner run shares the session ledger and respects the per-node
    /// deadline; a deadline-expired run contributes its best-so-far score. An
    /// unviable run contributes no score.
    async fn evaluate(
        &mut self,
        idx: usize,
        seed_params: &ParameterSet,
        dataset: &str,
    ) -> Result<Option<f64>, EngineError> {
        let graph = self.arena[idx].candidate.payload.clone();
        let mut inner_config = self.config.optimizer.clone();
        if let Some(node_deadline) = self.config.node_deadline {
            inner_config.deadline = Some(match inner_config.deadline {
                Some(d) => d.min(node_deadline),
                None => node_deadline,
            });
        }

        let bound = Arc::new(BoundScorer {
            scorer: Arc::clone(&self.scorer),
            graph,
        });
        let optimizer = ParameterOptimizer::with_ledger(
            bound,
            Arc::clone(&self.param_proposer),
            inner_config,
            Arc::clone(&self.ledger),
        );

        let run = optimizer.optimize(seed_params.clone(), dataset).await?;
        let score = run.best.as_ref().and_then(|c| c.primary());
        if score.is_none() {
            tracing::warn!(idx, "node evaluation produced no viable result");
        }

        let node = &mut self.arena[idx];
        node.score = score;
        node.inner_run = Some(run);
        Ok(score)
    }

    /// Walk the parent chain to the root, updating visit counts and
    /// cumulative scores
    fn backpropagate(&mut self, leaf: usize, score: f64) {
        let mut cursor = Some(leaf);
        while let Some(idx) = cursor {
            let node = &mut self.arena[idx];
            node.visits += 1;
            node.cumulative_score += score;
            cursor = node.parent;
        }
    }

    /// Highest-scoring evaluated node, if any
    fn best_node(&self) -> Option<usize> {
        self.arena
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| node.score.map(|s| (idx, s)))
            .max_by(|(ia, a), (ib, b)| {
                // Earlier node wins ties, so ordering is deterministic.
                a.partial_cmp(b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(ib.cmp(ia))
            })
            .map(|(idx, _)| idx)
    }

    fn observe_plateau(&self, plateau: &mut PlateauDetector) -> bool {
        let best = self
            .best_node()
            .and_then(|idx| self.arena[idx].score)
            .unwrap_or(f64::NEG_INFINITY);
        plateau.observe(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowopt_model::WorkflowNode;

    // Backpropagation and selection-weight math are exercised directly on a
    // hand-built arena; the full loop is covered by integration tests.

    fn leaf_graph(name: &str) -> GraphCandidate {
        GraphCandidate::seed(WorkflowGraph::single(WorkflowNode::new(name, "m", "i")))
    }

    struct NullScorer;
    #[async_trait]
    impl Scorer<WorkflowEval> for NullScorer {
        async fn score(&self, _candidate: &WorkflowEval, _dataset: &str) -> ScoreOutcome {
            ScoreOutcome::invalid("unused")
        }
    }

    struct NullProposer;
    #[async_trait]
    impl<P: Send + Sync> Proposer<P> for NullProposer {
        async fn propose(
            &self,
            _ctx: ProposalContext<'_, P>,
        ) -> Result<crate::traits::Proposal, ProposeError> {
            Err(ProposeError::Malformed {
                reason: "unused".to_string(),
                cost: 0.0,
            })
        }
    }

    fn harness(config: SearchConfig) -> WorkflowSearch<NullScorer, NullProposer, NullProposer> {
        WorkflowSearch::new(
            Arc::new(NullScorer),
            Arc::new(NullProposer),
            Arc::new(NullProposer),
            config,
        )
    }

    #[test]
    fn backpropagation_updates_whole_chain() {
        let mut search = harness(SearchConfig::new());
        search.arena.push(SearchNode::new(leaf_graph("root"), None));
        search.arena.push(SearchNode::new(leaf_graph("mid"), Some(0)));
        search.arena[0].children.push(1);
        search.arena.push(SearchNode::new(leaf_graph("leaf"), Some(1)));
        search.arena[1].children.push(2);

        search.backpropagate(2, 4.0);

        for idx in 0..3 {
            assert_eq!(search.arena[idx].visits, 1);
            assert!((search.arena[idx].cumulative_score - 4.0).abs() < f64::EPSILON);
        }

        // A second evaluation of the mid node leaves the leaf untouched.
        search.backpropagate(1, 2.0);
        assert_eq!(search.arena[0].visits, 2);
        assert_eq!(search.arena[1].visits, 2);
        assert_eq!(search.arena[2].visits, 1);
        assert!((search.arena[0].cumulative_score - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn selection_weights_strictly_positive() {
        let mut search = harness(SearchConfig::new().with_exploration_mix(0.2));
        search.arena.push(SearchNode::new(leaf_graph("a"), None));
        search.arena.push(SearchNode::new(leaf_graph("b"), Some(0)));
        search.arena.push(SearchNode::new(leaf_graph("c"), Some(0)));

        // Wildly uneven score histories, including a much worse node.
        search.backpropagate(1, 100.0);
        search.backpropagate(2, -500.0);

        let weights = search.selection_weights();
        assert_eq!(weights.len(), 3);
        for weight in &weights {
            assert!(*weight > 0.0, "weight must stay positive: {weight}");
        }
        // The high scorer carries more weight than the low scorer.
        assert!(weights[1] > weights[2]);
    }

    #[test]
    fn selection_weights_uniform_without_history() {
        let mut search = harness(SearchConfig::new());
        search.arena.push(SearchNode::new(leaf_graph("a"), None));
        search.arena.push(SearchNode::new(leaf_graph("b"), Some(0)));

        let weights = search.selection_weights();
        assert!((weights[0] - weights[1]).abs() < 1e-12);
    }

    #[test]
    fn best_node_prefers_earlier_on_ties() {
        let mut search = harness(SearchConfig::new());
        search.arena.push(SearchNode::new(leaf_graph("a"), None));
        search.arena.push(SearchNode::new(leaf_graph("b"), Some(0)));
        search.arena[0].score = Some(1.0);
        search.arena[1].score = Some(1.0);

        assert_eq!(search.best_node(), Some(0));
    }

    #[test]
    fn seeded_selection_is_deterministic() {
        let build = || {
            let mut search = harness(SearchConfig::new().with_rng_seed(7));
            search.arena.push(SearchNode::new(leaf_graph("a"), None));
            search.arena.push(SearchNode::new(leaf_graph("b"), Some(0)));
            search.backpropagate(1, 3.0);
            (0..16).map(|_| search.select()).collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }
}
