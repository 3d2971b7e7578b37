//! Testing utilities for the flowopt workspace
//!
//! Stub Scorers and Proposers with scripted behavior, plus common fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use flowopt_engine::{Proposal, ProposalContext, ProposeError, Proposer, Scorer, WorkflowEval};
use flowopt_model::{
    ParamValue, ParameterSet, PerformanceResult, ScoreOutcome, WorkflowGraph, WorkflowNode,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// The `{a: 1.0, b: 2.0}` seed used across engine tests
pub fn seed_params_ab() -> ParameterSet {
    ParameterSet::new().with("a", 1.0).with("b", 2.0)
}

/// A minimal single-node workflow
pub fn single_node_graph() -> WorkflowGraph {
    WorkflowGraph::single(WorkflowNode::new("decide", "test-model", "pick parameters"))
}

/// Scores `primary = sum of numeric parameters`
pub struct SumScorer;

#[async_trait]
impl Scorer<ParameterSet> for SumScorer {
    async fn score(&self, candidate: &ParameterSet, _dataset: &str) -> ScoreOutcome {
        let sum: f64 = candidate.iter().filter_map(|(_, v)| v.as_number()).sum();
        ScoreOutcome::Valid(PerformanceResult::of_primary("primary", sum))
    }
}

/// Scores every candidate with the same fixed primary metric
pub struct ConstantScorer(pub f64);

#[async_trait]
impl Scorer<ParameterSet> for ConstantScorer {
    async fn score(&self, _candidate: &ParameterSet, _dataset: &str) -> ScoreOutcome {
        ScoreOutcome::Valid(PerformanceResult::of_primary("primary", self.0))
    }
}

/// Rejects every candidate
pub struct AlwaysInvalidScorer;

#[async_trait]
impl Scorer<ParameterSet> for AlwaysInvalidScorer {
    async fn score(&self, _candidate: &ParameterSet, _dataset: &str) -> ScoreOutcome {
        ScoreOutcome::invalid("scorer rejects everything")
    }
}

/// Sleeps for the candidate's `delay_ms` parameter, then scores
/// `primary = a`. Used to prove ranking is independent of arrival order.
pub struct DelayScorer;

#[async_trait]
impl Scorer<ParameterSet> for DelayScorer {
    async fn score(&self, candidate: &ParameterSet, _dataset: &str) -> ScoreOutcome {
        let delay = candidate.number("delay_ms").unwrap_or(0.0).max(0.0);
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        let primary = candidate.number("a").unwrap_or(0.0);
        ScoreOutcome::Valid(PerformanceResult::of_primary("primary", primary))
    }
}

/// Sleeps past any reasonable scorer timeout
pub struct HangingScorer;

#[async_trait]
impl Scorer<ParameterSet> for HangingScorer {
    async fn score(&self, _candidate: &ParameterSet, _dataset: &str) -> ScoreOutcome {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        ScoreOutcome::invalid("unreachable")
    }
}

/// Workflow-level scorer that walks the graph in topological execution
/// order and scores `primary = number of steps executed`, so structural
/// growth is rewarded deterministically
pub struct NodeCountScorer;

#[async_trait]
impl Scorer<WorkflowEval> for NodeCountScorer {
    async fn score(&self, candidate: &WorkflowEval, _dataset: &str) -> ScoreOutcome {
        match candidate.graph.execution_order() {
            Ok(order) => {
                ScoreOutcome::Valid(PerformanceResult::of_primary("primary", order.len() as f64))
            }
            Err(e) => ScoreOutcome::invalid(e.to_string()),
        }
    }
}

/// Workflow-level scorer with a fixed primary metric for every graph
pub struct ConstantEvalScorer(pub f64);

#[async_trait]
impl Scorer<WorkflowEval> for ConstantEvalScorer {
    async fn score(&self, _candidate: &WorkflowEval, _dataset: &str) -> ScoreOutcome {
        ScoreOutcome::Valid(PerformanceResult::of_primary("primary", self.0))
    }
}

/// Proposes `current` with one numeric key incremented by a fixed step
pub struct StepProposer {
    pub key: String,
    pub step: f64,
    pub cost: f64,
}

impl StepProposer {
    pub fn new(key: impl Into<String>, step: f64, cost: f64) -> Self {
        Self {
            key: key.into(),
            step,
            cost,
        }
    }
}

#[async_trait]
impl Proposer<ParameterSet> for StepProposer {
    async fn propose(
        &self,
        ctx: ProposalContext<'_, ParameterSet>,
    ) -> Result<Proposal, ProposeError> {
        let mut next: Vec<(String, ParamValue)> = Vec::new();
        for (name, value) in ctx.current.payload.iter() {
            let value = match value.as_number() {
                Some(n) if name == self.key => ParamValue::Number(n + self.step),
                _ => *value,
            };
            next.push((name.to_string(), value));
        }
        let params: ParameterSet = next.into_iter().collect();
        let payload = serde_json::to_value(&params)
            .map_err(|e| ProposeError::Malformed {
                reason: e.to_string(),
                cost: self.cost,
            })?;
        Ok(Proposal::new(payload, self.cost))
    }
}

/// Replays a scripted queue of responses; repeats the last script entry once
/// the queue is drained
pub struct ScriptedProposer {
    script: Mutex<VecDeque<Result<Proposal, ProposeError>>>,
    fallback: Result<Proposal, ProposeError>,
    pub calls: Mutex<u64>,
}

impl ScriptedProposer {
    pub fn new(script: Vec<Result<Proposal, ProposeError>>) -> Self {
        let fallback = script
            .last()
            .cloned()
            .unwrap_or_else(|| Err(ProposeError::Transport("empty script".to_string())));
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> u64 {
        *self.calls.lock()
    }
}

#[async_trait]
impl<P: Send + Sync> Proposer<P> for ScriptedProposer {
    async fn propose(&self, _ctx: ProposalContext<'_, P>) -> Result<Proposal, ProposeError> {
        *self.calls.lock() += 1;
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Always fails at the transport level
pub struct TransportFailProposer;

#[async_trait]
impl<P: Send + Sync> Proposer<P> for TransportFailProposer {
    async fn propose(&self, _ctx: ProposalContext<'_, P>) -> Result<Proposal, ProposeError> {
        Err(ProposeError::Transport("connection refused".to_string()))
    }
}

/// Proposes the current parameter set with one key silently dropped --
/// exercises the schema-validation boundary
pub struct KeyDropProposer {
    pub drop_key: String,
    pub cost: f64,
}

#[async_trait]
impl Proposer<ParameterSet> for KeyDropProposer {
    async fn propose(
        &self,
        ctx: ProposalContext<'_, ParameterSet>,
    ) -> Result<Proposal, ProposeError> {
        let next: ParameterSet = ctx
            .current
            .payload
            .iter()
            .filter(|(name, _)| *name != self.drop_key)
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        let payload = serde_json::to_value(&next).map_err(|e| ProposeError::Malformed {
            reason: e.to_string(),
            cost: self.cost,
        })?;
        Ok(Proposal::new(payload, self.cost))
    }
}

/// Proposes the current parameter set plus one fresh key per call --
/// exercises the no-growth half of the schema boundary
pub struct KeyAddProposer {
    pub cost: f64,
    counter: Mutex<u64>,
}

impl KeyAddProposer {
    pub fn new(cost: f64) -> Self {
        Self {
            cost,
            counter: Mutex::new(0),
        }
    }
}

#[async_trait]
impl Proposer<ParameterSet> for KeyAddProposer {
    async fn propose(
        &self,
        ctx: ProposalContext<'_, ParameterSet>,
    ) -> Result<Proposal, ProposeError> {
        let n = {
            let mut counter = self.counter.lock();
            *counter += 1;
            *counter
        };
        let next = ctx.current.payload.clone().with(format!("extra_{n}"), n as f64);
        let payload = serde_json::to_value(&next).map_err(|e| ProposeError::Malformed {
            reason: e.to_string(),
            cost: self.cost,
        })?;
        Ok(Proposal::new(payload, self.cost))
    }
}

/// Graph proposer that appends one node fed from the entry node
pub struct GrowGraphProposer {
    pub cost: f64,
}

#[async_trait]
impl Proposer<WorkflowGraph> for GrowGraphProposer {
    async fn propose(
        &self,
        ctx: ProposalContext<'_, WorkflowGraph>,
    ) -> Result<Proposal, ProposeError> {
        let current = &ctx.current.payload;
        let name = format!("step-{}", current.node_count());
        let grown = current
            .clone()
            .with_node(WorkflowNode::new(&name, "test-model", "refine"))
            .with_edge(current.entry.clone(), name);
        let payload = serde_json::to_value(&grown).map_err(|e| ProposeError::Malformed {
            reason: e.to_string(),
            cost: self.cost,
        })?;
        Ok(Proposal::new(payload, self.cost))
    }
}

/// Graph proposer whose output always contains a cycle -- every proposal is
/// rejected at the validation boundary
pub struct CyclicGraphProposer {
    pub cost: f64,
}

#[async_trait]
impl Proposer<WorkflowGraph> for CyclicGraphProposer {
    async fn propose(
        &self,
        ctx: ProposalContext<'_, WorkflowGraph>,
    ) -> Result<Proposal, ProposeError> {
        let current = &ctx.current.payload;
        let name = format!("loop-{}", current.node_count());
        let broken = current
            .clone()
            .with_node(WorkflowNode::new(&name, "test-model", "loop"))
            .with_edge(current.entry.clone(), name.clone())
            .with_edge(name, current.entry.clone());
        let payload = serde_json::to_value(&broken).map_err(|e| ProposeError::Malformed {
            reason: e.to_string(),
            cost: self.cost,
        })?;
        Ok(Proposal::new(payload, self.cost))
    }
}
