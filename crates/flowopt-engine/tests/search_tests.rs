//! Outer-loop scenario tests
//!
//! Runs the full search tree against scripted graph and parameter proposers:
//! structural growth, plateau termination, retry exhaustion and cost
//! accounting, seed validation and artifact persistence.

use flowopt_engine::{
    EngineError, OptimizerConfig, RunArtifact, SearchConfig, WorkflowSearch,
};
use flowopt_model::{TerminationReason, WorkflowGraph, WorkflowNode};
use flowopt_test_utils::{
    seed_params_ab, single_node_graph, ConstantEvalScorer, CyclicGraphProposer,
    GrowGraphProposer, NodeCountScorer, StepProposer, TransportFailProposer,
};
use std::sync::Arc;
use std::time::Duration;

// Opt-in log output for debugging: RUST_LOG=flowopt_engine=debug
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn quick_inner() -> OptimizerConfig {
    OptimizerConfig::new()
        .with_max_iterations(5)
        .with_convergence_patience(2)
        .with_parallel_evaluations(2)
        .with_scorer_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn search_grows_the_workflow_when_structure_pays() {
    init_tracing();
    // Scorer rewards node count directly, so any accepted growth beats the
    // single-node seed.
    let config = SearchConfig::new()
        .with_max_iterations(6)
        .with_rng_seed(42)
        .with_optimizer(quick_inner());
    let mut search = WorkflowSearch::new(
        Arc::new(NodeCountScorer),
        Arc::new(GrowGraphProposer { cost: 0.1 }),
        Arc::new(StepProposer::new("a", 0.1, 0.01)),
        config,
    );

    let report = search
        .run(single_node_graph(), seed_params_ab(), "eval-set")
        .await
        .unwrap();

    let best = report.best.expect("growth must produce a best variant");
    assert!(best.payload.node_count() >= 2, "best stayed a single node");
    assert!(report.best_run.is_some());
    assert!(report.nodes_explored >= 2);
    assert!(report.total_cost > 0.0);
}

#[tokio::test]
async fn flat_scores_plateau_the_search() {
    // Every variant scores identically, so the plateau window closes as soon
    // as it fills: baseline at iteration one, converged two iterations later.
    let config = SearchConfig::new()
        .with_plateau(0.01, 2)
        .with_rng_seed(7)
        .with_optimizer(quick_inner());
    let mut search = WorkflowSearch::new(
        Arc::new(ConstantEvalScorer(1.0)),
        Arc::new(GrowGraphProposer { cost: 0.1 }),
        Arc::new(StepProposer::new("a", 0.1, 0.01)),
        config,
    );

    let report = search
        .run(single_node_graph(), seed_params_ab(), "eval-set")
        .await
        .unwrap();

    assert_eq!(report.termination, TerminationReason::Converged);
    assert_eq!(report.iterations, 3);
}

#[tokio::test]
async fn rejected_expansions_still_count_and_still_cost() {
    // Every proposal carries a cycle and dies at the validation boundary.
    // Each iteration burns the full retry budget (initial attempt plus three
    // retries at 0.5 apiece), records the spend, and moves on.
    let config = SearchConfig::new()
        .with_max_iterations(3)
        .with_expansion_retries(3)
        .with_rng_seed(11)
        .with_optimizer(quick_inner());
    let mut search = WorkflowSearch::new(
        Arc::new(ConstantEvalScorer(1.0)),
        Arc::new(CyclicGraphProposer { cost: 0.5 }),
        Arc::new(StepProposer::new("a", 0.1, 0.0)),
        config,
    );

    let report = search
        .run(single_node_graph(), seed_params_ab(), "eval-set")
        .await
        .unwrap();

    // The tree never grew past the root, but the root keeps its score.
    assert_eq!(report.nodes_explored, 1);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.termination, TerminationReason::BudgetExhausted);
    assert!(report.best.is_some());
    assert!((report.total_cost - 6.0).abs() < 1e-9, "cost = {}", report.total_cost);
}

#[tokio::test]
async fn graph_proposer_transport_failure_is_fatal() {
    let config = SearchConfig::new().with_optimizer(quick_inner());
    let mut search = WorkflowSearch::new(
        Arc::new(ConstantEvalScorer(1.0)),
        Arc::new(TransportFailProposer),
        Arc::new(StepProposer::new("a", 0.1, 0.01)),
        config,
    );

    let err = search
        .run(single_node_graph(), seed_params_ab(), "eval-set")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ProposerUnreachable(_)));
}

#[tokio::test]
async fn cyclic_seed_graph_is_rejected_up_front() {
    let seed = WorkflowGraph::single(WorkflowNode::new("plan", "test-model", "plan"))
        .with_node(WorkflowNode::new("act", "test-model", "act"))
        .with_edge("plan", "act")
        .with_edge("act", "plan");

    let config = SearchConfig::new().with_optimizer(quick_inner());
    let mut search = WorkflowSearch::new(
        Arc::new(ConstantEvalScorer(1.0)),
        Arc::new(GrowGraphProposer { cost: 0.1 }),
        Arc::new(StepProposer::new("a", 0.1, 0.01)),
        config,
    );

    let err = search
        .run(seed, seed_params_ab(), "eval-set")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSeed(_)));
}

#[tokio::test]
async fn search_artifact_round_trip_reproduces_graph() {
    let config = SearchConfig::new()
        .with_max_iterations(4)
        .with_rng_seed(3)
        .with_optimizer(quick_inner());
    let mut search = WorkflowSearch::new(
        Arc::new(NodeCountScorer),
        Arc::new(GrowGraphProposer { cost: 0.1 }),
        Arc::new(StepProposer::new("a", 0.1, 0.01)),
        config,
    );
    let report = search
        .run(single_node_graph(), seed_params_ab(), "eval-set")
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("search.json");
    RunArtifact::from_search(&report).save(&path).unwrap();

    let loaded = RunArtifact::load(&path).unwrap();
    assert_eq!(loaded.seed_graph(), report.best.as_ref().map(|c| &c.payload));
    assert_eq!(loaded.termination, Some(report.termination));
    assert!((loaded.total_cost - report.total_cost).abs() < f64::EPSILON);
}
