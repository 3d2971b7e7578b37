//! Run artifact persistence
//!
//! At run completion the best candidate (parameter set and/or workflow
//! graph), its performance, the total cost and the iteration count are
//! serialized to a human-readable JSON document. The artifact can be loaded
//! back as a future run's seed; loading reproduces the identical starting
//! parameter set and workflow graph.

use crate::error::PersistError;
use crate::search::SearchReport;
use chrono::{DateTime, Utc};
use flowopt_model::{
    OptimizationRun, ParameterSet, PerformanceResult, TerminationReason, WorkflowGraph,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Persisted record of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    /// When the artifact was written
    pub saved_at: DateTime<Utc>,
    /// Best parameter set, if the run produced one
    pub best_params: Option<ParameterSet>,
    /// Best workflow graph, for outer-loop sessions
    pub best_graph: Option<WorkflowGraph>,
    /// Performance of the best candidate
    pub performance: Option<PerformanceResult>,
    /// Total Proposer spend
    pub total_cost: f64,
    /// Iterations completed
    pub iterations: u64,
    /// Why the run stopped
    pub termination: Option<TerminationReason>,
}

impl RunArtifact {
    /// Build an artifact from an inner-loop run
    #[must_use]
    pub fn from_run(run: &OptimizationRun<ParameterSet>) -> Self {
        Self {
            saved_at: Utc::now(),
            best_params: run.best.as_ref().map(|c| c.payload.clone()),
            best_graph: None,
            performance: run.best.as_ref().and_then(|c| c.result.clone()),
            total_cost: run.total_cost,
            iterations: run.iterations,
            termination: run.termination,
        }
    }

    /// Build an artifact from a completed workflow search
    #[must_use]
    pub fn from_search(report: &SearchReport) -> Self {
        let inner_best = report
            .best_run
            .as_ref()
            .and_then(|run| run.best.as_ref());
        Self {
            saved_at: Utc::now(),
            best_params: inner_best.map(|c| c.payload.clone()),
            best_graph: report.best.as_ref().map(|c| c.payload.clone()),
            performance: inner_best.and_then(|c| c.result.clone()),
            total_cost: report.total_cost,
            iterations: report.iterations,
            termination: Some(report.termination),
        }
    }

    /// Write the artifact as pretty-printed JSON
    ///
    /// # Errors
    /// `PersistError::Io` on filesystem failure.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), "run artifact saved");
        Ok(())
    }

    /// Load an artifact written by [`RunArtifact::save`]
    ///
    /// # Errors
    /// - `PersistError::Io` on filesystem failure
    /// - `PersistError::Corrupt` if the file is not a valid artifact
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let json = fs::read_to_string(path)?;
        let artifact = serde_json::from_str(&json)?;
        Ok(artifact)
    }

    /// Seed parameter set for a follow-up run
    #[inline]
    #[must_use]
    pub fn seed_params(&self) -> Option<&ParameterSet> {
        self.best_params.as_ref()
    }

    /// Seed workflow graph for a follow-up search
    #[inline]
    #[must_use]
    pub fn seed_graph(&self) -> Option<&WorkflowGraph> {
        self.best_graph.as_ref()
    }
}
