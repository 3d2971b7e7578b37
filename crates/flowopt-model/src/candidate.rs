//! Candidates
//!
//! A candidate pairs a payload (parameter set or workflow graph) with an
//! optional performance result and a generation counter. Candidates are
//! immutable after scoring; an improved version is a new candidate with
//! `generation = parent.generation + 1` and a parent id kept for lineage
//! queries only.

use crate::metrics::PerformanceResult;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique candidate identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub Ulid);

impl CandidateId {
    /// Generate a new candidate ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A proposed solution at one point in a lineage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate<P> {
    /// Candidate identifier
    pub id: CandidateId,
    /// The payload under evaluation
    pub payload: P,
    /// Generation counter, 0 for seeds
    pub generation: u64,
    /// Parent candidate, lineage only -- never ownership
    pub parent: Option<CandidateId>,
    /// Attached by the Scorer; `None` until scored
    pub result: Option<PerformanceResult>,
}

impl<P> Candidate<P> {
    /// Create a generation-0 seed candidate
    #[inline]
    #[must_use]
    pub fn seed(payload: P) -> Self {
        Self {
            id: CandidateId::new(),
            payload,
            generation: 0,
            parent: None,
            result: None,
        }
    }

    /// Create the next-generation child of this candidate
    #[inline]
    #[must_use]
    pub fn child(&self, payload: P) -> Self {
        Self {
            id: CandidateId::new(),
            payload,
            generation: self.generation + 1,
            parent: Some(self.id),
            result: None,
        }
    }

    /// Attach a score, consuming the unscored candidate
    ///
    /// Scoring happens at most once; the scored value is never mutated
    /// afterwards.
    #[inline]
    #[must_use]
    pub fn scored(mut self, result: PerformanceResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Primary metric of the attached result, if scored
    #[inline]
    #[must_use]
    pub fn primary(&self) -> Option<f64> {
        self.result.as_ref().map(PerformanceResult::primary)
    }
}

/// Candidate over a numeric parameter set (inner loop)
pub type ParamCandidate = Candidate<crate::params::ParameterSet>;

/// Candidate over a workflow graph (outer loop)
pub type GraphCandidate = Candidate<crate::graph::WorkflowGraph>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;

    #[test]
    fn seed_starts_at_generation_zero() {
        let seed = ParamCandidate::seed(ParameterSet::new().with("a", 1.0));
        assert_eq!(seed.generation, 0);
        assert!(seed.parent.is_none());
        assert!(seed.result.is_none());
    }

    #[test]
    fn child_increments_generation_and_links_parent() {
        let seed = ParamCandidate::seed(ParameterSet::new().with("a", 1.0));
        let child = seed.child(ParameterSet::new().with("a", 1.1));

        assert_eq!(child.generation, 1);
        assert_eq!(child.parent, Some(seed.id));
        assert_ne!(child.id, seed.id);
    }

    #[test]
    fn scoring_attaches_result() {
        let seed = ParamCandidate::seed(ParameterSet::new().with("a", 1.0));
        let scored = seed.scored(PerformanceResult::of_primary("r", 3.0));
        assert_eq!(scored.primary(), Some(3.0));
    }
}
