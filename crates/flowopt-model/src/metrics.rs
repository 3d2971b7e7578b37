//! Performance metrics
//!
//! Metric maps produced by the Scorer, and the valid/invalid outcome wrapper
//! the engine ranks on.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Metrics for one scored candidate
///
/// Produced exclusively by a Scorer. The primary metric drives ranking and
/// convergence; secondary metrics (drawdown, trade count, ...) are carried
/// for reporting only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceResult {
    /// Name of the metric used for ranking
    primary_metric: String,
    /// All metrics by name
    metrics: IndexMap<String, f64>,
}

impl PerformanceResult {
    /// Create a result with a single primary metric
    #[must_use]
    pub fn of_primary(name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        let mut metrics = IndexMap::new();
        metrics.insert(name.clone(), value);
        Self {
            primary_metric: name,
            metrics,
        }
    }

    /// Builder-style secondary metric
    #[inline]
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Value of the primary metric
    ///
    /// A result always contains its primary metric; `of_primary` is the only
    /// constructor.
    #[inline]
    #[must_use]
    pub fn primary(&self) -> f64 {
        self.metrics
            .get(&self.primary_metric)
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }

    /// Name of the primary metric
    #[inline]
    #[must_use]
    pub fn primary_metric(&self) -> &str {
        &self.primary_metric
    }

    /// Look up any metric by name
    #[inline]
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Iterate over all metrics
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Outcome of scoring one candidate
///
/// `Invalid` is the sentinel for malformed candidates, scorer failures and
/// scorer timeouts. It never aborts a batch and is excluded from ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScoreOutcome {
    /// Candidate was scored successfully
    Valid(PerformanceResult),
    /// Candidate could not be scored
    Invalid {
        /// Human-readable rejection reason
        reason: String,
    },
}

impl ScoreOutcome {
    /// Shortcut for building an invalid outcome
    #[inline]
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        ScoreOutcome::Invalid {
            reason: reason.into(),
        }
    }

    /// The performance result, if valid
    #[inline]
    #[must_use]
    pub fn as_valid(&self) -> Option<&PerformanceResult> {
        match self {
            ScoreOutcome::Valid(result) => Some(result),
            ScoreOutcome::Invalid { .. } => None,
        }
    }

    /// Whether this outcome can participate in ranking
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, ScoreOutcome::Valid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_metric_lookup() {
        let result = PerformanceResult::of_primary("total_return", 0.42)
            .with_metric("max_drawdown", -0.1);

        assert_eq!(result.primary(), 0.42);
        assert_eq!(result.primary_metric(), "total_return");
        assert_eq!(result.metric("max_drawdown"), Some(-0.1));
        assert_eq!(result.metric("missing"), None);
    }

    #[test]
    fn outcome_validity() {
        let valid = ScoreOutcome::Valid(PerformanceResult::of_primary("r", 1.0));
        assert!(valid.is_valid());
        assert_eq!(valid.as_valid().unwrap().primary(), 1.0);

        let invalid = ScoreOutcome::invalid("nan in parameters");
        assert!(!invalid.is_valid());
        assert!(invalid.as_valid().is_none());
    }
}
