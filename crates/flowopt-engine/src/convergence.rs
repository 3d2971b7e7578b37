//! Convergence and plateau detection
//!
//! Both loops terminate on sustained lack of improvement, at different
//! granularity. The inner loop uses [`ConvergenceTracker`]: improvement below
//! a threshold for a configured number of consecutive iterations. The outer
//! loop uses [`PlateauDetector`]: the best score failing to move by more than
//! an epsilon over a window of iterations.

/// Consecutive-stall convergence rule (inner loop)
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    threshold: f64,
    patience: u32,
    stalled: u32,
}

impl ConvergenceTracker {
    /// Create a tracker
    ///
    /// `patience` is the number of consecutive below-threshold iterations
    /// required before convergence is declared; a single flat iteration is
    /// never enough.
    #[must_use]
    pub fn new(threshold: f64, patience: u32) -> Self {
        Self {
            threshold,
            patience: patience.max(1),
            stalled: 0,
        }
    }

    /// Observe one iteration's improvement over the running best
    ///
    /// Returns `true` once convergence is declared. An improving iteration
    /// resets the stall counter.
    pub fn observe(&mut self, improvement: f64) -> bool {
        if improvement >= self.threshold {
            self.stalled = 0;
            return false;
        }
        self.stalled += 1;
        self.stalled >= self.patience
    }

    /// Consecutive stalled iterations so far
    #[inline]
    #[must_use]
    pub fn stalled(&self) -> u32 {
        self.stalled
    }
}

/// Windowed plateau rule (outer loop)
#[derive(Debug, Clone)]
pub struct PlateauDetector {
    epsilon: f64,
    window: u32,
    best: Option<f64>,
    since_improvement: u32,
}

impl PlateauDetector {
    /// Create a detector over a window of iterations
    #[must_use]
    pub fn new(epsilon: f64, window: u32) -> Self {
        Self {
            epsilon,
            window: window.max(1),
            best: None,
            since_improvement: 0,
        }
    }

    /// Observe the best score after one iteration
    ///
    /// Returns `true` when the best score has not improved by more than
    /// epsilon for a full window.
    pub fn observe(&mut self, best_score: f64) -> bool {
        match self.best {
            Some(best) if best_score <= best + self.epsilon => {
                self.since_improvement += 1;
            }
            _ => {
                self.best = Some(self.best.map_or(best_score, |b| b.max(best_score)));
                self.since_improvement = 0;
            }
        }
        self.since_improvement >= self.window
    }

    /// Best score seen so far
    #[inline]
    #[must_use]
    pub fn best(&self) -> Option<f64> {
        self.best
    }
}
