//! Cost accounting
//!
//! The ledger is the only state touched on behalf of concurrently running
//! calls, and it is written from exactly one point per batch: tasks return
//! their incurred cost, and the engine records the batch sum after the join
//! barrier. The total never decreases within a run.

use parking_lot::Mutex;

/// Append-only spend accumulator
#[derive(Debug, Default)]
pub struct CostLedger {
    total: Mutex<f64>,
}

impl CostLedger {
    /// Create an empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record spend
    ///
    /// Negative and non-finite amounts are ignored so the total stays
    /// monotonically non-decreasing.
    pub fn record(&self, amount: f64) {
        if !amount.is_finite() || amount <= 0.0 {
            if amount != 0.0 {
                tracing::warn!(amount, "ignoring non-positive or non-finite cost");
            }
            return;
        }
        let mut total = self.total.lock();
        *total += amount;
    }

    /// Total spend so far
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        *self.total.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_spend() {
        let ledger = CostLedger::new();
        ledger.record(0.5);
        ledger.record(1.25);
        assert!((ledger.total() - 1.75).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        let ledger = CostLedger::new();
        ledger.record(1.0);
        ledger.record(-0.5);
        ledger.record(f64::NAN);
        ledger.record(f64::INFINITY);
        assert!((ledger.total() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_is_monotone() {
        let ledger = CostLedger::new();
        let mut last = ledger.total();
        for amount in [0.1, 0.0, 2.0, -3.0, 0.7] {
            ledger.record(amount);
            let now = ledger.total();
            assert!(now >= last);
            last = now;
        }
    }
}
