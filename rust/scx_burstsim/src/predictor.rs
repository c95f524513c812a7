//! Exponential-smoothing burst predictor.
//!
//! `next = alpha * actual + (1 - alpha) * previous`. The estimate is
//! refreshed when a task completes; in a workload where every task runs
//! once, the refreshed value is recorded for reporting and never feeds
//! back into routing.

use crate::task::SimTask;
use crate::types::Work;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstPredictor {
    alpha: f64,
}

impl BurstPredictor {
    pub fn new(alpha: f64) -> Self {
        BurstPredictor { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn predict(&self, previous: f64, actual: Work) -> f64 {
        self.alpha * actual as f64 + (1.0 - self.alpha) * previous
    }

    /// Fold a completed task's true burst into its estimate.
    pub fn observe(&self, task: &mut SimTask) -> f64 {
        task.last_actual_burst = Some(task.burst_time);
        task.predicted_burst = self.predict(task.predicted_burst, task.burst_time);
        task.predicted_burst
    }
}
