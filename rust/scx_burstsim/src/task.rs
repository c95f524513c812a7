//! Task model for the simulator.
//!
//! A [`TaskDef`] describes a task as the workload generator hands it over;
//! a [`SimTask`] is the same task at runtime, carrying its lifecycle
//! timestamps and an explicit [`TaskLocation`] tag.

use serde::{Deserialize, Serialize};

use crate::types::{CoreId, TaskId, Tick, Work};

/// Definition of a task for scenario creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
    pub id: TaskId,
    /// Tick at which the task becomes visible to the dispatcher.
    pub arrival_time: Tick,
    /// True amount of work the task needs.
    pub burst_time: Work,
    /// Initial burst estimate. Falls back to the policy's
    /// `initial_prediction` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_burst: Option<f64>,
}

impl TaskDef {
    pub fn new(id: u32, arrival_time: Tick, burst_time: Work) -> Self {
        TaskDef {
            id: TaskId(id),
            arrival_time,
            burst_time,
            predicted_burst: None,
        }
    }

    /// Override the initial burst estimate.
    pub fn with_prediction(mut self, predicted: f64) -> Self {
        self.predicted_burst = Some(predicted);
        self
    }
}

/// Where a task currently lives. A task is in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskLocation {
    /// Arrival tick not reached yet.
    Unarrived,
    /// Waiting in a core's local queue.
    Local(CoreId),
    /// Waiting in the shared overflow queue.
    Overflow,
    /// Executing on a core.
    Running(CoreId),
    /// Completed.
    Finished,
}

/// A simulated task at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct SimTask {
    pub id: TaskId,
    pub arrival_time: Tick,
    /// Set on the first transition into Running.
    pub start_time: Option<Tick>,
    /// Set when `remaining_time` reaches zero.
    pub finish_time: Option<Tick>,
    pub burst_time: Work,
    pub remaining_time: Work,
    pub predicted_burst: f64,
    pub last_actual_burst: Option<Work>,
    pub waiting_time: Option<Tick>,
    pub turnaround_time: Option<Tick>,
    /// Core that last dispatched this task.
    pub core_id: Option<CoreId>,
    pub location: TaskLocation,
}

impl SimTask {
    pub fn new(def: &TaskDef, initial_prediction: f64) -> Self {
        SimTask {
            id: def.id,
            arrival_time: def.arrival_time,
            start_time: None,
            finish_time: None,
            burst_time: def.burst_time,
            remaining_time: def.burst_time,
            predicted_burst: def.predicted_burst.unwrap_or(initial_prediction),
            last_actual_burst: None,
            waiting_time: None,
            turnaround_time: None,
            core_id: None,
            location: TaskLocation::Unarrived,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    /// Ticks spent since arrival, as seen by the starvation monitor.
    pub fn waited(&self, now: Tick) -> Tick {
        now.saturating_sub(self.arrival_time)
    }

    /// Mark the task complete at the end of tick `now`.
    ///
    /// Records `finish_time = now + 1` and derives waiting and turnaround
    /// times. A task always has a start time by the time it can finish.
    pub(crate) fn complete(&mut self, now: Tick) {
        let finish = now + 1;
        let start = self.start_time.unwrap_or(now);
        self.finish_time = Some(finish);
        self.waiting_time = Some(start - self.arrival_time);
        self.turnaround_time = Some(finish - self.arrival_time);
        self.location = TaskLocation::Finished;
    }
}
