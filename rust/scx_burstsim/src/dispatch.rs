//! Arrival routing and next-task selection.
//!
//! Routing places long predicted bursts on the fastest core and short ones
//! on the slowest, keeping the fast core's queue for the jobs that gain the
//! most from it. Selection runs shortest-predicted-burst first.

use std::cmp::Reverse;

use metrics::counter;
use ordered_float::OrderedFloat;
use tracing::{debug, trace};

use crate::cpu::SimCore;
use crate::engine::Simulator;
use crate::task::TaskLocation;
use crate::types::{TaskId, Tick};

/// Index of the first core with the highest speed.
pub(crate) fn fastest(cores: &[SimCore]) -> usize {
    cores
        .iter()
        .enumerate()
        .min_by_key(|(_, core)| Reverse(core.speed))
        .map_or(0, |(i, _)| i)
}

/// Index of the first core with the lowest speed.
pub(crate) fn slowest(cores: &[SimCore]) -> usize {
    cores
        .iter()
        .enumerate()
        .min_by_key(|(_, core)| core.speed)
        .map_or(0, |(i, _)| i)
}

/// Index of the first core with the fewest queued tasks, skipping
/// `exclude`.
pub(crate) fn least_loaded(cores: &[SimCore], exclude: Option<usize>) -> Option<usize> {
    cores
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != exclude)
        .min_by_key(|(_, core)| core.nr_queued())
        .map(|(i, _)| i)
}

impl Simulator {
    /// Append (or push to the front of) core `c`'s local queue.
    pub(crate) fn enqueue_local(&mut self, c: usize, id: TaskId, front: bool) {
        let core = &mut self.cores[c];
        if front {
            core.task_queue.push_front(id);
        } else {
            core.task_queue.push_back(id);
        }
        if let Some(task) = self.tasks.get_mut(&id) {
            task.location = TaskLocation::Local(core.id);
        }
    }

    pub(crate) fn enqueue_overflow(&mut self, id: TaskId) {
        self.overflow.push_back(id);
        if let Some(task) = self.tasks.get_mut(&id) {
            task.location = TaskLocation::Overflow;
        }
    }

    /// Route every task arriving at `now`, in registration order.
    pub(crate) fn route_arrivals(&mut self, now: Tick) {
        let Some(arrived) = self.arrivals.remove(&now) else {
            return;
        };

        for id in arrived {
            let predicted = self.tasks[&id].predicted_burst;
            let target = if predicted >= self.config.burst_threshold {
                fastest(&self.cores)
            } else {
                slowest(&self.cores)
            };

            if self.cores[target].nr_queued() < self.config.max_queue_length {
                trace!(task = %id, core = %self.cores[target].id, predicted, "routed");
                self.enqueue_local(target, id, false);
            } else if self.config.enable_global_queue {
                debug!(task = %id, core = %self.cores[target].id, "queue full, routed to overflow");
                self.enqueue_overflow(id);
                self.counters.overflow_routes += 1;
                counter!("burstsim_overflow_routes_total").increment(1);
            } else {
                let fallback = least_loaded(&self.cores, None).unwrap_or(target);
                debug!(
                    task = %id,
                    full = %self.cores[target].id,
                    core = %self.cores[fallback].id,
                    "queue full, routed to least loaded core"
                );
                self.enqueue_local(fallback, id, false);
                self.counters.fallback_routes += 1;
                counter!("burstsim_fallback_routes_total").increment(1);
            }
        }
    }

    /// If core `c` is idle and has queued work, start the queued task with
    /// the shortest predicted burst. Equal predictions keep queue order.
    pub(crate) fn select_next(&mut self, c: usize, now: Tick) -> Option<TaskId> {
        let tasks = &mut self.tasks;
        let core = &mut self.cores[c];
        if core.current_task.is_some() || core.task_queue.is_empty() {
            return None;
        }

        core.task_queue
            .make_contiguous()
            .sort_by_key(|id| OrderedFloat(tasks[id].predicted_burst));
        let id = core.task_queue.pop_front()?;

        let task = tasks.get_mut(&id)?;
        if task.start_time.is_none() {
            task.start_time = Some(now);
        }
        task.core_id = Some(core.id);
        task.location = TaskLocation::Running(core.id);

        core.current_task = Some(id);
        core.time_slice = 0;
        trace!(task = %id, core = %core.id, predicted = task.predicted_burst, "dispatched");
        Some(id)
    }
}
