//! Starvation rescue and work stealing.
//!
//! Rescue moves never-started tasks that waited too long off their core:
//! to the overflow queue when it is enabled, otherwise to the least loaded
//! peer, with short tasks jumping to the front of the peer's queue.
//!
//! Stealing hands an idle core with an empty queue one task per tick,
//! taken from the head of the first non-empty peer queue or, failing
//! that, from the overflow queue.

use metrics::counter;
use tracing::debug;

use crate::dispatch::least_loaded;
use crate::engine::Simulator;
use crate::types::Tick;

impl Simulator {
    /// Relocate starving tasks queued on core `c`.
    pub(crate) fn rescue_starving(&mut self, c: usize, now: Tick) {
        let global = self.config.enable_global_queue;
        // Nowhere else to go: starving tasks stay where they are.
        if !global && self.cores.len() < 2 {
            return;
        }

        let threshold = self.config.starvation_threshold;
        let tasks = &self.tasks;
        let core = &mut self.cores[c];
        let mut starving = Vec::new();
        core.task_queue.retain(|id| {
            let task = &tasks[id];
            let starved = task.start_time.is_none() && task.waited(now) > threshold;
            if starved {
                starving.push(*id);
            }
            !starved
        });
        let from = core.id;

        for id in starving {
            let waited = self.tasks[&id].waited(now);
            self.counters.rescues += 1;
            counter!("burstsim_rescues_total").increment(1);

            if global {
                debug!(task = %id, from = %from, waited, "rescued to overflow queue");
                self.enqueue_overflow(id);
                continue;
            }

            match least_loaded(&self.cores, Some(c)) {
                Some(dest) => {
                    let short = self.tasks[&id].burst_time <= self.config.short_task_threshold;
                    debug!(
                        task = %id,
                        from = %from,
                        to = %self.cores[dest].id,
                        waited,
                        front = short,
                        "rescued starving task"
                    );
                    self.enqueue_local(dest, id, short);
                }
                None => self.enqueue_local(c, id, false),
            }
        }
    }

    /// Give core `c` one task if it is idle with an empty queue.
    pub(crate) fn steal(&mut self, c: usize, now: Tick) {
        if !self.cores[c].is_starved() {
            return;
        }

        let victim = (0..self.cores.len())
            .find(|&o| o != c && !self.cores[o].task_queue.is_empty());

        let stolen = match victim {
            Some(v) => {
                let id = self.cores[v].task_queue.pop_front();
                if let Some(id) = id {
                    self.counters.steals += 1;
                    counter!("burstsim_steals_total").increment(1);
                    debug!(task = %id, from = %self.cores[v].id, to = %self.cores[c].id, "stole task");
                }
                id
            }
            None if self.config.enable_global_queue => {
                let id = self.overflow.pop_front();
                if let Some(id) = id {
                    self.counters.overflow_pulls += 1;
                    counter!("burstsim_overflow_pulls_total").increment(1);
                    debug!(task = %id, to = %self.cores[c].id, "pulled from overflow queue");
                }
                id
            }
            None => None,
        };

        if let Some(id) = stolen {
            self.enqueue_local(c, id, false);
            self.select_next(c, now);
        }
    }
}
