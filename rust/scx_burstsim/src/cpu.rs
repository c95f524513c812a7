//! Simulated core state.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CoreId, TaskId, Tick, Work};

/// Definition of a core for scenario creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreDef {
    pub id: CoreId,
    /// Work units retired per tick while running a task.
    pub speed: Work,
}

impl CoreDef {
    pub fn new(id: u32, speed: Work) -> Self {
        CoreDef {
            id: CoreId(id),
            speed,
        }
    }
}

/// One entry of a core's per-tick timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Idle,
    Task(TaskId),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Idle => f.pad("Idle"),
            Slot::Task(id) => f.pad(&id.0.to_string()),
        }
    }
}

/// A simulated core.
#[derive(Debug, Clone, PartialEq)]
pub struct SimCore {
    pub id: CoreId,
    pub speed: Work,
    /// Task currently executing, or None if idle.
    pub current_task: Option<TaskId>,
    /// Local ready queue, owned exclusively by this core.
    pub task_queue: VecDeque<TaskId>,
    /// Ticks the current task has run since it was last dispatched.
    pub time_slice: Tick,
    /// Ticks spent with a running task.
    pub active_time: Tick,
    pub preemption_count: u64,
    /// Running task (or Idle) at the end of every tick.
    pub time_line: Vec<Slot>,
}

impl SimCore {
    pub fn new(def: &CoreDef) -> Self {
        SimCore {
            id: def.id,
            speed: def.speed,
            current_task: None,
            task_queue: VecDeque::new(),
            time_slice: 0,
            active_time: 0,
            preemption_count: 0,
            time_line: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_task.is_none()
    }

    /// Idle with nothing queued: the only state in which a core steals.
    pub fn is_starved(&self) -> bool {
        self.is_idle() && self.task_queue.is_empty()
    }

    pub fn nr_queued(&self) -> usize {
        self.task_queue.len()
    }

    /// Percentage of `ticks` this core spent running a task.
    pub fn utilization(&self, ticks: Tick) -> f64 {
        if ticks == 0 {
            0.0
        } else {
            self.active_time as f64 / ticks as f64 * 100.0
        }
    }

    pub(crate) fn record_timeline(&mut self) {
        let slot = match self.current_task {
            Some(id) => Slot::Task(id),
            None => Slot::Idle,
        };
        self.time_line.push(slot);
    }
}
