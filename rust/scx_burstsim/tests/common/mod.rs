#![allow(dead_code)]

use std::collections::BTreeMap;

use scx_burstsim::*;

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What one checked run observed besides its outcome.
#[derive(Debug, Default)]
pub struct Observed {
    /// Largest number of steals and overflow pulls in a single tick.
    pub max_takes_per_tick: u64,
}

/// Step `sim` to completion, checking after every tick that:
///
/// - every location tag matches the queues and cores,
/// - remaining work never grows,
/// - a task's start time never changes once set,
/// - each core's timeline has one slot per simulated tick.
pub fn run_checked(mut sim: Simulator) -> (Outcome, Observed) {
    let mut remaining: BTreeMap<TaskId, Work> = sim
        .tasks()
        .map(|t| (t.id, t.remaining_time))
        .collect();
    let mut started: BTreeMap<TaskId, Tick> = BTreeMap::new();
    let mut observed = Observed::default();

    sim.verify_locations().unwrap();
    while !sim.is_finished() {
        assert!(
            sim.clock() < sim.tick_limit(),
            "run exceeded tick limit {}",
            sim.tick_limit()
        );

        let before = *sim.counters();
        sim.step();
        let after = *sim.counters();
        let takes = (after.steals - before.steals) + (after.overflow_pulls - before.overflow_pulls);
        observed.max_takes_per_tick = observed.max_takes_per_tick.max(takes);

        sim.verify_locations()
            .unwrap_or_else(|e| panic!("tick {}: {e}", sim.clock() - 1));

        for task in sim.tasks() {
            let prev = remaining.insert(task.id, task.remaining_time).unwrap();
            assert!(
                task.remaining_time <= prev,
                "task {} remaining grew {prev} -> {}",
                task.id,
                task.remaining_time
            );
            if let Some(start) = task.start_time {
                let first = *started.entry(task.id).or_insert(start);
                assert_eq!(first, start, "task {} start time changed", task.id);
            }
        }

        for core in sim.cores() {
            assert_eq!(core.time_line.len() as Tick, sim.clock());
        }
    }

    (sim.into_outcome(), observed)
}

/// Check the per-task invariants of a finished run.
pub fn assert_all_finished(outcome: &Outcome) {
    for task in &outcome.tasks {
        assert!(task.is_finished(), "task {} unfinished", task.id);
        assert_eq!(task.remaining_time, 0);
        assert_eq!(task.location, TaskLocation::Finished);

        let start = task.start_time.unwrap();
        let finish = task.finish_time.unwrap();
        assert!(start >= task.arrival_time, "task {} started early", task.id);
        assert!(finish > start, "task {} finished before it ran", task.id);
        assert_eq!(task.waiting_time, Some(start - task.arrival_time));
        assert_eq!(task.turnaround_time, Some(finish - task.arrival_time));
        assert!(task.turnaround_time >= task.waiting_time);
        assert_eq!(task.last_actual_burst, Some(task.burst_time));
        assert!(task.core_id.is_some());
    }
    for core in &outcome.cores {
        assert!(core.current_task.is_none());
        assert!(core.task_queue.is_empty());
        assert_eq!(core.time_line.len() as Tick, outcome.ticks);
    }
}
