//! Synthetic workload generators.
//!
//! Each function returns a ready-to-run [`Scenario`]. All generators are
//! deterministic; the random one is seeded.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::scenario::Scenario;
use crate::task::TaskDef;
use crate::types::{Tick, Work};

/// Core speeds of the reference machine: one fast core, one slow core.
pub const REFERENCE_SPEEDS: [Work; 2] = [2, 1];

/// Task count of the reference workload.
pub const REFERENCE_NR_TASKS: u32 = 100;

/// Reference workload tasks: ids `1..=nr_tasks`, four arrivals per tick,
/// bursts cycling through 1..=10.
pub fn reference_tasks(nr_tasks: u32) -> Vec<TaskDef> {
    (1..=nr_tasks)
        .map(|i| TaskDef::new(i, Tick::from(i / 4), Work::from(i % 10 + 1)))
        .collect()
}

/// Reference tasks on the reference cores.
pub fn reference(nr_tasks: u32) -> Result<Scenario> {
    Scenario::builder()
        .cores(&REFERENCE_SPEEDS)
        .tasks(reference_tasks(nr_tasks))
        .build()
}

/// A long job arriving first, followed by a trickle of short jobs that
/// risk waiting behind it.
pub fn starvation_prone() -> Result<Scenario> {
    Scenario::builder()
        .cores(&REFERENCE_SPEEDS)
        .add_task(1, 0, 10)
        .add_task(2, 1, 1)
        .add_task(3, 2, 2)
        .add_task(4, 3, 1)
        .add_task(5, 4, 2)
        .add_task(6, 5, 1)
        .build()
}

/// Random arrivals in `0..=max_arrival` and bursts in `1..=max_burst`,
/// reproducible for a given seed.
pub fn random(
    seed: u64,
    speeds: &[Work],
    nr_tasks: u32,
    max_arrival: Tick,
    max_burst: Work,
) -> Result<Scenario> {
    let mut rng = StdRng::seed_from_u64(seed);
    let max_burst = max_burst.max(1);
    let tasks = (1..=nr_tasks).map(|i| {
        let arrival = rng.gen_range(0..=max_arrival);
        let burst = rng.gen_range(1..=max_burst);
        TaskDef::new(i, arrival, burst)
    });
    Scenario::builder().cores(speeds).tasks(tasks).build()
}
