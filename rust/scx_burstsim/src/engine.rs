//! Discrete-time simulation engine.
//!
//! The [`Simulator`] owns every piece of mutable state of one experiment:
//! the clock, tasks, cores and the overflow queue. One call to
//! [`Simulator::step`] advances one tick through these phases:
//!
//! 1. Route tasks arriving at this tick (see `dispatch.rs`).
//! 2. For each core in registration order: select its next task, then
//!    run starvation rescue and work stealing for it, if enabled (see
//!    `balance.rs`).
//! 3. Execute one tick on every busy core: complete or preempt.
//! 4. Append each core's running task (or Idle) to its timeline.
//!
//! A core dispatches from its own queue before any later core may steal
//! from it. Tasks rescued onto a later core are selected by that core in
//! the same tick; tasks rescued onto an earlier core wait for the next.
//! The order of phases and cores is part of the scheduling semantics.

use std::collections::{BTreeMap, VecDeque};

use metrics::counter;
use tracing::{debug, debug_span, info, trace, warn};

use crate::config::{Experiment, PolicyConfig};
use crate::cpu::SimCore;
use crate::error::{Result, SimError};
use crate::predictor::BurstPredictor;
use crate::scenario::Scenario;
use crate::stats::{Gantt, PolicyCounters, Report, SimStats};
use crate::task::{SimTask, TaskLocation};
use crate::types::{TaskId, Tick};

/// The state of one experiment run.
#[derive(Debug, Clone)]
pub struct Simulator {
    pub(crate) config: PolicyConfig,
    pub(crate) predictor: BurstPredictor,
    pub(crate) clock: Tick,
    pub(crate) tasks: BTreeMap<TaskId, SimTask>,
    /// Task ids in registration order.
    pub(crate) order: Vec<TaskId>,
    /// Pending arrivals keyed by tick, each in registration order.
    pub(crate) arrivals: BTreeMap<Tick, Vec<TaskId>>,
    pub(crate) cores: Vec<SimCore>,
    pub(crate) overflow: VecDeque<TaskId>,
    pub(crate) counters: PolicyCounters,
    nr_finished: usize,
    tick_limit: Tick,
}

static_assertions::assert_impl_all!(Simulator: Send);

impl Simulator {
    /// Validate `scenario` and `config` and build a fresh run at tick 0.
    pub fn new(scenario: &Scenario, config: PolicyConfig) -> Result<Self> {
        scenario.validate()?;
        config.validate()?;

        if config.enable_global_queue && !config.enable_stealing {
            warn!("global queue enabled without stealing; overflowed tasks will never run");
        }

        let mut tasks = BTreeMap::new();
        let mut order = Vec::with_capacity(scenario.tasks.len());
        let mut arrivals: BTreeMap<Tick, Vec<TaskId>> = BTreeMap::new();
        for def in &scenario.tasks {
            tasks.insert(def.id, SimTask::new(def, config.initial_prediction));
            order.push(def.id);
            arrivals.entry(def.arrival_time).or_default().push(def.id);
        }

        // After the last arrival every tick with unfinished work retires
        // at least one unit on some core.
        let tick_limit = scenario
            .last_arrival()
            .saturating_add(scenario.total_work());

        Ok(Simulator {
            predictor: BurstPredictor::new(config.alpha),
            config,
            clock: 0,
            tasks,
            order,
            arrivals,
            cores: scenario.cores.iter().map(SimCore::new).collect(),
            overflow: VecDeque::new(),
            counters: PolicyCounters::default(),
            nr_finished: 0,
            tick_limit,
        })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// The next tick to be simulated.
    pub fn clock(&self) -> Tick {
        self.clock
    }

    /// Ticks after which an unfinished run is reported as stalled.
    pub fn tick_limit(&self) -> Tick {
        self.tick_limit
    }

    pub fn cores(&self) -> &[SimCore] {
        &self.cores
    }

    pub fn overflow(&self) -> &VecDeque<TaskId> {
        &self.overflow
    }

    pub fn task(&self, id: TaskId) -> Option<&SimTask> {
        self.tasks.get(&id)
    }

    /// Tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &SimTask> + '_ {
        self.order.iter().map(move |id| &self.tasks[id])
    }

    pub fn location(&self, id: TaskId) -> Option<TaskLocation> {
        self.tasks.get(&id).map(|t| t.location)
    }

    pub fn counters(&self) -> &PolicyCounters {
        &self.counters
    }

    pub fn is_finished(&self) -> bool {
        self.nr_finished == self.tasks.len()
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        let now = self.clock;
        let _span = debug_span!("tick", tick = now).entered();
        let nr_cores = self.cores.len();

        self.route_arrivals(now);

        for c in 0..nr_cores {
            self.select_next(c, now);
            if self.config.enable_starvation {
                self.rescue_starving(c, now);
            }
            if self.config.enable_stealing {
                self.steal(c, now);
            }
        }

        for c in 0..nr_cores {
            self.execute(c, now);
        }

        for core in self.cores.iter_mut() {
            core.record_timeline();
        }

        self.clock += 1;
    }

    /// Run until every task has finished.
    ///
    /// Fails with [`SimError::Stalled`] when the tick bound is reached
    /// first, e.g. when tasks sit in the overflow queue with stealing off.
    pub fn run(mut self) -> Result<Outcome> {
        info!(
            tasks = self.tasks.len(),
            cores = self.cores.len(),
            limit = self.tick_limit,
            "starting simulation"
        );

        while !self.is_finished() {
            if self.clock >= self.tick_limit {
                return Err(SimError::Stalled {
                    tick: self.clock,
                    unfinished: self.tasks.len() - self.nr_finished,
                });
            }
            self.step();
        }

        info!(ticks = self.clock, "all tasks finished");
        Ok(self.into_outcome())
    }

    /// Freeze the current state into an [`Outcome`].
    pub fn into_outcome(self) -> Outcome {
        let Simulator {
            clock,
            mut tasks,
            order,
            cores,
            counters,
            ..
        } = self;
        let tasks = order
            .iter()
            .filter_map(|id| tasks.remove(id))
            .collect();
        Outcome {
            ticks: clock,
            tasks,
            cores,
            counters,
        }
    }

    /// Execute one tick on core `c`.
    fn execute(&mut self, c: usize, now: Tick) {
        let core = &mut self.cores[c];
        let Some(id) = core.current_task else {
            return;
        };

        core.active_time += 1;
        core.time_slice += 1;

        let Some(task) = self.tasks.get_mut(&id) else {
            warn!(task = %id, core = %core.id, "running task is not registered");
            return;
        };
        task.remaining_time = task.remaining_time.saturating_sub(core.speed);

        if task.remaining_time == 0 {
            task.complete(now);
            let predicted = self.predictor.observe(task);
            core.current_task = None;
            core.time_slice = 0;
            self.nr_finished += 1;
            counter!("burstsim_completions_total").increment(1);
            debug!(task = %id, core = %core.id, predicted, "task completed");
            self.select_next(c, now);
        } else if core.time_slice == self.config.quantum {
            core.preemption_count += 1;
            core.task_queue.push_back(id);
            core.current_task = None;
            core.time_slice = 0;
            task.location = TaskLocation::Local(core.id);
            self.counters.preemptions += 1;
            counter!("burstsim_preemptions_total").increment(1);
            trace!(task = %id, core = %core.id, remaining = task.remaining_time, "quantum expired");
            self.select_next(c, now);
        }
    }

    /// Check that every task's location tag matches where it actually is,
    /// and that no task is in two places at once.
    pub fn verify_locations(&self) -> Result<()> {
        fn place(
            seen: &mut BTreeMap<TaskId, TaskLocation>,
            id: TaskId,
            loc: TaskLocation,
        ) -> Result<()> {
            match seen.insert(id, loc) {
                Some(prev) => Err(SimError::LocationMismatch {
                    task: id,
                    detail: format!("found in both {prev:?} and {loc:?}"),
                }),
                None => Ok(()),
            }
        }

        let mut seen = BTreeMap::new();
        for core in &self.cores {
            if let Some(id) = core.current_task {
                place(&mut seen, id, TaskLocation::Running(core.id))?;
            }
            for &id in &core.task_queue {
                place(&mut seen, id, TaskLocation::Local(core.id))?;
            }
        }
        for &id in &self.overflow {
            place(&mut seen, id, TaskLocation::Overflow)?;
        }

        for (&id, found) in &seen {
            if !self.tasks.contains_key(&id) {
                return Err(SimError::LocationMismatch {
                    task: id,
                    detail: format!("unknown task in {found:?}"),
                });
            }
        }

        for (&id, task) in &self.tasks {
            let found = seen.get(&id).copied();
            let consistent = match task.location {
                TaskLocation::Unarrived => found.is_none() && task.arrival_time >= self.clock,
                TaskLocation::Finished => found.is_none() && task.is_finished(),
                tagged => found == Some(tagged),
            };
            if !consistent {
                return Err(SimError::LocationMismatch {
                    task: id,
                    detail: format!("tagged {:?} but found in {:?}", task.location, found),
                });
            }
        }
        Ok(())
    }
}

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Ticks simulated.
    pub ticks: Tick,
    /// Tasks in registration order.
    pub tasks: Vec<SimTask>,
    pub cores: Vec<SimCore>,
    pub counters: PolicyCounters,
}

impl Outcome {
    pub fn task(&self, id: TaskId) -> Option<&SimTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn stats(&self) -> Result<SimStats> {
        SimStats::compute(self)
    }

    pub fn gantt(&self) -> Gantt<'_> {
        Gantt::new(&self.cores, self.ticks)
    }
}

/// Run one named experiment on a fresh simulator and aggregate its metrics.
pub fn run_experiment(scenario: &Scenario, experiment: &Experiment) -> Result<Report> {
    let span = tracing::info_span!("experiment", title = %experiment.title);
    let _guard = span.enter();

    let outcome = Simulator::new(scenario, experiment.config.clone())?.run()?;
    let stats = outcome.stats()?;
    Ok(Report {
        title: experiment.title.clone(),
        outcome,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDef;
    use crate::types::CoreId;

    fn single_task_on_two_cores() -> Scenario {
        Scenario::builder()
            .cores(&[2, 1])
            .task(TaskDef::new(1, 0, 4).with_prediction(2.0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_preempted_task_requeues_on_own_core() {
        let mut sim = Simulator::new(&single_task_on_two_cores(), PolicyConfig::default()).unwrap();

        sim.step();
        assert_eq!(sim.location(TaskId(1)), Some(TaskLocation::Running(CoreId(1))));
        assert_eq!(sim.cores[1].time_slice, 1);

        // Quantum expires at the end of tick 1; the task is the only one
        // queued, so it is selected again right away.
        sim.step();
        assert_eq!(sim.cores[1].preemption_count, 1);
        assert_eq!(sim.cores[1].time_slice, 0);
        assert_eq!(sim.location(TaskId(1)), Some(TaskLocation::Running(CoreId(1))));
        assert_eq!(sim.task(TaskId(1)).unwrap().remaining_time, 2);
        sim.verify_locations().unwrap();
    }

    #[test]
    fn test_finish_is_exclusive_of_preemption() {
        // Burst 2 on a speed-1 core hits zero exactly when the quantum
        // expires: the task finishes and is not preempted.
        let scenario = Scenario::builder()
            .core(0, 1)
            .add_task(1, 0, 2)
            .build()
            .unwrap();
        let outcome = Simulator::new(&scenario, PolicyConfig::default())
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(outcome.cores[0].preemption_count, 0);
        assert_eq!(outcome.task(TaskId(1)).unwrap().finish_time, Some(2));
    }

    #[test]
    fn test_fast_core_clamps_remaining() {
        let scenario = Scenario::builder()
            .core(0, 2)
            .add_task(1, 0, 3)
            .build()
            .unwrap();
        let outcome = Simulator::new(&scenario, PolicyConfig::default())
            .unwrap()
            .run()
            .unwrap();
        let task = outcome.task(TaskId(1)).unwrap();
        assert_eq!(task.remaining_time, 0);
        assert_eq!(task.finish_time, Some(2));
        assert_eq!(outcome.ticks, 2);
    }

    #[test]
    fn test_completion_updates_prediction() {
        let outcome = Simulator::new(&single_task_on_two_cores(), PolicyConfig::default())
            .unwrap()
            .run()
            .unwrap();
        let task = outcome.task(TaskId(1)).unwrap();
        assert_eq!(task.predicted_burst, 3.0);
        assert_eq!(task.last_actual_burst, Some(4));
    }

    #[test]
    fn test_timeline_one_entry_per_tick() {
        let outcome = Simulator::new(&single_task_on_two_cores(), PolicyConfig::default())
            .unwrap()
            .run()
            .unwrap();
        use crate::cpu::Slot;
        assert_eq!(outcome.cores[0].time_line, vec![Slot::Idle; 4]);
        // The slot is recorded after execution, so the completing tick
        // already shows the core as idle.
        assert_eq!(
            outcome.cores[1].time_line,
            vec![
                Slot::Task(TaskId(1)),
                Slot::Task(TaskId(1)),
                Slot::Task(TaskId(1)),
                Slot::Idle
            ]
        );
    }

    #[test]
    fn test_stall_guard() {
        // Overflowed tasks are never pulled back without stealing.
        let scenario = Scenario::builder()
            .core(0, 1)
            .tasks((1..=3).map(|i| TaskDef::new(i, 0, 1).with_prediction(1.0)))
            .build()
            .unwrap();
        let config = PolicyConfig {
            enable_global_queue: true,
            ..PolicyConfig::default()
        };
        let err = Simulator::new(&scenario, config).unwrap().run().unwrap_err();
        assert!(matches!(
            err,
            SimError::Stalled {
                tick: 3,
                unfinished: 1
            }
        ));
    }

    #[test]
    fn test_verify_locations_catches_duplicates() {
        let mut sim = Simulator::new(&single_task_on_two_cores(), PolicyConfig::default()).unwrap();
        sim.step();
        sim.cores[0].task_queue.push_back(TaskId(1));
        assert!(matches!(
            sim.verify_locations(),
            Err(SimError::LocationMismatch { task: TaskId(1), .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PolicyConfig {
            quantum: 0,
            ..PolicyConfig::default()
        };
        assert!(matches!(
            Simulator::new(&single_task_on_two_cores(), config),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
