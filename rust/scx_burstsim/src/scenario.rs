//! Scenario definition and builder API.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cpu::CoreDef;
use crate::error::{Result, SimError};
use crate::task::TaskDef;
use crate::types::{Tick, Work};

/// A complete workload: cores in registration order and tasks in
/// registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub cores: Vec<CoreDef>,
    pub tasks: Vec<TaskDef>,
}

/// Builder for constructing scenarios.
#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    cores: Vec<CoreDef>,
    tasks: Vec<TaskDef>,
}

impl Scenario {
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::default()
    }

    /// Parse a `{"cores": [...], "tasks": [...]}` workload.
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject malformed workloads before any tick runs.
    pub fn validate(&self) -> Result<()> {
        if self.cores.is_empty() {
            return Err(SimError::NoCores);
        }
        if self.tasks.is_empty() {
            return Err(SimError::NoTasks);
        }

        let mut core_ids = BTreeSet::new();
        for core in &self.cores {
            if core.speed == 0 {
                return Err(SimError::InvalidSpeed { core: core.id });
            }
            if !core_ids.insert(core.id) {
                return Err(SimError::DuplicateCore(core.id));
            }
        }

        let mut task_ids = BTreeSet::new();
        for task in &self.tasks {
            if task.burst_time == 0 {
                return Err(SimError::InvalidBurst { task: task.id });
            }
            if !task_ids.insert(task.id) {
                return Err(SimError::DuplicateTask(task.id));
            }
            if let Some(p) = task.predicted_burst {
                if !p.is_finite() || p < 0.0 {
                    return Err(SimError::InvalidConfig(format!(
                        "task {} has invalid predicted burst {p}",
                        task.id
                    )));
                }
            }
        }

        // The stall bound is the last arrival plus all work.
        self.tasks
            .iter()
            .try_fold(self.last_arrival(), |acc, t| acc.checked_add(t.burst_time))
            .ok_or_else(|| {
                SimError::InvalidConfig("total work overflows the tick range".to_string())
            })?;
        Ok(())
    }

    /// Sum of every burst, saturating at `Work::MAX`.
    pub fn total_work(&self) -> Work {
        self.tasks
            .iter()
            .fold(0, |acc: Work, t| acc.saturating_add(t.burst_time))
    }

    pub fn last_arrival(&self) -> Tick {
        self.tasks.iter().map(|t| t.arrival_time).max().unwrap_or(0)
    }
}

impl ScenarioBuilder {
    /// Add a core. Registration order breaks every tie in routing,
    /// rescue and stealing.
    pub fn core(mut self, id: u32, speed: Work) -> Self {
        self.cores.push(CoreDef::new(id, speed));
        self
    }

    /// Add `speeds.len()` cores with ids `0..`.
    pub fn cores(mut self, speeds: &[Work]) -> Self {
        for &speed in speeds {
            let id = self.cores.len() as u32;
            self.cores.push(CoreDef::new(id, speed));
        }
        self
    }

    /// Add a task with a full TaskDef.
    pub fn task(mut self, def: TaskDef) -> Self {
        self.tasks.push(def);
        self
    }

    /// Convenience: add a task using the default initial prediction.
    pub fn add_task(self, id: u32, arrival_time: Tick, burst_time: Work) -> Self {
        self.task(TaskDef::new(id, arrival_time, burst_time))
    }

    pub fn tasks<I: IntoIterator<Item = TaskDef>>(mut self, defs: I) -> Self {
        self.tasks.extend(defs);
        self
    }

    /// Build and validate the scenario.
    pub fn build(self) -> Result<Scenario> {
        let scenario = Scenario {
            cores: self.cores,
            tasks: self.tasks,
        };
        scenario.validate()?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoreId, TaskId};

    #[test]
    fn test_builder_assigns_core_ids() {
        let s = Scenario::builder()
            .cores(&[2, 1])
            .add_task(1, 0, 3)
            .build()
            .unwrap();
        assert_eq!(s.cores[0], CoreDef::new(0, 2));
        assert_eq!(s.cores[1], CoreDef::new(1, 1));
    }

    #[test]
    fn test_rejects_zero_burst() {
        let err = Scenario::builder()
            .core(0, 1)
            .add_task(4, 0, 0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidBurst { task: TaskId(4) }));
    }

    #[test]
    fn test_rejects_zero_speed() {
        let err = Scenario::builder()
            .core(3, 0)
            .add_task(1, 0, 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidSpeed { core: CoreId(3) }));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let err = Scenario::builder()
            .core(0, 1)
            .add_task(1, 0, 1)
            .add_task(1, 2, 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::DuplicateTask(TaskId(1))));

        let err = Scenario::builder()
            .core(0, 1)
            .core(0, 2)
            .add_task(1, 0, 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::DuplicateCore(CoreId(0))));

        assert!(matches!(
            Scenario::builder().add_task(1, 0, 1).build(),
            Err(SimError::NoCores)
        ));
        assert!(matches!(
            Scenario::builder().core(0, 1).build(),
            Err(SimError::NoTasks)
        ));
    }

    #[test]
    fn test_rejects_work_past_tick_range() {
        let err = Scenario::builder()
            .core(0, 1)
            .add_task(1, 0, Work::MAX)
            .add_task(2, 0, Work::MAX)
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));

        let err = Scenario::builder()
            .core(0, 1)
            .add_task(1, Tick::MAX, 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));

        let s = Scenario::builder()
            .core(0, 1)
            .add_task(1, Tick::MAX - 1, 1)
            .build()
            .unwrap();
        assert_eq!(s.total_work(), 1);
    }

    #[test]
    fn test_from_json() {
        let s = Scenario::from_json(
            r#"{
                "cores": [{ "id": 0, "speed": 2 }, { "id": 1, "speed": 1 }],
                "tasks": [
                    { "id": 1, "arrival_time": 0, "burst_time": 4, "predicted_burst": 2.0 },
                    { "id": 2, "arrival_time": 1, "burst_time": 6 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(s.cores.len(), 2);
        assert_eq!(s.tasks[0].predicted_burst, Some(2.0));
        assert_eq!(s.tasks[1].predicted_burst, None);
        assert_eq!(s.total_work(), 10);
        assert_eq!(s.last_arrival(), 1);
    }

    #[test]
    fn test_from_json_rejects_negative_burst() {
        let err = Scenario::from_json(
            r#"{ "cores": [{ "id": 0, "speed": 1 }],
                 "tasks": [{ "id": 1, "arrival_time": 0, "burst_time": -3 }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Json(_)));
    }
}
