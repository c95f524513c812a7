//! Error type shared by scenario setup, the engine and metrics.

use crate::types::{CoreId, TaskId, Tick};

/// Errors raised by the simulator.
///
/// Empty queues, failed steals and single-core rescues are ordinary
/// control flow and never surface here.
#[derive(Debug)]
pub enum SimError {
    /// A task with zero burst time.
    InvalidBurst { task: TaskId },
    /// A core with zero speed.
    InvalidSpeed { core: CoreId },
    /// Two tasks share an id.
    DuplicateTask(TaskId),
    /// Two cores share an id.
    DuplicateCore(CoreId),
    /// A scenario without cores.
    NoCores,
    /// A scenario without tasks.
    NoTasks,
    /// A policy configuration value is out of range.
    InvalidConfig(String),
    /// The tick loop passed its bound with tasks still unfinished.
    Stalled { tick: Tick, unfinished: usize },
    /// Too few samples to compute a statistic.
    InsufficientSamples { needed: usize, got: usize },
    /// A task's location tag disagrees with queue membership.
    LocationMismatch { task: TaskId, detail: String },
    /// Reading a configuration or workload file failed.
    Io(std::io::Error),
    /// JSON parse error.
    Json(serde_json::Error),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidBurst { task } => {
                write!(f, "task {task} has a non-positive burst time")
            }
            SimError::InvalidSpeed { core } => {
                write!(f, "core {core} has a non-positive speed")
            }
            SimError::DuplicateTask(id) => write!(f, "duplicate task id {id}"),
            SimError::DuplicateCore(id) => write!(f, "duplicate core id {id}"),
            SimError::NoCores => write!(f, "scenario has no cores"),
            SimError::NoTasks => write!(f, "scenario has no tasks"),
            SimError::InvalidConfig(msg) => write!(f, "invalid policy config: {msg}"),
            SimError::Stalled { tick, unfinished } => write!(
                f,
                "simulation stalled at tick {tick} with {unfinished} unfinished task(s)"
            ),
            SimError::InsufficientSamples { needed, got } => {
                write!(f, "need at least {needed} samples, got {got}")
            }
            SimError::LocationMismatch { task, detail } => {
                write!(f, "task {task} location mismatch: {detail}")
            }
            SimError::Io(e) => write!(f, "I/O error: {e}"),
            SimError::Json(e) => write!(f, "JSON parse error: {e}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Io(e) => Some(e),
            SimError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
