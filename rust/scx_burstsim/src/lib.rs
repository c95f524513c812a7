//! scx_burstsim - Discrete-time simulator for multicore burst scheduling.
//!
//! Compares scheduling policies on identical synthetic workloads. Every
//! policy shares the same tick loop: arrivals are routed by predicted burst
//! and core speed, idle cores pick the shortest predicted burst, and
//! running tasks are preempted round-robin. Policies differ only in which
//! of starvation rescue, work stealing and the shared overflow queue they
//! enable.
//!
//! # Architecture
//!
//! - **Engine**: per-tick loop and execution (`engine`)
//! - **Dispatch**: arrival routing and shortest-predicted-burst selection
//! - **Balance**: starvation rescue and work stealing
//! - **Predictor**: exponential smoothing of burst estimates
//! - **Stats**: metrics aggregation, reports and Gantt timelines
//!
//! # Usage
//!
//! ```rust,no_run
//! use scx_burstsim::*;
//!
//! let scenario = workloads::reference(100)?;
//! for policy in Policy::DEFAULT_SET {
//!     let exp = Experiment::preset(policy, &PolicyConfig::default());
//!     let report = run_experiment(&scenario, &exp)?;
//!     report.format(&mut std::io::stdout(), false, false)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod balance;
pub mod config;
pub mod cpu;
mod dispatch;
pub mod engine;
pub mod error;
pub mod predictor;
pub mod scenario;
pub mod stats;
pub mod task;
pub mod types;
pub mod workloads;

pub use config::{Experiment, Policy, PolicyConfig};
pub use cpu::{CoreDef, SimCore, Slot};
pub use engine::{run_experiment, Outcome, Simulator};
pub use error::SimError;
pub use predictor::BurstPredictor;
pub use scenario::Scenario;
pub use stats::{Gantt, PolicyCounters, Report, SimStats};
pub use task::{SimTask, TaskDef, TaskLocation};
pub use types::{CoreId, TaskId, Tick, Work};
