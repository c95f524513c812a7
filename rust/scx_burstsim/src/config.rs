//! Policy configuration and the named experiment presets.
//!
//! The three policy switches and the tuning constants all live in
//! [`PolicyConfig`], which the tick loop consults; the loop itself is the
//! same for every experiment variant.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::types::{Tick, Work};

/// Scheduling policy switches and tuning constants.
///
/// Every field has a default matching the reference configuration, so a
/// JSON file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Relocate queued tasks that never started and waited too long.
    pub enable_starvation: bool,
    /// Let idle, queue-empty cores take work from peers.
    pub enable_stealing: bool,
    /// Send overflow (and rescued tasks) to a shared queue instead of
    /// another core's local queue.
    pub enable_global_queue: bool,
    /// Round-robin time slice in ticks.
    pub quantum: Tick,
    /// Predicted bursts at or above this go to the fastest core.
    pub burst_threshold: f64,
    /// Capacity of each core's local queue for arrival routing.
    pub max_queue_length: usize,
    /// A queued task is starving once its wait strictly exceeds this.
    pub starvation_threshold: Tick,
    /// Rescued tasks with bursts at or below this jump the queue.
    pub short_task_threshold: Work,
    /// Exponential smoothing factor of the burst predictor.
    pub alpha: f64,
    /// Burst estimate for tasks whose definition carries none.
    pub initial_prediction: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            enable_starvation: false,
            enable_stealing: false,
            enable_global_queue: false,
            quantum: 2,
            burst_threshold: 5.0,
            max_queue_length: 2,
            starvation_threshold: 2,
            short_task_threshold: 3,
            alpha: 0.5,
            initial_prediction: 5.0,
        }
    }
}

impl PolicyConfig {
    /// Reference constants with the switches of `policy` applied.
    pub fn for_policy(policy: Policy) -> Self {
        PolicyConfig::default().with_policy(policy)
    }

    /// Replace the three switches with those of `policy`, keeping the
    /// tuning constants.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        let (starvation, stealing, global) = policy.switches();
        self.enable_starvation = starvation;
        self.enable_stealing = stealing;
        self.enable_global_queue = global;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: PolicyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantum == 0 {
            return Err(SimError::InvalidConfig("quantum must be positive".into()));
        }
        if self.max_queue_length == 0 {
            return Err(SimError::InvalidConfig(
                "max_queue_length must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SimError::InvalidConfig(format!(
                "alpha {} is outside [0, 1]",
                self.alpha
            )));
        }
        if !self.burst_threshold.is_finite() {
            return Err(SimError::InvalidConfig(
                "burst_threshold must be finite".into(),
            ));
        }
        if !self.initial_prediction.is_finite() || self.initial_prediction < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "initial_prediction {} must be finite and non-negative",
                self.initial_prediction
            )));
        }
        Ok(())
    }
}

/// Named combinations of the three policy switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Routing and shortest-predicted-burst dispatch only.
    Baseline,
    /// Starvation rescue into peer queues.
    Starvation,
    /// Work stealing from peer queues.
    Stealing,
    /// Starvation rescue plus work stealing.
    StarvationStealing,
    /// Rescue and stealing through the shared overflow queue.
    Global,
}

impl Policy {
    pub const ALL: [Policy; 5] = [
        Policy::Baseline,
        Policy::Starvation,
        Policy::Stealing,
        Policy::StarvationStealing,
        Policy::Global,
    ];

    /// The comparison run when no policy is named.
    pub const DEFAULT_SET: [Policy; 4] = [
        Policy::Baseline,
        Policy::Stealing,
        Policy::StarvationStealing,
        Policy::Global,
    ];

    /// (starvation, stealing, global queue)
    pub fn switches(self) -> (bool, bool, bool) {
        match self {
            Policy::Baseline => (false, false, false),
            Policy::Starvation => (true, false, false),
            Policy::Stealing => (false, true, false),
            Policy::StarvationStealing => (true, true, false),
            Policy::Global => (true, true, true),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Policy::Baseline => "No Starvation, No Stealing, No Global Queue",
            Policy::Starvation => "Starvation, No Stealing, No Global Queue",
            Policy::Stealing => "No Starvation, Stealing, No Global Queue",
            Policy::StarvationStealing => "Starvation, Stealing, No Global Queue",
            Policy::Global => "Starvation, Stealing, Global Queue",
        }
    }
}

/// A named policy configuration to run against a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub title: String,
    pub config: PolicyConfig,
}

impl Experiment {
    pub fn new(title: impl Into<String>, config: PolicyConfig) -> Self {
        Experiment {
            title: title.into(),
            config,
        }
    }

    /// Preset experiment on top of `base` tuning constants.
    pub fn preset(policy: Policy, base: &PolicyConfig) -> Self {
        Experiment::new(policy.title(), base.clone().with_policy(policy))
    }
}
