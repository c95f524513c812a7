//! Newtype wrappers and type aliases for domain concepts.
//!
//! Identifiers are newtypes so a task id can never be handed to an API
//! expecting a core id. Plain quantities (ticks, work units) are aliases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

/// Core identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoreId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated time in ticks.
pub type Tick = u64;

/// Units of work. A core of speed `s` retires `s` units per tick.
pub type Work = u64;
