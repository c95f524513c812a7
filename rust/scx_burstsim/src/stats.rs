//! Metrics aggregation and reporting.

use std::fmt;
use std::io::Write;

use crate::cpu::SimCore;
use crate::engine::Outcome;
use crate::error::{Result, SimError};
use crate::types::{CoreId, Tick, Work};

/// How often each policy mechanism fired during a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PolicyCounters {
    pub preemptions: u64,
    /// Starving tasks moved off their core.
    pub rescues: u64,
    /// Tasks taken from a peer core's queue.
    pub steals: u64,
    /// Tasks taken from the overflow queue.
    pub overflow_pulls: u64,
    /// Arrivals sent to the overflow queue because the target was full.
    pub overflow_routes: u64,
    /// Arrivals sent to the least loaded core because the target was full.
    pub fallback_routes: u64,
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

/// Sample (n - 1) standard deviation. Needs at least two samples.
pub fn sample_stddev(samples: &[f64]) -> Result<f64> {
    if samples.len() < 2 {
        return Err(SimError::InsufficientSamples {
            needed: 2,
            got: samples.len(),
        });
    }
    let m = samples.iter().sum::<f64>() / samples.len() as f64;
    let ss: f64 = samples.iter().map(|x| (x - m) * (x - m)).sum();
    Ok((ss / (samples.len() - 1) as f64).sqrt())
}

#[derive(Clone, Debug, PartialEq)]
pub struct CoreStats {
    pub id: CoreId,
    pub speed: Work,
    pub active_time: Tick,
    pub utilization: f64,
    pub preemptions: u64,
}

impl CoreStats {
    pub fn format<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(
            w,
            "  CORE[{:02}] speed={} active={:5} util={:6.2} preempt={:4}",
            self.id.0, self.speed, self.active_time, self.utilization, self.preemptions
        )
    }
}

/// Aggregate metrics of one finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimStats {
    pub avg_waiting_time: f64,
    pub stddev_waiting_time: f64,
    pub avg_turnaround_time: f64,
    pub avg_utilization: f64,
    pub ticks: Tick,
    pub counters: PolicyCounters,
    pub cores: Vec<CoreStats>,
}

impl SimStats {
    /// Aggregate over finished tasks and all cores.
    ///
    /// Utilization divides by `ticks + 1`, so a core busy for the whole
    /// run reports slightly under 100%.
    pub fn compute(outcome: &Outcome) -> Result<Self> {
        let waits: Vec<f64> = outcome
            .tasks
            .iter()
            .filter_map(|t| t.waiting_time)
            .map(|w| w as f64)
            .collect();
        let turnarounds: Vec<f64> = outcome
            .tasks
            .iter()
            .filter_map(|t| t.turnaround_time)
            .map(|t| t as f64)
            .collect();

        let stddev_waiting_time = sample_stddev(&waits)?;
        let avg_waiting_time = mean(&waits).unwrap_or(0.0);
        let avg_turnaround_time = mean(&turnarounds).unwrap_or(0.0);

        let cores: Vec<CoreStats> = outcome
            .cores
            .iter()
            .map(|core| CoreStats {
                id: core.id,
                speed: core.speed,
                active_time: core.active_time,
                utilization: core.utilization(outcome.ticks + 1),
                preemptions: core.preemption_count,
            })
            .collect();
        let utils: Vec<f64> = cores.iter().map(|c| c.utilization).collect();

        Ok(SimStats {
            avg_waiting_time,
            stddev_waiting_time,
            avg_turnaround_time,
            avg_utilization: mean(&utils).unwrap_or(0.0),
            ticks: outcome.ticks,
            counters: outcome.counters,
            cores,
        })
    }

    pub fn format<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "Average Waiting Time: {:.2}", self.avg_waiting_time)?;
        writeln!(
            w,
            "Standard Deviation of Waiting Time: {:.2}",
            self.stddev_waiting_time
        )?;
        writeln!(w, "Average Turnaround Time: {:.2}", self.avg_turnaround_time)?;
        writeln!(w, "Average Utilization: {:.2}", self.avg_utilization)?;
        Ok(())
    }

    /// Per-core breakdown and policy counters.
    pub fn format_detail<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let c = &self.counters;
        writeln!(
            w,
            "ticks={:5} preempt={:4} rescue={:4} steal={:4} ovf_pull={:4} ovf_route={:4} fallback={:4}",
            self.ticks,
            c.preemptions,
            c.rescues,
            c.steals,
            c.overflow_pulls,
            c.overflow_routes,
            c.fallback_routes,
        )?;
        for core in &self.cores {
            core.format(w)?;
        }
        Ok(())
    }
}

/// One experiment's title, final state and metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub title: String,
    pub outcome: Outcome,
    pub stats: SimStats,
}

impl Report {
    pub fn format<W: Write>(&self, w: &mut W, detail: bool, timeline: bool) -> std::io::Result<()> {
        writeln!(w, "\n=== Running Experiment: {} ===", self.title)?;
        if timeline {
            write!(w, "{}", self.outcome.gantt())?;
        }
        self.stats.format(w)?;
        if detail {
            self.stats.format_detail(w)?;
        }
        Ok(())
    }
}

/// Gantt-style rendering of per-core timelines, one column per tick.
pub struct Gantt<'a> {
    cores: &'a [SimCore],
    ticks: Tick,
}

impl<'a> Gantt<'a> {
    pub fn new(cores: &'a [SimCore], ticks: Tick) -> Self {
        Gantt { cores, ticks }
    }
}

impl fmt::Display for Gantt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gantt-style timeline:")?;
        write!(f, "{:<9}", "Time:")?;
        for tick in 0..self.ticks {
            write!(f, "{:<6}", tick)?;
        }
        writeln!(f)?;
        for core in self.cores {
            write!(f, "{:<9}", format!("Core {}:", core.id))?;
            for slot in &core.time_line {
                write!(f, "{:<6}", slot)?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }
}
