//! burstsim — Compare multicore burst scheduling policies on one workload.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scx_burstsim::workloads;
use scx_burstsim::{run_experiment, Experiment, Policy, PolicyConfig, Scenario};

/// Compare multicore burst scheduling policies on one workload.
///
/// Tasks are routed to a fast or slow core by their predicted burst, idle
/// cores run the shortest predicted burst first, and running tasks are
/// preempted round-robin. Each policy enables a different combination of
/// starvation rescue, work stealing and a shared overflow queue; all of
/// them run against the same workload and report waiting time, turnaround
/// time and core utilization.
#[derive(Debug, Parser)]
#[command(name = "burstsim")]
struct Opts {
    /// Policy to run. Repeat to compare several. Defaults to baseline,
    /// stealing, starvation-stealing and global.
    #[clap(short = 'p', long = "policy", value_enum)]
    policies: Vec<Policy>,

    /// Run every known policy.
    #[clap(short = 'a', long, action = clap::ArgAction::SetTrue, conflicts_with = "policies")]
    all: bool,

    /// JSON workload file with "cores" and "tasks". Overrides the
    /// generated workload.
    #[clap(short = 'w', long, value_name = "PATH")]
    workload: Option<PathBuf>,

    /// Number of tasks in the generated workload.
    #[clap(short = 'n', long, default_value = "100")]
    nr_tasks: u32,

    /// Generate a random workload from this seed instead of the reference
    /// one.
    #[clap(short = 's', long, env = "BURSTSIM_SEED")]
    seed: Option<u64>,

    /// Core speeds of the generated workload, fastest or slowest in any
    /// order.
    #[clap(long, value_delimiter = ',', default_value = "2,1")]
    speeds: Vec<u64>,

    /// Latest arrival tick of a random workload.
    #[clap(long, default_value = "25")]
    max_arrival: u64,

    /// Largest burst of a random workload.
    #[clap(long, default_value = "10")]
    max_burst: u64,

    /// JSON policy config. Switches are overridden per policy; the tuning
    /// constants apply to every run.
    #[clap(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Round-robin quantum in ticks.
    #[clap(short = 'q', long)]
    quantum: Option<u64>,

    /// Print the per-core Gantt timeline of each run.
    #[clap(short = 't', long, action = clap::ArgAction::SetTrue)]
    timeline: bool,

    /// Print per-core statistics and policy counters.
    #[clap(short = 'd', long, action = clap::ArgAction::SetTrue)]
    detail: bool,

    /// Enable verbose output. Specify multiple times to increase
    /// verbosity. RUST_LOG takes precedence.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn load_scenario(opts: &Opts) -> Result<Scenario> {
    if let Some(path) = &opts.workload {
        return Scenario::from_file(path)
            .with_context(|| format!("Failed to load workload {}", path.display()));
    }
    let scenario = match opts.seed {
        Some(seed) => workloads::random(
            seed,
            &opts.speeds,
            opts.nr_tasks,
            opts.max_arrival,
            opts.max_burst,
        ),
        None => Scenario::builder()
            .cores(&opts.speeds)
            .tasks(workloads::reference_tasks(opts.nr_tasks))
            .build(),
    };
    scenario.context("Failed to generate workload")
}

fn load_config(opts: &Opts) -> Result<PolicyConfig> {
    let mut config = match &opts.config {
        Some(path) => PolicyConfig::from_file(path)
            .with_context(|| format!("Failed to load policy config {}", path.display()))?,
        None => PolicyConfig::default(),
    };
    if let Some(quantum) = opts.quantum {
        config.quantum = quantum;
    }
    config.validate().context("Invalid policy config")?;
    Ok(config)
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_tracing(opts.verbose);

    let scenario = load_scenario(&opts)?;
    let base = load_config(&opts)?;

    let policies: Vec<Policy> = if opts.all {
        Policy::ALL.to_vec()
    } else if opts.policies.is_empty() {
        Policy::DEFAULT_SET.to_vec()
    } else {
        opts.policies.clone()
    };

    info!(
        tasks = scenario.tasks.len(),
        cores = scenario.cores.len(),
        "loaded workload"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for policy in policies {
        let experiment = Experiment::preset(policy, &base);
        let report = run_experiment(&scenario, &experiment)
            .with_context(|| format!("Experiment {:?} failed", experiment.title))?;
        report.format(&mut out, opts.detail, opts.timeline)?;
    }
    out.flush()?;
    Ok(())
}
