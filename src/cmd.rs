//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;

use crate::atpg::run_atpg;
use crate::circuit::Circuit;
use crate::config::{Config, ParallelMode};
use crate::io::{read_network_file, read_vector_file, write_results};
use crate::sim::BatchedFaultSimulator;

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Command line arguments
#[derive(Subcommand)]
pub enum Commands {
    /// Test pattern generation for a logic network
    ///
    /// Generates a test vector for every signal/stuck-at fault pair using
    /// PODEM, and reports which faults were detected.
    #[clap()]
    Atpg(AtpgArgs),

    /// Run the batched fault simulator against a set of test vectors
    ///
    /// Reports, for every vector in the input file, which of the netlist's
    /// stuck-at faults it detects.
    #[clap(alias = "sim")]
    Simulate(SimulateArgs),
}

/// Command arguments for test pattern generation
#[derive(Args)]
pub struct AtpgArgs {
    /// Netlist to generate test patterns for (.bench format)
    network: PathBuf,

    /// Output file for the per-fault result report
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Which PODEM search variant to run
    #[arg(long, default_value = "serial")]
    parallel_mode: String,

    /// Size of the worker pool used for PODEM task parallelism
    #[arg(long, default_value_t = 1)]
    max_threads: usize,

    /// Cap on concurrently runnable PODEM tasks before degrading to serial
    #[arg(long, default_value_t = 0)]
    max_active_tasks: usize,

    /// Fan-out cap for the across-objectives variant
    #[arg(long, default_value_t = 1)]
    max_parallel_objectives: usize,
}

impl AtpgArgs {
    fn config(&self) -> Config {
        let parallel_mode = match ParallelMode::parse(&self.parallel_mode) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        };
        Config {
            max_threads: self.max_threads,
            max_active_tasks: self.max_active_tasks,
            max_parallel_objectives: self.max_parallel_objectives,
            parallel_mode,
        }
    }

    pub fn run(&self) {
        let config = self.config();
        if let Err(e) = config.validate() {
            eprintln!("{e}");
            std::process::exit(1);
        }
        let pool = match config.build_thread_pool() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        };

        let circuit = match read_network_file(&self.network) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        };
        let topo = std::sync::Arc::new(circuit);

        let report = pool.install(|| run_atpg(topo, &config));
        info!(
            "atpg: {} faults, {} detected, max task high-water {}, {:.3}s total",
            report.records.len(),
            report.records.iter().filter(|r| r.detected).count(),
            report.max_task_high_water,
            report.total_seconds
        );

        let out = match std::fs::File::create(&self.output) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("{}: {e}", self.output.display());
                std::process::exit(1);
            }
        };
        let mut out = std::io::BufWriter::new(out);
        if let Err(e) = write_results(&mut out, &report.records, report.total_seconds) {
            eprintln!("{}: {e}", self.output.display());
            std::process::exit(1);
        }
    }
}

/// Command arguments for fault simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Netlist to simulate (.bench format)
    network: PathBuf,

    /// Input test-vector file
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Output file for the per-vector fault detection report
    #[arg(short = 'o', long)]
    output: PathBuf,
}

impl SimulateArgs {
    pub fn run(&self) {
        let circuit = match read_network_file(&self.network) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        };
        let vectors = match read_vector_file(&self.input, &circuit) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        };

        let sim = BatchedFaultSimulator::new(&circuit);
        let detected = sim.run(&vectors);

        let out = match std::fs::File::create(&self.output) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("{}: {e}", self.output.display());
                std::process::exit(1);
            }
        };
        let mut out = std::io::BufWriter::new(out);
        if let Err(e) = write_detection_matrix(&mut out, &circuit, &detected) {
            eprintln!("{}: {e}", self.output.display());
            std::process::exit(1);
        }
    }
}

fn write_detection_matrix<W: std::io::Write>(
    w: &mut W,
    circuit: &Circuit,
    detected: &[Vec<bool>],
) -> std::io::Result<()> {
    for (vi, row) in detected.iter().enumerate() {
        for f in 0..row.len() {
            if row[f] {
                let s = crate::signal::SignalId::new(f / 2);
                let stuck_at = f % 2;
                writeln!(w, "{vi},{},{stuck_at}", circuit.name(s))?;
            }
        }
    }
    Ok(())
}
