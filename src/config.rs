//! Run configuration: worker pool sizing and the PODEM parallel mode
//! (spec §6, "Configuration surface").

use std::fmt;

/// Which PODEM search variant to run (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelMode {
    /// The plain recursive search (C4), no task spawning.
    Serial,
    /// At each decision, explore `(pi, v)` and `(pi, !v)` concurrently.
    AcrossDecisions,
    /// At the D-frontier step, pursue multiple objectives concurrently.
    AcrossObjectives,
}

impl ParallelMode {
    /// Parse a configuration value (case-insensitive), used at the CLI
    /// boundary and by file-based configuration.
    pub fn parse(s: &str) -> Result<ParallelMode, String> {
        match s.to_ascii_lowercase().as_str() {
            "serial" => Ok(ParallelMode::Serial),
            "across-decisions" | "decisions" => Ok(ParallelMode::AcrossDecisions),
            "across-objectives" | "objectives" => Ok(ParallelMode::AcrossObjectives),
            other => Err(format!(
                "unknown parallel mode {other:?}, expected one of: serial, across-decisions, across-objectives"
            )),
        }
    }
}

impl fmt::Display for ParallelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParallelMode::Serial => "serial",
            ParallelMode::AcrossDecisions => "across-decisions",
            ParallelMode::AcrossObjectives => "across-objectives",
        };
        write!(f, "{s}")
    }
}

/// Options affecting the PODEM search and fault simulator (spec §6).
#[derive(Debug, Clone)]
pub struct Config {
    /// Size of the worker pool used for PODEM task parallelism.
    pub max_threads: usize,
    /// Cap on concurrently runnable PODEM tasks before degrading to serial.
    pub max_active_tasks: usize,
    /// Fan-out cap for the across-objectives variant.
    pub max_parallel_objectives: usize,
    /// Which search variant to run.
    pub parallel_mode: ParallelMode,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max_threads: 1,
            max_active_tasks: 0,
            max_parallel_objectives: 1,
            parallel_mode: ParallelMode::Serial,
        }
    }
}

impl Config {
    /// Validate the configuration, matching spec §7's "configuration
    /// errors" category.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_threads == 0 {
            return Err("max_threads must be at least 1".to_string());
        }
        if self.parallel_mode == ParallelMode::AcrossObjectives && self.max_parallel_objectives == 0 {
            return Err("max_parallel_objectives must be at least 1 in across-objectives mode".to_string());
        }
        Ok(())
    }

    /// Build the global rayon thread pool implied by `max_threads`. Called
    /// once at process start; a no-op in tests that build a `Config`
    /// directly without driving the CLI.
    pub fn build_thread_pool(&self) -> Result<rayon::ThreadPool, String> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_threads)
            .build()
            .map_err(|e| format!("failed to build thread pool: {e}"))
    }
}
