use crate::error::{PassTuneError, PtResult};
use clap::Args;
use serde::{Deserialize, Serialize};

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[command(flatten)]
    pub search: SearchParams,
    #[command(flatten)]
    pub pipeline: PipelineParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Number of passes in every candidate sequence.
    #[arg(long, default_value_t = 30)]
    pub sequence_length: usize,

    /// Stop after this many evaluations (cache hits included).
    #[arg(long, default_value_t = 27)]
    pub max_evaluations: usize,

    /// Per-position probability of resetting a gene during mutation.
    #[arg(long, default_value_t = 0.1)]
    pub mutation_probability: f64,

    /// Probability that mating recombines both parents instead of cloning
    /// the first one.
    #[arg(long, default_value_t = 1.0)]
    pub crossover_probability: f64,

    // Annealing schedule
    #[arg(long, default_value_t = 1.0)]
    pub initial_temperature: f64,
    #[arg(long, default_value_t = 1e-6)]
    pub minimum_temperature: f64,
    #[arg(long, default_value_t = 0.95)]
    pub cooling_rate: f64,

    // Cellular grid shape
    #[arg(long, default_value_t = 3)]
    pub grid_rows: usize,
    #[arg(long, default_value_t = 3)]
    pub grid_cols: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            sequence_length: 30,
            max_evaluations: 27,
            mutation_probability: 0.1,
            crossover_probability: 1.0,
            initial_temperature: 1.0,
            minimum_temperature: 1e-6,
            cooling_rate: 0.95,
            grid_rows: 3,
            grid_cols: 3,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Directory holding the raw bitcode; never mutated, copied per
    /// evaluation.
    #[arg(long, default_value = "data/source")]
    pub source_path: String,

    /// Working directory for benchmark runs (the benchmark harness expects
    /// to be launched from its own repository root).
    #[arg(long, default_value = "data/benchmarks")]
    pub benchmark_repo: String,

    /// Benchmark name filter passed to the built binary.
    #[arg(long, default_value = "")]
    pub benchmark: String,

    /// Statistic to extract from each result document.
    #[arg(long, default_value = "")]
    pub statistic: String,

    #[arg(long, default_value_t = 300.0)]
    pub transform_timeout_secs: f64,
    #[arg(long, default_value_t = 900.0)]
    pub build_timeout_secs: f64,
    /// Timeout for one benchmark run, not for the whole stage.
    #[arg(long, default_value_t = 60.0)]
    pub benchmark_timeout_secs: f64,

    /// How many benchmark runs feed the worst-case statistic.
    #[arg(long, default_value_t = 5)]
    pub benchmark_runs: usize,

    /// Attempts per benchmark run before the stage is declared failed.
    /// Retrying covers benchmark flakiness, not compiler determinism.
    #[arg(long, default_value_t = 3)]
    pub benchmark_attempts: usize,

    #[arg(long, default_value = "opt")]
    pub opt_binary: String,
    #[arg(long, default_value = "clang++")]
    pub clang_binary: String,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            source_path: "data/source".to_string(),
            benchmark_repo: "data/benchmarks".to_string(),
            benchmark: String::new(),
            statistic: String::new(),
            transform_timeout_secs: 300.0,
            build_timeout_secs: 900.0,
            benchmark_timeout_secs: 60.0,
            benchmark_runs: 5,
            benchmark_attempts: 3,
            opt_binary: "opt".to_string(),
            clang_binary: "clang++".to_string(),
        }
    }
}

impl Config {
    /// Cross-field checks shared by every entry point. Pipeline fields are
    /// only validated when the run will actually spawn the pipeline.
    pub fn validate(&self, uses_pipeline: bool) -> PtResult<()> {
        let s = &self.search;

        if s.sequence_length == 0 {
            return Err(PassTuneError::Config(
                "sequence_length must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&s.mutation_probability) {
            return Err(PassTuneError::Config(format!(
                "mutation_probability {} outside [0, 1]",
                s.mutation_probability
            )));
        }
        if !(0.0..=1.0).contains(&s.crossover_probability) {
            return Err(PassTuneError::Config(format!(
                "crossover_probability {} outside [0, 1]",
                s.crossover_probability
            )));
        }
        if s.grid_rows == 0 || s.grid_cols == 0 {
            return Err(PassTuneError::Config(
                "grid_rows and grid_cols must be at least 1".into(),
            ));
        }
        if s.cooling_rate <= 0.0 || s.cooling_rate >= 1.0 {
            return Err(PassTuneError::Config(format!(
                "cooling_rate {} outside (0, 1)",
                s.cooling_rate
            )));
        }

        if uses_pipeline {
            let p = &self.pipeline;
            if p.benchmark.is_empty() {
                return Err(PassTuneError::Config(
                    "a benchmark name is required (--benchmark)".into(),
                ));
            }
            if p.statistic.is_empty() {
                return Err(PassTuneError::Config(
                    "a result statistic is required (--statistic)".into(),
                ));
            }
            if p.benchmark_runs == 0 || p.benchmark_attempts == 0 {
                return Err(PassTuneError::Config(
                    "benchmark_runs and benchmark_attempts must be at least 1".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_without_pipeline() {
        Config::default().validate(false).unwrap();
    }

    #[test]
    fn defaults_reject_pipeline_without_benchmark() {
        assert!(Config::default().validate(true).is_err());
    }

    #[test]
    fn rejects_zero_length_sequences() {
        let mut cfg = Config::default();
        cfg.search.sequence_length = 0;
        assert!(cfg.validate(false).is_err());
    }

    #[test]
    fn rejects_bad_cooling_rate() {
        let mut cfg = Config::default();
        cfg.search.cooling_rate = 1.0;
        assert!(cfg.validate(false).is_err());
    }
}
