use crate::archive::StatsArchive;
use crate::candidate::{Candidate, PassIndex, WORST_FITNESS};
use crate::catalog::PassCatalog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{info, warn};
use typed_builder::TypedBuilder;
use walkdir::WalkDir;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Scores one candidate. Implementations must be total: any internal
/// failure resolves to [`WORST_FITNESS`], never an error or a panic, so the
/// search layer can stay failure-agnostic.
pub trait FitnessFunction {
    fn calculate(&mut self, genes: &[PassIndex]) -> f64;
    fn name(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Transform,
    Build,
    Benchmark,
}

/// Outcome of one external stage: exit success, merged stdout+stderr, and
/// wall-clock duration of the last attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub success: bool,
    pub output: String,
    pub duration_secs: f64,
}

impl StageReport {
    fn failed(output: String, started: Instant) -> Self {
        Self {
            success: false,
            output,
            duration_secs: started.elapsed().as_secs_f64(),
        }
    }

    fn skipped() -> Self {
        Self {
            success: false,
            output: "stage not reached".to_string(),
            duration_secs: 0.0,
        }
    }
}

/// Per-stage diagnostics for one evaluation, kept in the stats archive for
/// postmortem analysis. Failed evaluations are recorded too; the search only
/// ever sees the sentinel fitness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationStats {
    pub transform: StageReport,
    pub build: StageReport,
    pub benchmark: StageReport,
}

/// The real evaluation pipeline: copy the source tree, run `opt` once with
/// the whole batched pass sequence, compile with `clang++`, run the
/// benchmark K times (each run retried up to R attempts), and extract the
/// worst observed value of the configured statistic.
///
/// Passes are applied in a single batched invocation because they interact;
/// applying them one by one is not equivalent and not supported here.
#[derive(TypedBuilder)]
pub struct RuntimeFitnessFunction {
    catalog: Arc<PassCatalog>,
    source_path: PathBuf,
    benchmark_repo: PathBuf,
    benchmark: String,
    statistic: String,
    transform_timeout: Duration,
    build_timeout: Duration,
    /// Timeout for one benchmark run, not the whole stage.
    benchmark_timeout: Duration,
    stats: StatsArchive,
    #[builder(default = 5)]
    runs: usize,
    #[builder(default = 3)]
    attempts: usize,
    #[builder(default = String::from("opt"))]
    opt_binary: String,
    #[builder(default = String::from("clang++"))]
    clang_binary: String,
    #[builder(default = String::from("program.bc"))]
    raw_bitcode: String,
    #[builder(default = String::from("program_opt.bc"))]
    optimized_bitcode: String,
    #[builder(default = String::from("program_opt.out"))]
    binary_name: String,
    #[builder(default = String::from("execution"))]
    result_prefix: String,
}

impl FitnessFunction for RuntimeFitnessFunction {
    fn calculate(&mut self, genes: &[PassIndex]) -> f64 {
        let key = Candidate::new(genes.to_vec()).canonical_key();
        let (fitness, stats) = self.run_pipeline(genes);
        self.stats.record(&key, stats);
        fitness
    }

    fn name(&self) -> String {
        "Runtime Fitness Function".to_string()
    }
}

impl RuntimeFitnessFunction {
    fn run_pipeline(&self, genes: &[PassIndex]) -> (f64, EvaluationStats) {
        if let Err(e) = self.copy_original_source() {
            warn!("Failed to materialize private working copy: {}", e);
            let stats = EvaluationStats {
                transform: StageReport {
                    success: false,
                    output: format!("working copy failed: {}", e),
                    duration_secs: 0.0,
                },
                build: StageReport::skipped(),
                benchmark: StageReport::skipped(),
            };
            return (WORST_FITNESS, stats);
        }

        let transform = self.apply_passes(genes);
        if !transform.success {
            // A bad pass sequence will not succeed on retry; final for this
            // candidate.
            warn!("{} stage failed ({:.1}s)", Stage::Transform, transform.duration_secs);
            let stats = EvaluationStats {
                transform,
                build: StageReport::skipped(),
                benchmark: StageReport::skipped(),
            };
            return (WORST_FITNESS, stats);
        }

        let build = self.compile();
        if !build.success {
            warn!("{} stage failed ({:.1}s)", Stage::Build, build.duration_secs);
            let stats = EvaluationStats {
                transform,
                build,
                benchmark: StageReport::skipped(),
            };
            return (WORST_FITNESS, stats);
        }

        let benchmark = self.run_benchmark();
        if !benchmark.success {
            warn!("{} stage failed ({:.1}s)", Stage::Benchmark, benchmark.duration_secs);
            let stats = EvaluationStats {
                transform,
                build,
                benchmark,
            };
            return (WORST_FITNESS, stats);
        }

        let stats = EvaluationStats {
            transform,
            build,
            benchmark,
        };

        match self.worst_statistic() {
            Some(value) => (value, stats),
            None => {
                warn!("No readable benchmark result contained '{}'", self.statistic);
                (WORST_FITNESS, stats)
            }
        }
    }

    fn work_copy(&self) -> PathBuf {
        let mut os = self.source_path.as_os_str().to_os_string();
        os.push("_evaluation");
        PathBuf::from(os)
    }

    /// Each evaluation works on its own copy of the source tree; the shared
    /// original is never mutated. A stale copy from a previous run is
    /// deleted first.
    fn copy_original_source(&self) -> std::io::Result<()> {
        let dest = self.work_copy();
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        for entry in WalkDir::new(&self.source_path) {
            let entry = entry.map_err(std::io::Error::other)?;
            let rel = entry
                .path()
                .strip_prefix(&self.source_path)
                .map_err(std::io::Error::other)?;
            let target = dest.join(rel);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    fn apply_passes(&self, genes: &[PassIndex]) -> StageReport {
        let start = Instant::now();
        let work = self.work_copy();

        let mut names = Vec::with_capacity(genes.len());
        for &g in genes {
            match self.catalog.name(g as usize) {
                // The empty catalog entry is a no-op slot; it simply drops
                // out of the batched invocation.
                Some("") => {}
                Some(name) => names.push(name),
                None => {
                    return StageReport::failed(
                        format!("pass index {} outside catalog of {}", g, self.catalog.len()),
                        start,
                    );
                }
            }
        }

        let passes_arg = format!("-passes={}", names.join(","));
        info!("Applying {} passes in one batch", names.len());

        let args = vec![
            passes_arg,
            work.join(&self.raw_bitcode).display().to_string(),
            "-o".to_string(),
            work.join(&self.optimized_bitcode).display().to_string(),
        ];

        run_once(
            &self.opt_binary,
            &args,
            None,
            &work.join("transform.log"),
            self.transform_timeout,
        )
    }

    fn compile(&self) -> StageReport {
        let work = self.work_copy();
        let args = vec![
            "-o".to_string(),
            work.join(&self.binary_name).display().to_string(),
            "-O0".to_string(),
            "-fuse-ld=lld".to_string(),
            "-flto=thin".to_string(),
            "-static-libgcc".to_string(),
            "-static-libstdc++".to_string(),
            "-s".to_string(),
            work.join(&self.optimized_bitcode).display().to_string(),
            "-lzstd".to_string(),
            "-lpcre2-32".to_string(),
            "-lrt".to_string(),
            "-lpthread".to_string(),
            "-ldl".to_string(),
            "-l:libatomic.a".to_string(),
        ];

        run_once(
            &self.clang_binary,
            &args,
            None,
            &work.join("build.log"),
            self.build_timeout,
        )
    }

    fn run_benchmark(&self) -> StageReport {
        let start = Instant::now();
        // The binary and result paths must survive the cwd change into the
        // benchmark repository.
        let work = match fs::canonicalize(self.work_copy()) {
            Ok(p) => p,
            Err(e) => return StageReport::failed(format!("working copy vanished: {}", e), start),
        };
        let binary = work.join(&self.binary_name).display().to_string();

        let mut report = StageReport::skipped();
        for run in 1..=self.runs {
            let json_path = work.join(format!("{}_{}.json", self.result_prefix, run));
            let args = vec![
                "--".to_string(),
                "--run-benchmarks".to_string(),
                format!("--include-benchmarks={}", self.benchmark),
                format!("--save-json={}", json_path.display()),
            ];

            report = run_with_attempts(
                &binary,
                &args,
                Some(&self.benchmark_repo),
                &work.join(format!("{}_{}.log", self.result_prefix, run)),
                self.benchmark_timeout,
                self.attempts,
            );

            if !report.success {
                break;
            }
        }
        report
    }

    fn worst_statistic(&self) -> Option<f64> {
        let work = self.work_copy();
        let paths: Vec<PathBuf> = (1..=self.runs)
            .map(|i| work.join(format!("{}_{}.json", self.result_prefix, i)))
            .collect();
        extract_worst_statistic(&paths, &self.statistic)
    }
}

/// Pull `benchmarks[0].results.<statistic>` from every result document and
/// return the maximum: the optimization target is worst-case latency, so the
/// tail matters more than the mean. Unreadable files are skipped with a
/// warning; only an empty harvest is a failure.
pub fn extract_worst_statistic(paths: &[PathBuf], statistic: &str) -> Option<f64> {
    let mut worst: Option<f64> = None;
    for path in paths {
        let value = fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
            .and_then(|doc| doc["benchmarks"][0]["results"][statistic].as_f64());
        match value {
            Some(v) => {
                if worst.map_or(true, |w| v > w) {
                    worst = Some(v);
                }
            }
            None => warn!("Skipping unreadable benchmark result '{}'", path.display()),
        }
    }
    worst
}

fn run_with_attempts(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    capture: &Path,
    timeout: Duration,
    attempts: usize,
) -> StageReport {
    let mut report = StageReport::skipped();
    for attempt in 1..=attempts.max(1) {
        report = run_once(program, args, cwd, capture, timeout);
        if report.success {
            break;
        }
        if attempt < attempts {
            warn!("Attempt {}/{} of '{}' failed; retrying", attempt, attempts, program);
        }
    }
    report
}

/// Spawn one external process with stdout and stderr merged into a capture
/// file, enforce the timeout, and fold every failure mode (non-zero exit,
/// timeout, spawn error) into the same unsuccessful report.
fn run_once(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    capture: &Path,
    timeout: Duration,
) -> StageReport {
    let start = Instant::now();

    let out_file = match fs::File::create(capture) {
        Ok(f) => f,
        Err(e) => return StageReport::failed(format!("failed to open capture file: {}", e), start),
    };
    let err_file = match out_file.try_clone() {
        Ok(f) => f,
        Err(e) => return StageReport::failed(format!("failed to clone capture file: {}", e), start),
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(out_file))
        .stderr(Stdio::from(err_file));
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            return StageReport::failed(format!("failed to spawn '{}': {}", program, e), start)
        }
    };

    let mut timed_out = false;
    let success = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.success(),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    timed_out = true;
                    let _ = child.kill();
                    let _ = child.wait();
                    break false;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                warn!("Lost track of child '{}': {}", program, e);
                let _ = child.kill();
                let _ = child.wait();
                break false;
            }
        }
    };

    let mut output = fs::read_to_string(capture).unwrap_or_default();
    if timed_out {
        output.push_str(&format!("\n[killed after {:.1}s timeout]", timeout.as_secs_f64()));
    }

    StageReport {
        success,
        output,
        duration_secs: start.elapsed().as_secs_f64(),
    }
}

/// Stand-in fitness for wiring tests and dry runs: a seeded random value in
/// a configurable range, with an optional artificial delay to mimic the real
/// pipeline's latency.
pub struct DummyFitnessFunction {
    delay: Duration,
    range: (f64, f64),
    rng: fastrand::Rng,
}

impl DummyFitnessFunction {
    pub fn new(delay: Duration, range: (f64, f64), seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => fastrand::Rng::with_seed(s),
            None => fastrand::Rng::new(),
        };
        Self { delay, range, rng }
    }
}

impl Default for DummyFitnessFunction {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), (0.0, 100.0), None)
    }
}

impl FitnessFunction for DummyFitnessFunction {
    fn calculate(&mut self, _genes: &[PassIndex]) -> f64 {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.range.0 + self.rng.f64() * (self.range.1 - self.range.0)
    }

    fn name(&self) -> String {
        "Dummy Fitness Function".to_string()
    }
}
