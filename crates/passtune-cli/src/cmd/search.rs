use crate::reports;
use clap::{Args, ValueEnum};
use passtune_core::archive::{FitnessArchive, StatsArchive};
use passtune_core::candidate::ScoredCandidate;
use passtune_core::catalog::PassCatalog;
use passtune_core::config::Config;
use passtune_core::error::PtResult;
use passtune_core::pipeline::{DummyFitnessFunction, FitnessFunction, RuntimeFitnessFunction};
use passtune_core::problem::Problem;
use passtune_core::progress::ProgressLog;
use passtune_core::search::{
    run_to_completion, CellularGa, SearchEngine, SimulatedAnnealing, StopAfterEvaluations,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Simulated annealing
    Sa,
    /// Cellular genetic algorithm
    Ga,
}

impl Algorithm {
    fn slug(self) -> &'static str {
        match self {
            Algorithm::Sa => "sa",
            Algorithm::Ga => "ga",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub config: Config,

    #[arg(short, long, value_enum, default_value_t = Algorithm::Sa)]
    pub algorithm: Algorithm,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    /// Resume from a fitness archive written by a previous run
    #[arg(long)]
    pub fitness_archive: Option<String>,

    /// Custom catalog file, one pass name per line
    #[arg(long)]
    pub catalog: Option<String>,

    #[arg(short, long, default_value = "data")]
    pub output_dir: String,

    /// Score candidates with the dummy fitness instead of the real pipeline
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

/// Everything needed to reproduce or audit a run, dumped next to its result.
#[derive(Serialize)]
struct RunRecord<'a> {
    timestamp: &'a str,
    algorithm: &'a str,
    seed: Option<u64>,
    dry_run: bool,
    catalog_size: usize,
    catalog_fingerprint: &'a str,
    evaluations: usize,
    best_fitness: f64,
    config: &'a Config,
}

pub fn run(args: SearchArgs) -> PtResult<()> {
    args.config.validate(!args.dry_run)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let slug = args.algorithm.slug();
    info!("🚀 Starting '{}' search ({})", slug, timestamp);

    let catalog = Arc::new(match &args.catalog {
        Some(path) => PassCatalog::from_file(path)?,
        None => PassCatalog::default_llvm(),
    });
    let fingerprint = catalog.fingerprint(args.config.search.sequence_length);
    let out = Path::new(&args.output_dir);

    let archive = match &args.fitness_archive {
        Some(path) => FitnessArchive::load(path, &fingerprint)?,
        None => FitnessArchive::create(
            out.join("fitness")
                .join(format!("fitness_archive-{}.json", timestamp)),
            &fingerprint,
        )?,
    };

    let fitness = build_fitness(&args, &catalog, out, &timestamp)?;
    info!("⚖️  Scoring with: {}", fitness.name());

    let mut problem = Problem::new(
        catalog.clone(),
        args.config.search.sequence_length,
        fitness,
        archive,
    );

    let rng = match args.seed {
        Some(s) => fastrand::Rng::with_seed(s),
        None => fastrand::Rng::new(),
    };

    let s = &args.config.search;
    let termination = Box::new(StopAfterEvaluations::new(s.max_evaluations));
    let (result, evaluations) = match args.algorithm {
        Algorithm::Sa => {
            let progress = ProgressLog::create(
                out.join("progress")
                    .join(format!("progress_sa-{}.txt", timestamp)),
            )?;
            let mut engine = SimulatedAnnealing::new(
                &mut problem,
                s.mutation_probability,
                s.initial_temperature,
                s.minimum_temperature,
                s.cooling_rate,
                termination,
                progress,
                rng,
            );
            let result = run_to_completion(&mut engine)?;
            (result, engine.evaluations())
        }
        Algorithm::Ga => {
            let progress = ProgressLog::create(
                out.join("progress")
                    .join(format!("ga_progress-{}.txt", timestamp)),
            )?;
            let mut engine = CellularGa::new(
                &mut problem,
                s.grid_rows,
                s.grid_cols,
                s.mutation_probability,
                s.crossover_probability,
                termination,
                progress,
                rng,
            );
            let result = run_to_completion(&mut engine)?;
            (result, engine.evaluations())
        }
    };

    info!("🏁 Finished after {} evaluations", evaluations);
    info!("🏆 Best fitness: {}", result.fitness);
    info!("   Sequence: {}", result.candidate);

    write_result_file(out, slug, &timestamp, &catalog, &result)?;

    let record = RunRecord {
        timestamp: &timestamp,
        algorithm: slug,
        seed: args.seed,
        dry_run: args.dry_run,
        catalog_size: catalog.len(),
        catalog_fingerprint: &fingerprint,
        evaluations,
        best_fitness: result.fitness,
        config: &args.config,
    };
    let record_path = out.join(format!("config_{}_{}.json", slug, timestamp));
    fs::write(&record_path, serde_json::to_string_pretty(&record)?)?;
    info!("📝 Run record: {}", record_path.display());

    reports::print_run_summary(slug, evaluations, problem.archive().len(), &result);
    Ok(())
}

fn build_fitness(
    args: &SearchArgs,
    catalog: &Arc<PassCatalog>,
    out: &Path,
    timestamp: &str,
) -> PtResult<Box<dyn FitnessFunction>> {
    if args.dry_run {
        return Ok(Box::new(DummyFitnessFunction::new(
            Duration::ZERO,
            (0.0, 100.0),
            args.seed,
        )));
    }

    let p = &args.config.pipeline;
    let stats = StatsArchive::create(
        out.join("fitness")
            .join("stats")
            .join(format!("fitness_stats-{}.json", timestamp)),
    )?;

    Ok(Box::new(
        RuntimeFitnessFunction::builder()
            .catalog(catalog.clone())
            .source_path(PathBuf::from(&p.source_path))
            .benchmark_repo(PathBuf::from(&p.benchmark_repo))
            .benchmark(p.benchmark.clone())
            .statistic(p.statistic.clone())
            .transform_timeout(Duration::from_secs_f64(p.transform_timeout_secs))
            .build_timeout(Duration::from_secs_f64(p.build_timeout_secs))
            .benchmark_timeout(Duration::from_secs_f64(p.benchmark_timeout_secs))
            .stats(stats)
            .runs(p.benchmark_runs)
            .attempts(p.benchmark_attempts)
            .opt_binary(p.opt_binary.clone())
            .clang_binary(p.clang_binary.clone())
            .build(),
    ))
}

fn write_result_file(
    out: &Path,
    slug: &str,
    timestamp: &str,
    catalog: &PassCatalog,
    result: &ScoredCandidate,
) -> PtResult<()> {
    let pass_names: Vec<&str> = result
        .candidate
        .genes()
        .iter()
        .filter_map(|&g| catalog.name(g as usize))
        .filter(|n| !n.is_empty())
        .collect();

    let content = format!(
        "Solution: {}\nFitness: {}\nPasses: {}\n",
        result.candidate,
        result.fitness,
        pass_names.join(" ")
    );

    let path = out.join(format!("result_{}_{}.txt", slug, timestamp));
    fs::write(&path, content)?;
    info!("💾 Result: {}", path.display());
    Ok(())
}
