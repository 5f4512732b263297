mod common;

use common::{make_problem, small_catalog, ConstantFitness, SumFitness};
use passtune_core::progress::ProgressLog;
use passtune_core::search::{run_to_completion, CellularGa, SearchEngine, StopAfterEvaluations};
use regex::Regex;

fn make_engine<'p>(
    problem: &'p mut passtune_core::problem::Problem,
    dir: &std::path::Path,
    budget: usize,
    seed: u64,
) -> CellularGa<'p> {
    let progress = ProgressLog::create(dir.join("ga_progress.txt")).unwrap();
    CellularGa::new(
        problem,
        3,
        3,
        0.1,
        1.0,
        Box::new(StopAfterEvaluations::new(budget)),
        progress,
        fastrand::Rng::with_seed(seed),
    )
}

#[test]
fn initialization_fills_every_grid_cell() {
    let dir = tempfile::tempdir().unwrap();
    let mut problem = make_problem(dir.path(), small_catalog(), 5, Box::new(SumFitness));
    let mut engine = make_engine(&mut problem, dir.path(), 100, 1);

    engine.initialize().unwrap();
    assert_eq!(engine.population().len(), 9);
    assert_eq!(engine.evaluations(), 9);
    assert_eq!(engine.epoch(), 0);
    assert_eq!(engine.cursor(), 0);
}

#[test]
fn epoch_increments_after_exactly_one_full_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let mut problem = make_problem(dir.path(), small_catalog(), 5, Box::new(SumFitness));
    let mut engine = make_engine(&mut problem, dir.path(), 1000, 1);

    engine.initialize().unwrap();
    for i in 0..9 {
        assert_eq!(engine.epoch(), 0, "epoch advanced early at step {}", i);
        engine.step().unwrap();
    }
    assert_eq!(engine.epoch(), 1);
    assert_eq!(engine.cursor(), 0);
    assert_eq!(engine.evaluations(), 18);

    for _ in 0..9 {
        engine.step().unwrap();
    }
    assert_eq!(engine.epoch(), 2);
}

#[test]
fn tied_offspring_never_replaces_the_incumbent() {
    let dir = tempfile::tempdir().unwrap();
    // Every candidate scores the same, so every offspring ties its cell.
    let mut problem = make_problem(dir.path(), small_catalog(), 5, Box::new(ConstantFitness(7.0)));
    let mut engine = make_engine(&mut problem, dir.path(), 1000, 2);

    engine.initialize().unwrap();
    let before: Vec<_> = engine
        .population()
        .iter()
        .map(|s| s.candidate.clone())
        .collect();

    for _ in 0..9 {
        engine.step().unwrap();
    }

    let after: Vec<_> = engine
        .population()
        .iter()
        .map(|s| s.candidate.clone())
        .collect();
    assert_eq!(before, after, "a tie must leave the cell unchanged");
}

#[test]
fn result_is_the_population_minimum() {
    let dir = tempfile::tempdir().unwrap();
    let mut problem = make_problem(dir.path(), small_catalog(), 5, Box::new(SumFitness));
    let mut engine = make_engine(&mut problem, dir.path(), 36, 5);

    let result = run_to_completion(&mut engine).unwrap();
    let min = engine
        .population()
        .iter()
        .map(|s| s.fitness)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(result.fitness, min);
}

#[test]
fn search_improves_on_the_initial_population() {
    let dir = tempfile::tempdir().unwrap();
    let mut problem = make_problem(dir.path(), small_catalog(), 5, Box::new(SumFitness));

    let rng = fastrand::Rng::with_seed(9);
    let mut probe = rng.clone();
    let initial_best = (0..9)
        .map(|_| {
            let c = problem.sample(&mut probe);
            c.genes().iter().map(|&g| g as f64).sum::<f64>()
        })
        .fold(f64::INFINITY, f64::min);

    let progress = ProgressLog::create(dir.path().join("ga_progress.txt")).unwrap();
    let mut engine = CellularGa::new(
        &mut problem,
        3,
        3,
        0.1,
        1.0,
        Box::new(StopAfterEvaluations::new(100)),
        progress,
        rng,
    );
    let result = run_to_completion(&mut engine).unwrap();

    assert!(
        result.fitness <= initial_best,
        "best {} regressed past the initial population's best {}",
        result.fitness,
        initial_best
    );
}

#[test]
fn progress_log_has_one_block_per_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let mut problem = make_problem(dir.path(), small_catalog(), 5, Box::new(SumFitness));
    // 9 initial evaluations + 21 steps: two full sweeps and a partial third.
    let mut engine = make_engine(&mut problem, dir.path(), 30, 4);
    run_to_completion(&mut engine).unwrap();

    let content = std::fs::read_to_string(dir.path().join("ga_progress.txt")).unwrap();
    let marker = Regex::new(r"## EPOCH (\d+) ##").unwrap();
    let epochs: Vec<usize> = marker
        .captures_iter(&content)
        .map(|c| c[1].parse().unwrap())
        .collect();

    // Epoch 0 at initialization, then one block per completed sweep.
    assert_eq!(epochs, vec![0, 1, 2]);
    assert!(content.contains("BEST SOLUTION:"));
    // Each epoch block lists the full population plus the best: 10 fitness
    // lines per block.
    assert_eq!(content.matches("Fitness:").count(), 30);
}
