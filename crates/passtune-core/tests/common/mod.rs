#![allow(dead_code)]

use passtune_core::archive::FitnessArchive;
use passtune_core::candidate::PassIndex;
use passtune_core::catalog::PassCatalog;
use passtune_core::pipeline::FitnessFunction;
use passtune_core::problem::Problem;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Deterministic fitness: the sum of all pass indices. Useful because the
/// global optimum (all zeros) and the ordering of candidates are obvious.
pub struct SumFitness;

impl FitnessFunction for SumFitness {
    fn calculate(&mut self, genes: &[PassIndex]) -> f64 {
        genes.iter().map(|&g| g as f64).sum()
    }

    fn name(&self) -> String {
        "Sum Fitness".to_string()
    }
}

/// Constant fitness; every candidate ties with every other.
pub struct ConstantFitness(pub f64);

impl FitnessFunction for ConstantFitness {
    fn calculate(&mut self, _genes: &[PassIndex]) -> f64 {
        self.0
    }

    fn name(&self) -> String {
        "Constant Fitness".to_string()
    }
}

/// Counts how often the underlying "pipeline" actually runs, so tests can
/// prove that archive hits short-circuit it.
pub struct CountingFitness {
    pub calls: Arc<AtomicUsize>,
    pub value: f64,
}

impl CountingFitness {
    pub fn new(value: f64) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                value,
            },
            calls,
        )
    }
}

impl FitnessFunction for CountingFitness {
    fn calculate(&mut self, _genes: &[PassIndex]) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.value
    }

    fn name(&self) -> String {
        "Counting Fitness".to_string()
    }
}

/// A ten-pass catalog with synthetic names, small enough to reason about.
pub fn small_catalog() -> Arc<PassCatalog> {
    Arc::new(PassCatalog::new((0..10).map(|i| format!("pass-{}", i)).collect()).unwrap())
}

pub fn make_problem(
    dir: &Path,
    catalog: Arc<PassCatalog>,
    sequence_length: usize,
    fitness: Box<dyn FitnessFunction>,
) -> Problem {
    let archive = FitnessArchive::create(
        dir.join("fitness_archive.json"),
        &catalog.fingerprint(sequence_length),
    )
    .unwrap();
    Problem::new(catalog, sequence_length, fitness, archive)
}
