use crate::archive::FitnessArchive;
use crate::candidate::{Candidate, PassIndex, ScoredCandidate};
use crate::catalog::PassCatalog;
use crate::error::PtResult;
use crate::pipeline::FitnessFunction;
use std::sync::Arc;
use tracing::debug;

/// The optimization problem: bounds `[0, P-1]^N` over the pass catalog, a
/// fitness function, and the memoizing archive in front of it. Objective
/// direction is minimize.
pub struct Problem {
    catalog: Arc<PassCatalog>,
    sequence_length: usize,
    fitness: Box<dyn FitnessFunction>,
    archive: FitnessArchive,
}

impl Problem {
    pub fn new(
        catalog: Arc<PassCatalog>,
        sequence_length: usize,
        fitness: Box<dyn FitnessFunction>,
        archive: FitnessArchive,
    ) -> Self {
        Self {
            catalog,
            sequence_length,
            fitness,
            archive,
        }
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn catalog(&self) -> &Arc<PassCatalog> {
        &self.catalog
    }

    pub fn archive(&self) -> &FitnessArchive {
        &self.archive
    }

    /// Uniform random candidate within bounds.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Candidate {
        let upper = self.catalog.len() as PassIndex;
        Candidate::new((0..self.sequence_length).map(|_| rng.u16(0..upper)).collect())
    }

    /// Score a candidate. A fitness-archive hit short-circuits all external
    /// work — this is the primary cost control, since one pipeline run can
    /// take minutes. On a miss the new entry is flushed to disk before
    /// returning; a flush failure aborts the run.
    pub fn evaluate(&mut self, candidate: Candidate) -> PtResult<ScoredCandidate> {
        let key = candidate.canonical_key();

        if let Some(fitness) = self.archive.get(&key) {
            debug!("Archive hit for {}", key);
            return Ok(ScoredCandidate { candidate, fitness });
        }

        let fitness = self.fitness.calculate(candidate.genes());
        self.archive.record(&key, fitness)?;

        Ok(ScoredCandidate { candidate, fitness })
    }
}
