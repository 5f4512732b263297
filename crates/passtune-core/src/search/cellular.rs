use crate::candidate::ScoredCandidate;
use crate::error::PtResult;
use crate::problem::Problem;
use crate::progress::ProgressLog;
use crate::search::operators::{crossover_single, mutate_in_place};
use crate::search::{SearchEngine, TerminationCriterion};
use tracing::info;

/// Cellular genetic algorithm on a toroidal R x C grid. One cell is
/// processed per step: two parents are tournament-picked from the cell's
/// plus-shaped neighborhood (self included), mated into a single offspring,
/// mutated, evaluated, and written back iff strictly better.
///
/// Replacement is synchronous steady-state: an improved cell is immediately
/// visible to neighbors processed later in the same epoch, which propagates
/// improvements faster than a generational scheme would. That ordering is
/// part of the algorithm, not an implementation accident.
pub struct CellularGa<'p> {
    problem: &'p mut Problem,
    rows: usize,
    cols: usize,
    mutation_probability: f64,
    crossover_probability: f64,
    termination: Box<dyn TerminationCriterion>,
    progress: ProgressLog,
    rng: fastrand::Rng,
    population: Vec<ScoredCandidate>,
    cursor: usize,
    epoch: usize,
    evaluations: usize,
}

/// The four orthogonal neighbors of `cell` on a toroidal grid, wrapping on
/// every edge.
pub fn plus_neighbors(cell: usize, rows: usize, cols: usize) -> [usize; 4] {
    let row = cell / cols;
    let col = cell % cols;
    [
        ((row + rows - 1) % rows) * cols + col,
        ((row + 1) % rows) * cols + col,
        row * cols + (col + cols - 1) % cols,
        row * cols + (col + 1) % cols,
    ]
}

/// Binary tournament over `pool` (positions into `population`): two
/// contestants drawn without replacement, lower fitness wins, ties decided
/// by a coin flip. Returns the winner's position within `pool`.
fn binary_tournament(
    population: &[ScoredCandidate],
    pool: &[usize],
    rng: &mut fastrand::Rng,
) -> usize {
    if pool.len() == 1 {
        return 0;
    }
    let a = rng.usize(0..pool.len());
    let mut b = rng.usize(0..pool.len());
    while b == a {
        b = rng.usize(0..pool.len());
    }

    let fa = population[pool[a]].fitness;
    let fb = population[pool[b]].fitness;
    if fa < fb {
        a
    } else if fb < fa {
        b
    } else if rng.bool() {
        a
    } else {
        b
    }
}

impl<'p> CellularGa<'p> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        problem: &'p mut Problem,
        rows: usize,
        cols: usize,
        mutation_probability: f64,
        crossover_probability: f64,
        termination: Box<dyn TerminationCriterion>,
        progress: ProgressLog,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            problem,
            rows,
            cols,
            mutation_probability,
            crossover_probability,
            termination,
            progress,
            rng,
            population: Vec::new(),
            cursor: 0,
            epoch: 0,
            evaluations: 0,
        }
    }

    pub fn population(&self) -> &[ScoredCandidate] {
        &self.population
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn best(&self) -> Option<&ScoredCandidate> {
        self.population
            .iter()
            .min_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    /// Tournament-pick two distinct parents from the cursor cell's
    /// neighborhood plus the cell itself. The first winner leaves the pool
    /// before the second tournament.
    fn select_parents(&mut self) -> (usize, usize) {
        let mut pool: Vec<usize> =
            plus_neighbors(self.cursor, self.rows, self.cols).to_vec();
        pool.push(self.cursor);

        let first = binary_tournament(&self.population, &pool, &mut self.rng);
        let p1 = pool.remove(first);
        let second = binary_tournament(&self.population, &pool, &mut self.rng);
        let p2 = pool[second];
        (p1, p2)
    }
}

impl SearchEngine for CellularGa<'_> {
    fn initialize(&mut self) -> PtResult<()> {
        let size = self.rows * self.cols;
        self.population.clear();
        self.population.reserve(size);
        for _ in 0..size {
            let candidate = self.problem.sample(&mut self.rng);
            self.population.push(self.problem.evaluate(candidate)?);
        }
        self.cursor = 0;
        self.epoch = 0;
        self.evaluations = size;

        if let Some(best) = self.best().cloned() {
            info!("Initial population best fitness: {}", best.fitness);
            self.progress.record_epoch(self.epoch, &self.population, &best)?;
        }
        Ok(())
    }

    fn step(&mut self) -> PtResult<()> {
        if self.population.is_empty() {
            return self.initialize();
        }

        let (i1, i2) = self.select_parents();
        let p1 = self.population[i1].candidate.clone();
        let p2 = self.population[i2].candidate.clone();

        let mut offspring = crossover_single(&p1, &p2, self.crossover_probability, &mut self.rng);
        mutate_in_place(
            &mut offspring,
            self.problem.catalog().len(),
            self.mutation_probability,
            &mut self.rng,
        );
        let scored = self.problem.evaluate(offspring)?;

        // Strictly better only; an equal offspring never displaces the
        // incumbent.
        if scored.fitness < self.population[self.cursor].fitness {
            self.population[self.cursor] = scored;
        }

        self.evaluations += 1;
        self.cursor = (self.cursor + 1) % self.population.len();
        if self.cursor == 0 {
            self.epoch += 1;
            if let Some(best) = self.best().cloned() {
                self.progress.record_epoch(self.epoch, &self.population, &best)?;
            }
        }
        Ok(())
    }

    fn is_terminated(&self) -> bool {
        self.termination.is_met(self.evaluations)
    }

    fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn result(&self) -> Option<ScoredCandidate> {
        self.best().cloned()
    }

    fn name(&self) -> &'static str {
        "Cellular Genetic Algorithm"
    }
}
