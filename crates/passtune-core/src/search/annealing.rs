use crate::candidate::ScoredCandidate;
use crate::error::PtResult;
use crate::problem::Problem;
use crate::progress::ProgressLog;
use crate::search::operators::mutate_in_place;
use crate::search::{SearchEngine, TerminationCriterion};
use tracing::info;

/// Single-trajectory simulated annealing: one current solution, a
/// geometrically decaying temperature, Metropolis acceptance.
///
/// The result is the *current* solution at termination, not a separately
/// tracked best-ever — a deliberate behavioral choice carried over from the
/// trajectory this implementation preserves (see DESIGN.md).
pub struct SimulatedAnnealing<'p> {
    problem: &'p mut Problem,
    mutation_probability: f64,
    temperature: f64,
    minimum_temperature: f64,
    alpha: f64,
    termination: Box<dyn TerminationCriterion>,
    progress: ProgressLog,
    rng: fastrand::Rng,
    evaluations: usize,
    current: Option<ScoredCandidate>,
}

impl<'p> SimulatedAnnealing<'p> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        problem: &'p mut Problem,
        mutation_probability: f64,
        initial_temperature: f64,
        minimum_temperature: f64,
        alpha: f64,
        termination: Box<dyn TerminationCriterion>,
        progress: ProgressLog,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            problem,
            mutation_probability,
            temperature: initial_temperature,
            minimum_temperature,
            alpha,
            termination,
            progress,
            rng,
            evaluations: 0,
            current: None,
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Probability of accepting `proposal` over `current`. Strictly better
    /// proposals (and ties, since exp(0) = 1) are certain; worse ones decay
    /// exponentially with the gap, floored at `minimum_temperature` so the
    /// ratio stays finite as the schedule cools toward zero.
    pub fn acceptance_probability(&self, current: f64, proposal: f64) -> f64 {
        if proposal < current {
            1.0
        } else {
            let t = self.temperature.max(self.minimum_temperature);
            (-(proposal - current) / t).exp()
        }
    }
}

impl SearchEngine for SimulatedAnnealing<'_> {
    fn initialize(&mut self) -> PtResult<()> {
        let initial = self.problem.sample(&mut self.rng);
        let scored = self.problem.evaluate(initial)?;
        info!("Initial solution fitness: {}", scored.fitness);

        self.evaluations = 0;
        self.progress.record_iteration(self.evaluations, &scored)?;
        self.current = Some(scored);
        Ok(())
    }

    fn step(&mut self) -> PtResult<()> {
        let current = match &self.current {
            Some(c) => c.clone(),
            None => return self.initialize(),
        };

        let mut proposal = current.candidate.clone();
        mutate_in_place(
            &mut proposal,
            self.problem.catalog().len(),
            self.mutation_probability,
            &mut self.rng,
        );
        let scored = self.problem.evaluate(proposal)?;

        let probability = self.acceptance_probability(current.fitness, scored.fitness);
        if self.rng.f64() < probability {
            self.current = Some(scored);
        }

        // Cool every iteration, accepted or not.
        self.temperature *= self.alpha;

        self.evaluations += 1;
        if let Some(c) = &self.current {
            self.progress.record_iteration(self.evaluations, c)?;
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
        self.current.clone()
    }

    fn name(&self) -> &'static str {
        "Simulated Annealing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::FitnessArchive;
    use crate::catalog::PassCatalog;
    use crate::pipeline::DummyFitnessFunction;
    use crate::search::StopAfterEvaluations;
    use std::sync::Arc;
    use std::time::Duration;

    fn make_problem(dir: &std::path::Path) -> Problem {
        let catalog = Arc::new(PassCatalog::default_llvm());
        let archive = FitnessArchive::create(dir.join("archive.json"), &catalog.fingerprint(5))
            .unwrap();
        let dummy = DummyFitnessFunction::new(Duration::ZERO, (0.0, 100.0), Some(5));
        Problem::new(catalog, 5, Box::new(dummy), archive)
    }

    #[test]
    fn better_and_equal_proposals_are_certain() {
        let dir = tempfile::tempdir().unwrap();
        let mut problem = make_problem(dir.path());
        let engine = SimulatedAnnealing::new(
            &mut problem,
            0.1,
            1.0,
            1e-6,
            0.95,
            Box::new(StopAfterEvaluations::new(1)),
            ProgressLog::create(dir.path().join("p.txt")).unwrap(),
            fastrand::Rng::with_seed(1),
        );
        assert_eq!(engine.acceptance_probability(10.0, 5.0), 1.0);
        assert_eq!(engine.acceptance_probability(10.0, 10.0), 1.0);
    }

    #[test]
    fn floor_temperature_controls_worse_proposals() {
        let dir = tempfile::tempdir().unwrap();
        let mut problem = make_problem(dir.path());
        let mut engine = SimulatedAnnealing::new(
            &mut problem,
            0.1,
            1.0,
            1e-6,
            0.95,
            Box::new(StopAfterEvaluations::new(1)),
            ProgressLog::create(dir.path().join("p.txt")).unwrap(),
            fastrand::Rng::with_seed(1),
        );
        // Force the schedule to (below) the floor; the floor must win.
        engine.temperature = 0.0;
        let expected = (-(12.0 - 10.0) / 1e-6_f64).exp();
        assert_eq!(engine.acceptance_probability(10.0, 12.0), expected);
    }

    #[test]
    fn floored_probability_is_the_boltzmann_factor() {
        let dir = tempfile::tempdir().unwrap();
        let mut problem = make_problem(dir.path());
        // A floor large enough that the factor does not underflow.
        let mut engine = SimulatedAnnealing::new(
            &mut problem,
            0.1,
            1.0,
            0.5,
            0.95,
            Box::new(StopAfterEvaluations::new(1)),
            ProgressLog::create(dir.path().join("p.txt")).unwrap(),
            fastrand::Rng::with_seed(1),
        );
        engine.temperature = 0.1;
        let p = engine.acceptance_probability(10.0, 12.0);
        assert!((p - (-4.0_f64).exp()).abs() < 1e-12);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn cooling_is_unconditional_and_geometric() {
        let dir = tempfile::tempdir().unwrap();
        let mut problem = make_problem(dir.path());
        let mut engine = SimulatedAnnealing::new(
            &mut problem,
            0.1,
            1.0,
            1e-6,
            0.95,
            Box::new(StopAfterEvaluations::new(3)),
            ProgressLog::create(dir.path().join("p.txt")).unwrap(),
            fastrand::Rng::with_seed(1),
        );
        engine.initialize().unwrap();
        assert_eq!(engine.temperature(), 1.0);
        engine.step().unwrap();
        engine.step().unwrap();
        engine.step().unwrap();
        let expected = 0.95_f64.powi(3);
        assert!((engine.temperature() - expected).abs() < 1e-12);
    }
}
