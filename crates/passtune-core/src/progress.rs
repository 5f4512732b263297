use crate::candidate::ScoredCandidate;
use crate::error::PtResult;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only progress log, one block per iteration (annealing) or epoch
/// (cellular GA). External plotting tooling parses the `## ITERATION n ##` /
/// `## EPOCH n ##` markers and the `Fitness:` label on each value line, so
/// the format here is load-bearing and must not drift.
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn create<P: AsRef<Path>>(path: P) -> PtResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_iteration(&self, iteration: usize, solution: &ScoredCandidate) -> PtResult<()> {
        let mut f = self.open()?;
        writeln!(f, "## ITERATION {} ##", iteration)?;
        writeln!(f, "SOLUTION:")?;
        writeln!(f, "\tSolution: {}", solution.candidate)?;
        writeln!(f, "\tFitness: {}", solution.fitness)?;
        writeln!(f)?;
        Ok(())
    }

    pub fn record_epoch(
        &self,
        epoch: usize,
        population: &[ScoredCandidate],
        best: &ScoredCandidate,
    ) -> PtResult<()> {
        let mut f = self.open()?;
        writeln!(f, "## EPOCH {} ##", epoch)?;
        writeln!(f, "Population: ")?;
        for member in population {
            writeln!(f, "\tSolution: {}", member.candidate)?;
            writeln!(f, "\tFitness: {}", member.fitness)?;
        }
        writeln!(f, "BEST SOLUTION:")?;
        writeln!(f, "\tSolution: {}", best.candidate)?;
        writeln!(f, "\tFitness: {}", best.fitness)?;
        Ok(())
    }

    fn open(&self) -> PtResult<std::fs::File> {
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?)
    }
}
