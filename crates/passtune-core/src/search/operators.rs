use crate::candidate::{Candidate, PassIndex};
use fastrand::Rng;

/// Per-position mutation: each gene is independently reset to a uniform
/// random catalog index with the given probability.
pub fn mutate_in_place(
    candidate: &mut Candidate,
    catalog_size: usize,
    probability: f64,
    rng: &mut Rng,
) {
    let upper = catalog_size as PassIndex;
    for gene in candidate.genes_mut() {
        if rng.f64() < probability {
            *gene = rng.u16(0..upper);
        }
    }
}

/// Recombine two parents into exactly ONE offspring: with `probability`,
/// each gene is picked uniformly from either parent; otherwise the offspring
/// is a clone of the first parent. One offspring, not two — the cellular
/// step replaces at most one cell.
pub fn crossover_single(p1: &Candidate, p2: &Candidate, probability: f64, rng: &mut Rng) -> Candidate {
    if rng.f64() >= probability {
        return p1.clone();
    }

    let genes = p1
        .genes()
        .iter()
        .zip(p2.genes())
        .map(|(&a, &b)| if rng.bool() { a } else { b })
        .collect();
    Candidate::new(genes)
}
