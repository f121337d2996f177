//! Construction heuristics producing an initial closed tour.

use crate::error::{SolverError, SolverResult};
use crate::instance::TSPInstance;
use crate::solution::Solution;
use rand::prelude::*;

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &TSPInstance) -> SolverResult<Solution>;
    fn name(&self) -> &str;
}

/// Nearest Neighbor Heuristic
///
/// Starts at the depot and repeatedly moves to the closest unvisited stop,
/// never using a forbidden (+inf) edge. Ties go to the lowest node index.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborHeuristic;

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic
    }

    fn find_nearest(&self, instance: &TSPInstance, current: usize, visited: &[bool]) -> Option<usize> {
        let mut nearest = None;
        let mut min_dist = f64::INFINITY;
        for node in 1..instance.dimension() {
            if visited[node] {
                continue;
            }
            let dist = instance.distance(current, node);
            if dist.is_finite() && dist < min_dist {
                min_dist = dist;
                nearest = Some(node);
            }
        }
        nearest
    }

    /// Build the tour only, without wrapping it in a [`Solution`].
    pub fn build_tour(&self, instance: &TSPInstance) -> SolverResult<Vec<usize>> {
        let n = instance.dimension();
        let mut tour = Vec::with_capacity(n + 1);
        let mut visited = vec![false; n];
        tour.push(0);
        visited[0] = true;

        let mut current = 0;
        for _ in 1..n {
            match self.find_nearest(instance, current, &visited) {
                Some(next) => {
                    tour.push(next);
                    visited[next] = true;
                    current = next;
                }
                None => {
                    let unvisited: Vec<usize> = (1..n).filter(|&i| !visited[i]).collect();
                    log::debug!(
                        "Nearest neighbor stuck at node {} with {} stops left",
                        current,
                        unvisited.len()
                    );
                    return Err(SolverError::DisconnectedGraph {
                        from: current,
                        unvisited,
                    });
                }
            }
        }

        tour.push(0);
        Ok(tour)
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, instance: &TSPInstance) -> SolverResult<Solution> {
        let start = std::time::Instant::now();
        let tour = self.build_tour(instance)?;
        let mut solution = Solution::from_tour(instance, tour, self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

/// Uniformly random closed tour `[0, shuffled 1..dimension, 0]`.
pub fn random_tour<R: Rng + ?Sized>(dimension: usize, rng: &mut R) -> Vec<usize> {
    let mut middle: Vec<usize> = (1..dimension).collect();
    middle.shuffle(rng);

    let mut tour = Vec::with_capacity(dimension + 1);
    tour.push(0);
    tour.extend(middle);
    tour.push(0);
    tour
}
