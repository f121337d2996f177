//! Local search improvement heuristics.
//!
//! - 2-opt (segment reversal, first improvement)
//! - 3-opt restricted to a single reconnection pattern

use crate::error::SolverResult;
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use crate::instance::{Matrix, TSPInstance};
use crate::solution::Solution;

/// Trait for local search improvement methods
pub trait LocalSearch {
    fn improve(&self, instance: &TSPInstance, solution: &mut Solution) -> bool;
    fn name(&self) -> &str;
}

/// 2-Opt Local Search
///
/// Scans position pairs `(i, j)` and reverses `tour[i..j]` as soon as
/// replacing edges `(i-1, i)` and `(j-1, j)` by `(i-1, j-1)` and `(i, j)` is
/// strictly cheaper, then keeps scanning. Stops after a pass with no move.
///
/// On an asymmetric matrix the reversed segment's internal edges are part of
/// the comparison, so a move is applied only if the whole tour gets shorter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoOptSearch;

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch
    }

    /// Improve `tour` in place; returns the number of applied moves.
    pub fn optimize_tour(&self, matrix: &Matrix, tour: &mut [usize]) -> usize {
        let len = tour.len();
        if len < 4 {
            return 0;
        }
        let symmetric = matrix.is_symmetric(0.0);

        let mut moves = 0;
        let mut passes = 0;
        let mut improved = true;
        while improved {
            improved = false;
            passes += 1;
            for i in 1..len - 2 {
                for j in i + 2..len {
                    let mut current =
                        matrix.get(tour[i - 1], tour[i]) + matrix.get(tour[j - 1], tour[j]);
                    let mut candidate =
                        matrix.get(tour[i - 1], tour[j - 1]) + matrix.get(tour[i], tour[j]);
                    if !symmetric {
                        current += matrix.path_cost(&tour[i..j]);
                        candidate += reversed_path_cost(matrix, &tour[i..j]);
                    }

                    if candidate < current {
                        tour[i..j].reverse();
                        moves += 1;
                        improved = true;
                    }
                }
            }
        }

        log::debug!("2-opt converged after {} passes, {} moves", passes, moves);
        moves
    }
}

fn reversed_path_cost(matrix: &Matrix, segment: &[usize]) -> f64 {
    segment.windows(2).map(|w| matrix.get(w[1], w[0])).sum()
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, instance: &TSPInstance, solution: &mut Solution) -> bool {
        let moves = self.optimize_tour(&instance.distance_matrix, &mut solution.tour);
        solution.validate(instance);
        solution.iterations = Some(moves);
        moves > 0
    }

    fn name(&self) -> &str {
        "2-Opt"
    }
}

/// 3-Opt Local Search (single reconnection)
///
/// For cut positions `i < j < k` the boundary nodes are
/// `A = t[i-1], B = t[i], C = t[j-1], D = t[j], E = t[k-1], F = t[k]`.
/// A triple is taken when `d(A,D) + d(E,B) + d(C,F)` is strictly below
/// `d(A,B) + d(C,D) + d(E,F)`; the tour is then rebuilt as
/// `t[..i] + t[j..k] + reverse(t[i..j]) + t[k..]` and the scan restarts.
/// The other six 3-opt reconnections are never tried.
#[derive(Debug, Clone, Copy)]
pub struct ThreeOptSearch {
    /// Upper bound on applied moves before giving up on convergence
    pub max_restarts: usize,
}

impl ThreeOptSearch {
    pub fn new() -> Self {
        ThreeOptSearch {
            max_restarts: 100_000,
        }
    }

    pub fn with_max_restarts(max_restarts: usize) -> Self {
        ThreeOptSearch { max_restarts }
    }

    /// Nearest neighbor tour improved by 3-opt.
    pub fn solve(&self, instance: &TSPInstance) -> SolverResult<Solution> {
        let start = std::time::Instant::now();
        let mut solution = NearestNeighborHeuristic::new().construct(instance)?;
        self.improve(instance, &mut solution);
        solution.algorithm = self.name().to_string();
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }

    /// First improving triple in scan order, if any.
    fn find_move(&self, matrix: &Matrix, tour: &[usize]) -> Option<(usize, usize, usize)> {
        let len = tour.len();
        for i in 1..len - 4 {
            for j in i + 2..len - 2 {
                for k in j + 2..len - 1 {
                    let (a, b) = (tour[i - 1], tour[i]);
                    let (c, d) = (tour[j - 1], tour[j]);
                    let (e, f) = (tour[k - 1], tour[k]);

                    let removed = matrix.get(a, b) + matrix.get(c, d) + matrix.get(e, f);
                    let added = matrix.get(a, d) + matrix.get(e, b) + matrix.get(c, f);
                    if added < removed {
                        return Some((i, j, k));
                    }
                }
            }
        }
        None
    }

    /// Improve `tour`; returns the number of applied moves.
    pub fn optimize_tour(&self, matrix: &Matrix, tour: &mut Vec<usize>) -> usize {
        if tour.len() < 6 {
            return 0;
        }

        let mut moves = 0;
        while let Some((i, j, k)) = self.find_move(matrix, tour) {
            if moves >= self.max_restarts {
                log::warn!(
                    "3-opt stopped after {} moves without converging",
                    self.max_restarts
                );
                break;
            }
            let mut rebuilt = Vec::with_capacity(tour.len());
            rebuilt.extend_from_slice(&tour[..i]);
            rebuilt.extend_from_slice(&tour[j..k]);
            rebuilt.extend(tour[i..j].iter().rev());
            rebuilt.extend_from_slice(&tour[k..]);
            *tour = rebuilt;
            moves += 1;
        }

        log::debug!("3-opt applied {} moves", moves);
        moves
    }
}

impl Default for ThreeOptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for ThreeOptSearch {
    fn improve(&self, instance: &TSPInstance, solution: &mut Solution) -> bool {
        let moves = self.optimize_tour(&instance.distance_matrix, &mut solution.tour);
        solution.validate(instance);
        solution.iterations = Some(moves);
        moves > 0
    }

    fn name(&self) -> &str {
        "3-Opt"
    }
}
