//! A* search over `(current node, visited set)` states.
//!
//! The heuristic is the weight of a minimum spanning tree over the
//! unvisited nodes (Prim), each pair weighted by the cheaper of its two
//! directions. Any directed path through those nodes contains such a tree,
//! and the bound ignores the edge from the current node into it and the
//! closing edge back to the depot, so it never overestimates. States live in
//! an arena and point to their parent by index.

use crate::error::{SolverError, SolverResult};
use crate::heuristics::annealing::{AnnealingConfig, SimulatedAnnealing};
use crate::instance::{Matrix, TSPInstance};
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use rand::Rng;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Hard ceiling on the exact search size (`N * 2^N` dominance table).
pub const MAX_SUPPORTED_NODES: usize = 16;

#[derive(Debug, Clone, Copy)]
struct SearchState {
    node: usize,
    visited: u32,
    g: f64,
    parent: Option<usize>,
}

/// Weight of the MST spanning every node not in `visited_mask`, with
/// `min(d(u, v), d(v, u))` as the weight of pair `{u, v}`.
///
/// Zero when fewer than two nodes are unvisited.
pub fn mst_heuristic(visited_mask: u32, matrix: &Matrix) -> f64 {
    let unvisited: Vec<usize> = (0..matrix.size())
        .filter(|&i| visited_mask & (1 << i) == 0)
        .collect();
    if unvisited.len() < 2 {
        return 0.0;
    }

    let mut in_tree = vec![false; matrix.size()];
    let mut min_edge = vec![f64::INFINITY; matrix.size()];
    min_edge[unvisited[0]] = 0.0;

    let mut weight = 0.0;
    for _ in 0..unvisited.len() {
        let mut u = None;
        let mut min = f64::INFINITY;
        for &v in &unvisited {
            if !in_tree[v] && min_edge[v] < min {
                min = min_edge[v];
                u = Some(v);
            }
        }
        // Remaining nodes only reachable through forbidden edges.
        let Some(u) = u else { break };

        in_tree[u] = true;
        weight += min;
        for &v in &unvisited {
            let weight_uv = matrix.get(u, v).min(matrix.get(v, u));
            if !in_tree[v] && weight_uv < min_edge[v] {
                min_edge[v] = weight_uv;
            }
        }
    }
    weight
}

/// Exact A* solver for small instances
///
/// Above `max_nodes` the instance is handed to [`SimulatedAnnealing`].
#[derive(Debug, Clone, Copy)]
pub struct AStarSolver {
    pub max_nodes: usize,
    /// Schedule used when falling back to annealing
    pub annealing: AnnealingConfig,
}

impl Default for AStarSolver {
    fn default() -> Self {
        AStarSolver {
            max_nodes: 15,
            annealing: AnnealingConfig::default(),
        }
    }
}

impl AStarSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nodes(max_nodes: usize) -> Self {
        AStarSolver {
            max_nodes,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        "A*"
    }

    /// Whether `instance` is small enough for the exact search.
    pub fn applies_to(&self, instance: &TSPInstance) -> bool {
        instance.dimension() <= self.max_nodes.min(MAX_SUPPORTED_NODES)
    }

    pub fn solve<R: Rng + ?Sized>(&self, instance: &TSPInstance, rng: &mut R) -> SolverResult<Solution> {
        if !self.applies_to(instance) {
            log::warn!(
                "{} nodes is above the exact limit of {}, using simulated annealing",
                instance.dimension(),
                self.max_nodes.min(MAX_SUPPORTED_NODES)
            );
            return SimulatedAnnealing::with_config(self.annealing).solve(instance, rng);
        }

        let start = std::time::Instant::now();
        let (tour, expansions) = self.search(instance)?;
        let mut solution = Solution::from_tour(instance, tour, self.name());
        solution.iterations = Some(expansions);
        solution.computation_time = start.elapsed().as_secs_f64();
        log::debug!(
            "A* expanded {} states, optimal distance {:.2}",
            expansions,
            solution.distance
        );
        Ok(solution)
    }

    fn search(&self, instance: &TSPInstance) -> SolverResult<(Vec<usize>, usize)> {
        let matrix = &instance.distance_matrix;
        let n = matrix.size();
        let full: u32 = (1u32 << n) - 1;
        let slot = |node: usize, visited: u32| visited as usize * n + node;

        let mut arena: Vec<SearchState> = Vec::new();
        let mut best_g = vec![f64::INFINITY; n << n];
        let mut open = BinaryHeap::new();

        arena.push(SearchState {
            node: 0,
            visited: 1,
            g: 0.0,
            parent: None,
        });
        best_g[slot(0, 1)] = 0.0;
        open.push(Reverse((OrderedFloat(mst_heuristic(1, matrix)), 0usize)));

        let mut expansions = 0;
        while let Some(Reverse((_, id))) = open.pop() {
            let state = arena[id];
            if state.g > best_g[slot(state.node, state.visited)] {
                continue;
            }
            expansions += 1;

            if state.visited == full {
                if state.node == 0 {
                    return Ok((reconstruct(&arena, id), expansions));
                }
                // Every stop is visited: the only move left is back to the depot.
                let g = state.g + matrix.get(state.node, 0);
                if g < best_g[slot(0, full)] {
                    best_g[slot(0, full)] = g;
                    arena.push(SearchState {
                        node: 0,
                        visited: full,
                        g,
                        parent: Some(id),
                    });
                    open.push(Reverse((OrderedFloat(g), arena.len() - 1)));
                }
                continue;
            }

            for next in 1..n {
                if state.visited & (1 << next) != 0 {
                    continue;
                }
                let g = state.g + matrix.get(state.node, next);
                let visited = state.visited | (1 << next);
                if !(g < best_g[slot(next, visited)]) {
                    continue;
                }
                best_g[slot(next, visited)] = g;
                let h = mst_heuristic(visited, matrix);
                arena.push(SearchState {
                    node: next,
                    visited,
                    g,
                    parent: Some(id),
                });
                open.push(Reverse((OrderedFloat(g + h), arena.len() - 1)));
            }
        }

        if matrix.forbidden_edges() > 0 {
            return Err(SolverError::DisconnectedGraph {
                from: 0,
                unvisited: (1..n).collect(),
            });
        }
        panic!(
            "A* exhausted its queue on a finite {}-node matrix without reaching the goal",
            n
        );
    }
}

fn reconstruct(arena: &[SearchState], goal: usize) -> Vec<usize> {
    let mut tour = Vec::new();
    let mut cursor = Some(goal);
    while let Some(id) = cursor {
        tour.push(arena[id].node);
        cursor = arena[id].parent;
    }
    tour.reverse();
    tour
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::is_valid_tour;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn instance(rows: Vec<Vec<f64>>) -> TSPInstance {
        TSPInstance::new("test", Matrix::from_rows(rows).unwrap()).unwrap()
    }

    fn unit_square() -> TSPInstance {
        // Corners in cyclic order 0-1-2-3; diagonals 0-2 and 1-3.
        let d = 2.5;
        instance(vec![
            vec![0.0, 1.0, d, 1.0],
            vec![1.0, 0.0, 1.0, d],
            vec![d, 1.0, 0.0, 1.0],
            vec![1.0, d, 1.0, 0.0],
        ])
    }

    fn random_symmetric(n: usize, seed: u64) -> TSPInstance {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut m = Matrix::new(n);
        for i in 0..n {
            for j in i + 1..n {
                let v: f64 = rng.gen_range(1.0..100.0);
                m.set(i, j, v);
                m.set(j, i, v);
            }
        }
        TSPInstance::new("random", m).unwrap()
    }

    fn random_asymmetric(n: usize, seed: u64) -> TSPInstance {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut m = Matrix::new(n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    m.set(i, j, rng.gen_range(1..=100) as f64);
                }
            }
        }
        TSPInstance::new("asymmetric", m).unwrap()
    }

    fn brute_force(instance: &TSPInstance) -> f64 {
        fn permute(rest: &mut Vec<usize>, prefix: &mut Vec<usize>, inst: &TSPInstance, best: &mut f64) {
            if rest.is_empty() {
                let mut tour = prefix.clone();
                tour.push(0);
                *best = best.min(inst.tour_length(&tour));
                return;
            }
            for k in 0..rest.len() {
                let node = rest.remove(k);
                prefix.push(node);
                permute(rest, prefix, inst, best);
                prefix.pop();
                rest.insert(k, node);
            }
        }
        let mut best = f64::INFINITY;
        let mut rest: Vec<usize> = (1..instance.dimension()).collect();
        permute(&mut rest, &mut vec![0], instance, &mut best);
        best
    }

    #[test]
    fn test_unit_square_perimeter() {
        let inst = unit_square();
        let solution = AStarSolver::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();

        assert_eq!(solution.distance, 4.0);
        assert!(is_valid_tour(&solution.tour, 4));
        assert!(solution.tour.windows(2).all(|w| inst.distance(w[0], w[1]) == 1.0));
    }

    #[test]
    fn test_mst_heuristic_edge_cases() {
        let inst = unit_square();
        let m = &inst.distance_matrix;
        assert_eq!(mst_heuristic(0b1111, m), 0.0);
        // Only node 2 unvisited: no edges in a one-node tree even though
        // reaching node 2 still costs at least 1.
        assert_eq!(mst_heuristic(0b1011, m), 0.0);
        // Nodes 1, 2, 3 unvisited: path 1-2-3.
        assert_eq!(mst_heuristic(0b0001, m), 2.0);
        assert_eq!(mst_heuristic(0b0000, m), 3.0);
    }

    #[test]
    fn test_three_node_example() {
        let inst = instance(vec![
            vec![0.0, 10.0, 15.0],
            vec![10.0, 0.0, 20.0],
            vec![15.0, 20.0, 0.0],
        ]);
        let solution = AStarSolver::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        assert_eq!(solution.distance, 45.0);
    }

    #[test]
    fn test_matches_brute_force() {
        for seed in 0..4 {
            let inst = random_symmetric(7, seed);
            let solution = AStarSolver::new()
                .solve(&inst, &mut ChaCha8Rng::seed_from_u64(seed))
                .unwrap();
            assert!(is_valid_tour(&solution.tour, 7));
            assert!((solution.distance - brute_force(&inst)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_matches_brute_force_asymmetric() {
        for seed in 0..200 {
            let inst = random_asymmetric(6, seed);
            let solution = AStarSolver::new()
                .solve(&inst, &mut ChaCha8Rng::seed_from_u64(seed))
                .unwrap();
            assert!(is_valid_tour(&solution.tour, 6));
            assert_eq!(solution.distance, brute_force(&inst), "seed {}", seed);
        }
    }

    #[test]
    fn test_mst_uses_cheaper_direction() {
        // 1 -> 2 is expensive but 2 -> 1 is cheap.
        let inst = instance(vec![
            vec![0.0, 5.0, 5.0],
            vec![5.0, 0.0, 50.0],
            vec![5.0, 2.0, 0.0],
        ]);
        assert_eq!(mst_heuristic(0b001, &inst.distance_matrix), 2.0);
    }

    #[test]
    fn test_never_worse_than_annealing() {
        for seed in 0..3 {
            let inst = random_symmetric(9, seed);
            let exact = AStarSolver::new()
                .solve(&inst, &mut ChaCha8Rng::seed_from_u64(seed))
                .unwrap();
            let sa = SimulatedAnnealing::new()
                .solve(&inst, &mut ChaCha8Rng::seed_from_u64(seed))
                .unwrap();
            assert!(exact.distance <= sa.distance + 1e-9);
        }
    }

    #[test]
    fn test_large_instance_falls_back_to_annealing() {
        let inst = random_symmetric(6, 5);
        let solver = AStarSolver::with_max_nodes(4);
        assert!(!solver.applies_to(&inst));

        let fallback = solver.solve(&inst, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let sa = SimulatedAnnealing::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        assert_eq!(fallback.tour, sa.tour);
        assert_eq!(fallback.algorithm, "SimulatedAnnealing");
    }

    #[test]
    fn test_unreachable_stop_is_disconnected() {
        let inf = f64::INFINITY;
        let inst = instance(vec![
            vec![0.0, inf, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, inf, 0.0],
        ]);
        let err = AStarSolver::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, SolverError::DisconnectedGraph { .. }));
    }

    #[test]
    fn test_forbidden_edge_is_avoided() {
        let inst = unit_square().with_forbidden_edge(0, 1).unwrap();
        let solution = AStarSolver::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        assert_eq!(solution.tour, vec![0, 3, 2, 1, 0]);
        assert_eq!(solution.distance, 4.0);
    }
}
