//! High-level entry points: solve, compare and reroute.
//!
//! A distance-mode solve runs every algorithm on the same instance and ranks
//! the tours by distance. A schedule-mode solve runs the time-windowed
//! annealing once. Rerouting forbids one directed edge on a private copy of
//! the instance and rebuilds the route with nearest neighbor plus 2-opt.

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use crate::exact::AStarSolver;
use crate::heuristics::annealing::{SimulatedAnnealing, TimeWindowAnnealing};
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use crate::heuristics::local_search::{LocalSearch, ThreeOptSearch, TwoOptSearch};
use crate::instance::TSPInstance;
use crate::solution::{FormattedStop, Solution};
use crate::time::format_duration_hm;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMode {
    /// Minimize total distance
    Distance,
    /// Meet every arrival window, minimizing elapsed time
    TimeWindow,
}

/// Distance-mode algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    NnTwoOpt,
    ThreeOpt,
    SimulatedAnnealing,
    AStar,
}

impl Algorithm {
    /// Every algorithm, in the order a comparison runs them.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::NnTwoOpt,
        Algorithm::ThreeOpt,
        Algorithm::SimulatedAnnealing,
        Algorithm::AStar,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::NnTwoOpt => "NN + 2-Opt",
            Algorithm::ThreeOpt => "NN + 3-Opt",
            Algorithm::SimulatedAnnealing => "Simulated Annealing",
            Algorithm::AStar => "A*",
        }
    }

    /// Whether the outcome depends on the random generator.
    pub fn is_stochastic(&self) -> bool {
        matches!(self, Algorithm::SimulatedAnnealing)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One solve call: an instance and the objective to optimize.
#[derive(Debug, Clone, Copy)]
pub struct SolveRequest<'a> {
    pub instance: &'a TSPInstance,
    pub mode: SolveMode,
}

impl<'a> SolveRequest<'a> {
    pub fn distance(instance: &'a TSPInstance) -> Self {
        SolveRequest {
            instance,
            mode: SolveMode::Distance,
        }
    }

    pub fn time_window(instance: &'a TSPInstance) -> Self {
        SolveRequest {
            instance,
            mode: SolveMode::TimeWindow,
        }
    }
}

/// A reported route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub algorithm: String,
    pub tour: Vec<usize>,
    /// Location label of each tour node
    pub labels: Vec<String>,
    pub distance: f64,
    /// Elapsed seconds from depot departure to return (schedule mode only)
    pub duration: Option<f64>,
    /// Per-stop timeline (schedule mode only)
    pub schedule: Option<Vec<FormattedStop>>,
    /// Wall-clock time of the algorithm
    pub exec_time_ms: f64,
}

impl RouteResult {
    pub fn from_solution(instance: &TSPInstance, solution: &Solution) -> Self {
        RouteResult {
            algorithm: solution.algorithm.clone(),
            tour: solution.tour.clone(),
            labels: labels(instance, &solution.tour),
            distance: solution.distance,
            duration: None,
            schedule: None,
            exec_time_ms: solution.computation_time * 1000.0,
        }
    }
}

/// Alternative route avoiding one directed edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerouteResult {
    /// The forbidden edge `(from, to)`
    pub avoided: (usize, usize),
    pub tour: Vec<usize>,
    pub labels: Vec<String>,
    pub distance: f64,
    /// Sum of travel durations along the tour, when durations are known
    pub duration: Option<f64>,
    /// `duration` rendered as `HHh MMm`
    pub duration_text: Option<String>,
}

fn labels(instance: &TSPInstance, tour: &[usize]) -> Vec<String> {
    tour.iter()
        .map(|&node| instance.locations.get(node).cloned().unwrap_or_default())
        .collect()
}

/// Resolve a node given either as an index or as a location label.
pub fn resolve_node(instance: &TSPInstance, key: &str) -> SolverResult<usize> {
    if let Ok(index) = key.trim().parse::<usize>() {
        if index < instance.dimension() {
            return Ok(index);
        }
    }
    instance.location_index(key).ok_or_else(|| {
        SolverError::invalid_input(format!("unknown location '{}' in {}", key, instance.name))
    })
}

/// Runs the algorithms with a shared configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Solver {
    pub config: SolverConfig,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Solver { config }
    }

    fn exact_solver(&self) -> AStarSolver {
        AStarSolver {
            max_nodes: self.config.exact_max_nodes,
            annealing: self.config.annealing,
        }
    }

    /// Algorithms a distance-mode solve runs on `instance`.
    ///
    /// A* is left out above `exact_max_nodes`.
    pub fn algorithms_for(&self, instance: &TSPInstance) -> Vec<Algorithm> {
        let exact = self.exact_solver().applies_to(instance);
        Algorithm::ALL
            .into_iter()
            .filter(|a| *a != Algorithm::AStar || exact)
            .collect()
    }

    pub fn solve<R: Rng + ?Sized>(
        &self,
        request: SolveRequest<'_>,
        rng: &mut R,
    ) -> SolverResult<Vec<RouteResult>> {
        self.config.validate()?;
        let instance = request.instance;
        log::info!(
            "Solving {} ({} nodes) in {:?} mode",
            instance.name,
            instance.dimension(),
            request.mode
        );

        match request.mode {
            SolveMode::Distance => {
                let mut results = Vec::new();
                for algorithm in self.algorithms_for(instance) {
                    let solution = self.run_algorithm(algorithm, instance, rng)?;
                    log::info!(
                        "{}: distance {:.2} in {:.4}s",
                        algorithm,
                        solution.distance,
                        solution.computation_time
                    );
                    results.push(RouteResult::from_solution(instance, &solution));
                }
                results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                Ok(results)
            }
            SolveMode::TimeWindow => {
                let solution = self.solve_time_windows(instance, rng)?;
                log::info!(
                    "Schedule found: {:.0}s elapsed, distance {:.2}",
                    solution.cost,
                    solution.distance
                );
                let mut result = RouteResult::from_solution(instance, &solution);
                result.duration = Some(solution.cost);
                result.schedule = Some(solution.formatted_schedule());
                Ok(vec![result])
            }
        }
    }

    /// Time-windowed annealing with this solver's schedule.
    pub fn solve_time_windows<R: Rng + ?Sized>(
        &self,
        instance: &TSPInstance,
        rng: &mut R,
    ) -> SolverResult<Solution> {
        TimeWindowAnnealing::with_config(self.config.annealing).solve(instance, rng)
    }

    /// Run one distance-mode algorithm; the solution is labelled with
    /// [`Algorithm::label`] and timed end to end.
    ///
    /// A* above `exact_max_nodes` runs annealing instead and is labelled as
    /// annealing.
    pub fn run_algorithm<R: Rng + ?Sized>(
        &self,
        algorithm: Algorithm,
        instance: &TSPInstance,
        rng: &mut R,
    ) -> SolverResult<Solution> {
        let start = Instant::now();
        let mut solution = match algorithm {
            Algorithm::NnTwoOpt => {
                let mut solution = NearestNeighborHeuristic::new().construct(instance)?;
                TwoOptSearch::new().improve(instance, &mut solution);
                solution
            }
            Algorithm::ThreeOpt => {
                ThreeOptSearch::with_max_restarts(self.config.three_opt_max_restarts).solve(instance)?
            }
            Algorithm::SimulatedAnnealing => {
                SimulatedAnnealing::with_config(self.config.annealing).solve(instance, rng)?
            }
            Algorithm::AStar => self.exact_solver().solve(instance, rng)?,
        };
        let ran = match algorithm {
            Algorithm::AStar if !self.exact_solver().applies_to(instance) => {
                Algorithm::SimulatedAnnealing
            }
            other => other,
        };
        solution.algorithm = ran.label().to_string();
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }

    /// Best route that never uses the directed edge `from -> to`.
    ///
    /// Works on a copy of `instance`; the caller's matrices are not modified.
    pub fn reroute(&self, instance: &TSPInstance, from: usize, to: usize) -> SolverResult<RerouteResult> {
        let restricted = instance.with_forbidden_edge(from, to)?;
        log::info!(
            "Rerouting {} avoiding {} -> {}",
            instance.name,
            restricted.locations.get(from).map(String::as_str).unwrap_or("?"),
            restricted.locations.get(to).map(String::as_str).unwrap_or("?")
        );

        let mut solution = NearestNeighborHeuristic::new().construct(&restricted)?;
        TwoOptSearch::new().improve(&restricted, &mut solution);

        if !solution.distance.is_finite() {
            // Nearest neighbor closes the tour unconditionally; only that
            // edge (or one 2-opt could not remove) can be forbidden here.
            let (a, b) = solution
                .tour
                .windows(2)
                .map(|w| (w[0], w[1]))
                .find(|&(a, b)| restricted.distance_matrix.is_forbidden(a, b))
                .unwrap_or((from, to));
            return Err(SolverError::DisconnectedGraph {
                from: a,
                unvisited: vec![b],
            });
        }

        let duration = match restricted.duration_matrix {
            Some(_) => Some(restricted.tour_duration(&solution.tour)?),
            None => None,
        };

        Ok(RerouteResult {
            avoided: (from, to),
            labels: labels(&restricted, &solution.tour),
            tour: solution.tour,
            distance: solution.distance,
            duration,
            duration_text: duration.map(format_duration_hm),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Matrix, TimeWindow};
    use crate::solution::is_valid_tour;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn three_nodes() -> TSPInstance {
        TSPInstance::new(
            "three",
            Matrix::from_rows(vec![
                vec![0.0, 10.0, 15.0],
                vec![10.0, 0.0, 20.0],
                vec![15.0, 20.0, 0.0],
            ])
            .unwrap(),
        )
        .unwrap()
    }

    fn unit_square() -> TSPInstance {
        let d = 2.5;
        TSPInstance::new(
            "square",
            Matrix::from_rows(vec![
                vec![0.0, 1.0, d, 1.0],
                vec![1.0, 0.0, 1.0, d],
                vec![d, 1.0, 0.0, 1.0],
                vec![1.0, d, 1.0, 0.0],
            ])
            .unwrap(),
        )
        .unwrap()
    }

    fn grid(n: usize) -> TSPInstance {
        // Points (i mod 3, i / 3) with Manhattan distance.
        let pos = |i: usize| ((i % 3) as f64, (i / 3) as f64);
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let (a, b) = (pos(i), pos(j));
                        (a.0 - b.0).abs() + (a.1 - b.1).abs()
                    })
                    .collect()
            })
            .collect();
        TSPInstance::new("grid", Matrix::from_rows(rows).unwrap()).unwrap()
    }

    #[test]
    fn test_distance_mode_runs_every_algorithm() {
        let inst = three_nodes();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let results = Solver::new().solve(SolveRequest::distance(&inst), &mut rng).unwrap();

        assert_eq!(results.len(), 4);
        for result in &results {
            assert_eq!(result.distance, 45.0);
            assert!(is_valid_tour(&result.tour, 3));
            assert_eq!(result.labels.len(), 4);
            assert_eq!(result.labels[0], "Depot");
            assert!(result.duration.is_none());
        }
    }

    #[test]
    fn test_results_sorted_and_exact_is_best() {
        let inst = grid(8);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let results = Solver::new().solve(SolveRequest::distance(&inst), &mut rng).unwrap();

        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
        let exact = results.iter().find(|r| r.algorithm == "A*").unwrap();
        assert_eq!(exact.distance, results[0].distance);
    }

    #[test]
    fn test_exact_skipped_above_limit() {
        let config = SolverConfig {
            exact_max_nodes: 5,
            ..SolverConfig::default()
        };
        let solver = Solver::with_config(config);
        let inst = grid(8);
        assert_eq!(solver.algorithms_for(&inst).len(), 3);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let results = solver.solve(SolveRequest::distance(&inst), &mut rng).unwrap();
        assert!(results.iter().all(|r| r.algorithm != "A*"));
    }

    #[test]
    fn test_unit_square_astar() {
        let inst = unit_square();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let solution = Solver::new().run_algorithm(Algorithm::AStar, &inst, &mut rng).unwrap();
        assert_eq!(solution.distance, 4.0);
        assert_eq!(solution.algorithm, "A*");
    }

    #[test]
    fn test_astar_above_limit_reports_annealing() {
        let config = SolverConfig {
            exact_max_nodes: 5,
            ..SolverConfig::default()
        };
        let inst = grid(8);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let solution = Solver::with_config(config)
            .run_algorithm(Algorithm::AStar, &inst, &mut rng)
            .unwrap();
        assert_eq!(solution.algorithm, "Simulated Annealing");
        assert!(is_valid_tour(&solution.tour, 8));
    }

    #[test]
    fn test_schedule_mode() {
        let durations = Matrix::from_rows(vec![
            vec![0.0, 600.0, 900.0],
            vec![600.0, 0.0, 300.0],
            vec![900.0, 300.0, 0.0],
        ])
        .unwrap();
        let start = 8.0 * 3600.0;
        let inst = three_nodes()
            .with_durations(durations)
            .unwrap()
            .with_time_windows(vec![
                TimeWindow::new(start, start + 3600.0).unwrap(),
                TimeWindow::new(start, start + 7200.0).unwrap(),
            ])
            .unwrap()
            .with_start_time(start);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let results = Solver::new()
            .solve(SolveRequest::time_window(&inst), &mut rng)
            .unwrap();
        assert_eq!(results.len(), 1);

        let result = &results[0];
        assert!(is_valid_tour(&result.tour, 3));
        assert_eq!(result.duration, Some(1800.0));
        assert_eq!(result.distance, 45.0);
        let schedule = result.schedule.as_ref().unwrap();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[2].node, 0);
        assert_eq!(schedule[2].arrival, "08:30:00");
    }

    #[test]
    fn test_schedule_mode_needs_durations() {
        let inst = three_nodes();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = Solver::new()
            .solve(SolveRequest::time_window(&inst), &mut rng)
            .unwrap_err();
        assert_eq!(err, SolverError::MatrixUnavailable);
    }

    #[test]
    fn test_reroute_avoids_edge_and_keeps_original() {
        let inst = unit_square();
        let original = inst.clone();
        let reroute = Solver::new().reroute(&inst, 0, 1).unwrap();

        assert_eq!(inst, original);
        assert_eq!(inst.distance(0, 1), 1.0);
        assert!(is_valid_tour(&reroute.tour, 4));
        assert!(!reroute.tour.windows(2).any(|w| w == [0, 1]));
        assert_eq!(reroute.tour, vec![0, 3, 2, 1, 0]);
        assert_eq!(reroute.distance, 4.0);
        assert_eq!(reroute.duration, None);
    }

    #[test]
    fn test_reroute_reports_duration() {
        let durations = Matrix::from_rows(vec![
            vec![0.0, 1800.0, 3600.0],
            vec![1800.0, 0.0, 900.0],
            vec![3600.0, 900.0, 0.0],
        ])
        .unwrap();
        let inst = three_nodes().with_durations(durations).unwrap();
        let reroute = Solver::new().reroute(&inst, 0, 1).unwrap();

        assert_eq!(reroute.tour, vec![0, 2, 1, 0]);
        assert_eq!(reroute.duration, Some(6300.0));
        assert_eq!(reroute.duration_text.as_deref(), Some("01h 45m"));
    }

    #[test]
    fn test_reroute_without_alternative() {
        let inf = f64::INFINITY;
        let inst = TSPInstance::new(
            "one-way",
            Matrix::from_rows(vec![
                vec![0.0, 1.0, 2.0],
                vec![1.0, 0.0, 1.0],
                vec![inf, 1.0, 0.0],
            ])
            .unwrap(),
        )
        .unwrap();
        let err = Solver::new().reroute(&inst, 1, 0).unwrap_err();
        assert!(matches!(err, SolverError::DisconnectedGraph { .. }));
    }

    #[test]
    fn test_resolve_node() {
        let inst = unit_square();
        assert_eq!(resolve_node(&inst, "2").unwrap(), 2);
        assert_eq!(resolve_node(&inst, "Stop 3").unwrap(), 3);
        assert_eq!(resolve_node(&inst, "Depot").unwrap(), 0);
        assert!(resolve_node(&inst, "9").is_err());
        assert!(resolve_node(&inst, "Nowhere").is_err());
    }
}
