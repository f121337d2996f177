//! Simulated annealing over random swap moves.
//!
//! Two objectives share the same skeleton:
//! - [`SimulatedAnnealing`] minimizes total distance
//! - [`TimeWindowAnnealing`] minimizes elapsed time under arrival windows
//!
//! Both start from a random permutation, cool geometrically once per
//! iteration and track the best tour separately from the random walk.
//! Randomness always comes from the caller's generator.

use crate::error::{SolverError, SolverResult};
use crate::heuristics::construction::{random_tour, ConstructionHeuristic, NearestNeighborHeuristic};
use crate::heuristics::time_window::TimeWindowEvaluator;
use crate::instance::TSPInstance;
use crate::solution::{ScheduleEntry, Solution};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Temperature schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Initial temperature
    pub initial_temp: f64,
    /// The loop stops once the temperature is at or below this value
    pub final_temp: f64,
    /// Geometric cooling factor applied after every iteration
    pub cooling_rate: f64,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            initial_temp: 10_000.0,
            final_temp: 1.0,
            cooling_rate: 0.995,
        }
    }
}

impl AnnealingConfig {
    /// Rejects schedules that would never terminate.
    pub fn validate(&self) -> SolverResult<()> {
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(SolverError::invalid_input(format!(
                "cooling rate must be in (0, 1), got {}",
                self.cooling_rate
            )));
        }
        if !(self.final_temp > 0.0) || !self.initial_temp.is_finite() {
            return Err(SolverError::invalid_input(format!(
                "temperatures must be finite and positive, got {} -> {}",
                self.initial_temp, self.final_temp
            )));
        }
        Ok(())
    }
}

struct Annealed<T> {
    tour: Vec<usize>,
    cost: f64,
    initial_cost: f64,
    payload: T,
    iterations: usize,
}

/// Shared cooling loop. `evaluate` returns a cost plus whatever the caller
/// wants kept for the best tour; infinite-cost neighbors are never accepted.
fn anneal<R, T, F>(config: &AnnealingConfig, initial: Vec<usize>, mut evaluate: F, rng: &mut R) -> Annealed<T>
where
    R: Rng + ?Sized,
    F: FnMut(&[usize]) -> (f64, T),
{
    let (initial_cost, initial_payload) = evaluate(&initial);

    let mut current_tour = initial.clone();
    let mut current_cost = initial_cost;
    let mut best_tour = initial;
    let mut best_cost = initial_cost;
    let mut best_payload = initial_payload;

    let interior_end = current_tour.len() - 1;
    let mut temp = config.initial_temp;
    let mut iterations = 0;

    while temp > config.final_temp {
        let i = rng.gen_range(1..interior_end);
        let mut j = rng.gen_range(1..interior_end);
        while j == i {
            j = rng.gen_range(1..interior_end);
        }

        let mut neighbor = current_tour.clone();
        neighbor.swap(i, j);
        let (neighbor_cost, payload) = evaluate(&neighbor);

        if neighbor_cost.is_finite() {
            let delta = neighbor_cost - current_cost;
            let accept = delta < 0.0 || rng.gen::<f64>() < (-delta / temp).exp();

            if accept {
                current_tour = neighbor;
                current_cost = neighbor_cost;

                if current_cost < best_cost {
                    best_tour = current_tour.clone();
                    best_cost = current_cost;
                    best_payload = payload;
                }
            }
        }

        temp *= config.cooling_rate;
        iterations += 1;
    }

    Annealed {
        tour: best_tour,
        cost: best_cost,
        initial_cost,
        payload: best_payload,
        iterations,
    }
}

/// Simulated Annealing minimizing total distance
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedAnnealing {
    pub config: AnnealingConfig,
}

impl SimulatedAnnealing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnnealingConfig) -> Self {
        SimulatedAnnealing { config }
    }

    pub fn name(&self) -> &str {
        "SimulatedAnnealing"
    }

    /// Anneal from a random tour drawn from `rng`.
    ///
    /// With fewer than three nodes there is nothing to swap and the nearest
    /// neighbor tour is returned as is.
    pub fn solve<R: Rng + ?Sized>(&self, instance: &TSPInstance, rng: &mut R) -> SolverResult<Solution> {
        self.config.validate()?;
        let start = std::time::Instant::now();
        let n = instance.dimension();

        if n < 3 {
            let mut solution = NearestNeighborHeuristic::new().construct(instance)?;
            solution.algorithm = self.name().to_string();
            return Ok(solution);
        }

        let initial = random_tour(n, rng);
        let result = anneal(
            &self.config,
            initial,
            |tour| (instance.tour_length(tour), ()),
            rng,
        );

        log::debug!(
            "Annealing: {} iterations, initial distance {:.2}, best {:.2}",
            result.iterations,
            result.initial_cost,
            result.cost
        );

        let mut solution = Solution::from_tour(instance, result.tour, self.name());
        solution.iterations = Some(result.iterations);
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }
}

/// Simulated Annealing minimizing elapsed time under time windows
///
/// The objective is the [`TimeWindowEvaluator`] cost. Distance is reported
/// for the winning tour but plays no part in the search.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindowAnnealing {
    pub config: AnnealingConfig,
}

impl TimeWindowAnnealing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnnealingConfig) -> Self {
        TimeWindowAnnealing { config }
    }

    pub fn name(&self) -> &str {
        "SimulatedAnnealing-TW"
    }

    /// Fails with `InfeasibleTimeWindow` when no tour meeting every window
    /// was ever seen; no partial tour is returned in that case.
    pub fn solve<R: Rng + ?Sized>(&self, instance: &TSPInstance, rng: &mut R) -> SolverResult<Solution> {
        self.config.validate()?;
        let start = std::time::Instant::now();
        let evaluator = TimeWindowEvaluator::for_instance(instance)?;
        let n = instance.dimension();

        let (tour, cost, schedule, iterations) = if n < 3 {
            let tour = vec![0, 1, 0];
            let evaluation = evaluator.evaluate(&tour);
            let cost = evaluation.cost();
            (tour, cost, evaluation.into_schedule(), 0)
        } else {
            let initial = random_tour(n, rng);
            let result = anneal(
                &self.config,
                initial,
                |tour| {
                    let evaluation = evaluator.evaluate(tour);
                    (evaluation.cost(), evaluation.into_schedule())
                },
                rng,
            );
            log::debug!(
                "TW annealing: {} iterations, initial cost {:.0}s, best {:.0}s",
                result.iterations,
                result.initial_cost,
                result.cost
            );
            (result.tour, result.cost, result.payload, result.iterations)
        };

        let schedule: Vec<ScheduleEntry> = match schedule {
            Some(schedule) if cost.is_finite() => schedule,
            _ => {
                log::info!("No tour of {} satisfies every time window", instance.name);
                return Err(SolverError::InfeasibleTimeWindow);
            }
        };

        let mut solution = Solution::from_tour(instance, tour, self.name());
        solution.cost = cost;
        solution.schedule = schedule;
        solution.iterations = Some(iterations);
        solution.computation_time = start.elapsed().as_secs_f64();
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Matrix, TimeWindow};
    use crate::solution::is_valid_tour;
    use rand_chacha::ChaCha8Rng;

    fn grid_instance(n: usize) -> TSPInstance {
        // Nodes on a 3-wide grid, Manhattan distances.
        let coords: Vec<(f64, f64)> = (0..n).map(|i| ((i % 3) as f64, (i / 3) as f64)).collect();
        let rows = coords
            .iter()
            .map(|a| {
                coords
                    .iter()
                    .map(|b| (a.0 - b.0).abs() + (a.1 - b.1).abs())
                    .collect()
            })
            .collect();
        TSPInstance::new("grid", Matrix::from_rows(rows).unwrap()).unwrap()
    }

    #[test]
    fn test_annealing_beats_initial_random_tour() {
        let inst = grid_instance(9);
        for seed in 0..5 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let solution = SimulatedAnnealing::new().solve(&inst, &mut rng).unwrap();

            let mut replay = ChaCha8Rng::seed_from_u64(seed);
            let initial = random_tour(9, &mut replay);

            assert!(is_valid_tour(&solution.tour, 9));
            assert!(solution.distance <= inst.tour_length(&initial));
        }
    }

    #[test]
    fn test_annealing_is_reproducible() {
        let inst = grid_instance(8);
        let a = SimulatedAnnealing::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(11))
            .unwrap();
        let b = SimulatedAnnealing::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(11))
            .unwrap();
        assert_eq!(a.tour, b.tour);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_iteration_count_follows_schedule() {
        let inst = grid_instance(5);
        let config = AnnealingConfig {
            initial_temp: 8.0,
            final_temp: 1.0,
            cooling_rate: 0.5,
        };
        let solution = SimulatedAnnealing::with_config(config)
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        // 8 -> 4 -> 2 -> 1 (stop at or below 1)
        assert_eq!(solution.iterations, Some(3));
    }

    #[test]
    fn test_small_instance_uses_nearest_neighbor() {
        let m = Matrix::from_rows(vec![vec![0.0, 4.0], vec![5.0, 0.0]]).unwrap();
        let inst = TSPInstance::new("pair", m).unwrap();
        let nn = NearestNeighborHeuristic::new().construct(&inst).unwrap();
        let sa = SimulatedAnnealing::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        assert_eq!(sa.tour, nn.tour);
        assert_eq!(sa.distance, 9.0);
    }

    #[test]
    fn test_invalid_cooling_rate() {
        let inst = grid_instance(4);
        let config = AnnealingConfig {
            cooling_rate: 1.0,
            ..Default::default()
        };
        let err = SimulatedAnnealing::with_config(config)
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput { .. }));
    }

    fn tw_instance(windows: Vec<TimeWindow>) -> TSPInstance {
        let distances = Matrix::from_rows(vec![
            vec![0.0, 1.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0, 1.0],
            vec![1.0, 1.0, 0.0, 1.0],
            vec![1.0, 1.0, 1.0, 0.0],
        ])
        .unwrap();
        let durations = Matrix::from_rows(vec![
            vec![0.0, 600.0, 600.0, 600.0],
            vec![600.0, 0.0, 600.0, 600.0],
            vec![600.0, 600.0, 0.0, 600.0],
            vec![600.0, 600.0, 600.0, 0.0],
        ])
        .unwrap();
        TSPInstance::new("tw", distances)
            .unwrap()
            .with_durations(durations)
            .unwrap()
            .with_time_windows(windows)
            .unwrap()
            .with_start_time(0.0)
    }

    #[test]
    fn test_time_window_annealing_finds_forced_order() {
        // Stop 3 must come first; visiting 2 before 1 costs a 600s wait.
        let inst = tw_instance(vec![
            TimeWindow::new(0.0, 86_400.0).unwrap(),
            TimeWindow::new(1800.0, 86_400.0).unwrap(),
            TimeWindow::new(0.0, 600.0).unwrap(),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let solution = TimeWindowAnnealing::new().solve(&inst, &mut rng).unwrap();

        assert_eq!(solution.tour, vec![0, 3, 1, 2, 0]);
        assert_eq!(solution.cost, 2400.0);
        assert_eq!(solution.distance, 4.0);
        assert_eq!(solution.schedule.len(), 4);
        assert_eq!(solution.schedule[1].node, 1);
    }

    #[test]
    fn test_time_window_annealing_infeasible() {
        let inst = tw_instance(vec![
            TimeWindow::new(0.0, 100.0).unwrap(),
            TimeWindow::new(0.0, 100.0).unwrap(),
            TimeWindow::new(0.0, 100.0).unwrap(),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let err = TimeWindowAnnealing::new().solve(&inst, &mut rng).unwrap_err();
        assert_eq!(err, SolverError::InfeasibleTimeWindow);
    }

    #[test]
    fn test_time_window_annealing_needs_durations() {
        let inst = grid_instance(4);
        let err = TimeWindowAnnealing::new()
            .solve(&inst, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap_err();
        assert_eq!(err, SolverError::MatrixUnavailable);
    }
}
