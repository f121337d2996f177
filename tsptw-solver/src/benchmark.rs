//! Benchmarking and experimentation module.
//!
//! Runs every distance-mode algorithm several times per instance, collects
//! per-run rows and aggregates them per algorithm.

use crate::error::SolverResult;
use crate::instance::TSPInstance;
use crate::solver::{Algorithm, Solver};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Instance dimension
    pub dimension: usize,
    /// Run index
    pub run: usize,
    /// Seed of the run's generator
    pub seed: u64,
    /// Tour distance
    pub distance: f64,
    /// Whether the tour avoids every forbidden edge
    pub feasible: bool,
    /// Computation time in seconds
    pub time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    /// Gap to the A* optimum in percent (if known)
    pub gap_to_best: Option<f64>,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    /// Number of recorded runs
    pub num_runs: usize,
    pub num_feasible: usize,
    pub avg_distance: f64,
    pub best_distance: f64,
    pub worst_distance: f64,
    /// Population standard deviation of the distance
    pub std_distance: f64,
    pub avg_time: f64,
    pub total_time: f64,
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per algorithm
    pub num_runs: usize,
    /// Run `r` uses seed `base_seed + r`
    pub base_seed: u64,
    /// Run A* (once) on instances small enough for it
    pub include_exact: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            base_seed: 42,
            include_exact: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    solver: Solver,
    results: Vec<AlgorithmResult>,
    best_known: HashMap<String, f64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self::with_solver(config, Solver::new())
    }

    pub fn with_solver(config: BenchmarkConfig, solver: Solver) -> Self {
        Benchmark {
            config,
            solver,
            results: Vec::new(),
            best_known: HashMap::new(),
        }
    }

    /// Set best known solution for an instance
    pub fn set_best_known(&mut self, instance_name: &str, distance: f64) {
        self.best_known.insert(instance_name.to_string(), distance);
    }

    /// Run the exact solver once, then every heuristic `num_runs` times.
    ///
    /// A failing algorithm is logged and skipped; the others still run.
    pub fn run_instance(&mut self, instance: &TSPInstance) {
        log::info!("Running benchmark on instance: {}", instance.name);

        let algorithms = self.solver.algorithms_for(instance);

        // The optimum goes in first so heuristic rows get a gap.
        if self.config.include_exact && algorithms.contains(&Algorithm::AStar) {
            match self.run_once(Algorithm::AStar, instance, 0) {
                Ok(result) if result.feasible => {
                    self.best_known.insert(instance.name.clone(), result.distance);
                }
                Ok(_) => {}
                Err(e) => log::error!("A* failed on {}: {}", instance.name, e),
            }
        }

        for algorithm in algorithms {
            if algorithm == Algorithm::AStar {
                continue;
            }
            let runs = if algorithm.is_stochastic() {
                self.config.num_runs
            } else {
                1
            };
            for run in 0..runs {
                if let Err(e) = self.run_once(algorithm, instance, run) {
                    log::error!("{} failed on {}: {}", algorithm, instance.name, e);
                    break;
                }
            }
        }
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[TSPInstance]) {
        for instance in instances {
            self.run_instance(instance);
        }
    }

    fn run_once(
        &mut self,
        algorithm: Algorithm,
        instance: &TSPInstance,
        run: usize,
    ) -> SolverResult<AlgorithmResult> {
        let seed = self.config.base_seed + run as u64;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let solution = self.solver.run_algorithm(algorithm, instance, &mut rng)?;

        let mut result = AlgorithmResult {
            algorithm: solution.algorithm.clone(),
            instance: instance.name.clone(),
            dimension: instance.dimension(),
            run,
            seed,
            distance: solution.distance,
            feasible: solution.distance.is_finite(),
            time: solution.computation_time,
            iterations: solution.iterations,
            gap_to_best: None,
        };

        if let Some(&best) = self.best_known.get(&instance.name) {
            if best > 0.0 && result.feasible {
                result.gap_to_best = Some((result.distance - best) / best * 100.0);
            }
        }

        self.results.push(result.clone());
        Ok(result)
    }

    /// Compute statistics for each algorithm
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: HashMap<String, Vec<&AlgorithmResult>> = HashMap::new();

        for result in &self.results {
            stats_map
                .entry(result.algorithm.clone())
                .or_default()
                .push(result);
        }

        let mut statistics = Vec::new();

        for (algo, results) in stats_map {
            let feasible_results: Vec<_> = results.iter().filter(|r| r.feasible).collect();

            if feasible_results.is_empty() {
                continue;
            }

            let distances: Vec<f64> = feasible_results.iter().map(|r| r.distance).collect();
            let times: Vec<f64> = feasible_results.iter().map(|r| r.time).collect();
            let gaps: Vec<f64> = feasible_results
                .iter()
                .filter_map(|r| r.gap_to_best)
                .collect();

            let best_distance = distances.iter().cloned().fold(f64::INFINITY, f64::min);
            let worst_distance = distances.iter().cloned().fold(0.0, f64::max);

            statistics.push(AlgorithmStatistics {
                algorithm: algo,
                num_runs: results.len(),
                num_feasible: feasible_results.len(),
                avg_distance: distances.iter().mean(),
                best_distance,
                worst_distance,
                std_distance: distances.iter().population_std_dev(),
                avg_time: times.iter().mean(),
                total_time: times.iter().sum(),
                avg_gap: if gaps.is_empty() {
                    None
                } else {
                    Some(gaps.iter().mean())
                },
            });
        }

        statistics.sort_by(|a, b| a.avg_distance.total_cmp(&b.avg_distance));

        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        TSP Benchmark Report\n");
        report.push_str("========================================\n\n");

        let stats = self.compute_statistics();

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(84).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<22} {:>8} {:>12} {:>12} {:>10} {:>14}\n",
            "Algorithm", "Runs", "Avg Dist", "Best Dist", "Avg Gap%", "Avg Time (ms)"
        ));
        report.push_str("-".repeat(84).as_str());
        report.push('\n');

        for stat in &stats {
            let gap_str = stat
                .avg_gap
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<22} {:>8} {:>12.2} {:>12.2} {:>10} {:>14.3}\n",
                stat.algorithm,
                format!("{}/{}", stat.num_feasible, stat.num_runs),
                stat.avg_distance,
                stat.best_distance,
                gap_str,
                stat.avg_time * 1000.0
            ));
        }

        report.push_str("-".repeat(84).as_str());
        report.push('\n');

        report.push_str("\nBest Tours per Instance:\n");

        let mut instance_best: HashMap<&str, &AlgorithmResult> = HashMap::new();
        for result in self.results.iter().filter(|r| r.feasible) {
            let entry = instance_best.entry(result.instance.as_str()).or_insert(result);
            if result.distance < entry.distance {
                *entry = result;
            }
        }

        let mut names: Vec<&&str> = instance_best.keys().collect();
        names.sort();
        for name in names {
            let best = instance_best[*name];
            report.push_str(&format!(
                "  {}: {:.2} ({})\n",
                name, best.distance, best.algorithm
            ));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    /// Get best known values
    pub fn best_known(&self) -> &HashMap<String, f64> {
        &self.best_known
    }
}

/// Load every `*.json` instance in `dir`, smallest first.
///
/// Files that fail to load are logged and skipped.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<TSPInstance> {
    let mut instances = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match TSPInstance::from_file(&path) {
                    Ok(instance) => instances.push(instance),
                    Err(e) => log::warn!("Skipping {:?}: {}", path, e),
                }
            }
        }
    }

    instances.sort_by_key(|i| i.dimension());

    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Matrix;

    fn ring(n: usize) -> TSPInstance {
        // Nodes on a cycle; distance is the shorter way round.
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let d = (i as isize - j as isize).unsigned_abs();
                        d.min(n - d) as f64
                    })
                    .collect()
            })
            .collect();
        TSPInstance::new(format!("ring{}", n), Matrix::from_rows(rows).unwrap()).unwrap()
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
        assert_eq!(config.base_seed, 42);
    }

    #[test]
    fn test_run_instance_records_rows() {
        let config = BenchmarkConfig {
            num_runs: 3,
            ..BenchmarkConfig::default()
        };
        let mut benchmark = Benchmark::new(config);
        let inst = ring(6);
        benchmark.run_instance(&inst);

        // A* once, NN + 2-Opt once, NN + 3-Opt once, annealing three times.
        assert_eq!(benchmark.results().len(), 6);
        assert_eq!(benchmark.best_known().get("ring6"), Some(&6.0));

        let sa: Vec<_> = benchmark
            .results()
            .iter()
            .filter(|r| r.algorithm == "Simulated Annealing")
            .collect();
        assert_eq!(sa.len(), 3);
        assert_eq!(sa.iter().map(|r| r.seed).collect::<Vec<_>>(), vec![42, 43, 44]);
        assert!(sa.iter().all(|r| r.gap_to_best.map_or(false, |g| g >= 0.0)));
    }

    #[test]
    fn test_statistics_and_report() {
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            num_runs: 2,
            ..BenchmarkConfig::default()
        });
        benchmark.run_instance(&ring(5));

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 4);
        assert!(stats.windows(2).all(|w| w[0].avg_distance <= w[1].avg_distance));
        let exact = stats.iter().find(|s| s.algorithm == "A*").unwrap();
        assert_eq!(exact.best_distance, 5.0);
        assert_eq!(exact.std_distance, 0.0);

        let report = benchmark.generate_report();
        assert!(report.contains("ring5: 5.00"));
    }

    #[test]
    fn test_gaps_non_negative_on_asymmetric_instance() {
        // Clockwise around the ring is cheap, counter-clockwise is not.
        let n = 7;
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let forward = (j + n - i) % n;
                        if i == j {
                            0.0
                        } else {
                            (forward * forward) as f64 + ((i * 3 + j) % 5) as f64
                        }
                    })
                    .collect()
            })
            .collect();
        let inst = TSPInstance::new("skewed", Matrix::from_rows(rows).unwrap()).unwrap();

        let mut benchmark = Benchmark::new(BenchmarkConfig {
            num_runs: 3,
            ..BenchmarkConfig::default()
        });
        benchmark.run_instance(&inst);

        let best = benchmark.best_known()["skewed"];
        for result in benchmark.results() {
            assert!(result.distance >= best, "{} beat A*", result.algorithm);
            assert!(result.gap_to_best.map_or(true, |g| g >= 0.0));
        }
    }

    #[test]
    fn test_exact_can_be_excluded() {
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            num_runs: 1,
            include_exact: false,
            ..BenchmarkConfig::default()
        });
        benchmark.run_instance(&ring(5));
        assert!(benchmark.results().iter().all(|r| r.algorithm != "A*"));
        assert!(benchmark.results().iter().all(|r| r.gap_to_best.is_none()));
    }
}
