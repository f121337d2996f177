//! TSP / TSPTW Solver - Command Line Interface
//!
//! Solves single-depot tours over the matrices stored in a JSON instance file.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tsptw_solver::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use tsptw_solver::config::SolverConfig;
use tsptw_solver::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use tsptw_solver::heuristics::local_search::{LocalSearch, TwoOptSearch};
use tsptw_solver::heuristics::time_window::{Evaluation, TimeWindowEvaluator};
use tsptw_solver::instance::TSPInstance;
use tsptw_solver::solver::{self, RouteResult, SolveRequest, Solver};
use tsptw_solver::time::format_seconds;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "tsptw-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Single-depot TSP and TSP with time windows over precomputed matrices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// Objective: total distance, or elapsed time under time windows
        #[arg(short, long, value_enum, default_value = "distance")]
        mode: Mode,

        /// Algorithm to use in distance mode
        #[arg(short, long, value_enum, default_value = "all")]
        algorithm: AlgorithmArg,

        /// Random seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,

        /// TOML solver configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output routes to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compare algorithms on an instance over several seeds
    Compare {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Number of runs per stochastic algorithm
        #[arg(short, long, default_value = "10")]
        runs: usize,

        /// Seed of the first run
        #[arg(short, long)]
        seed: Option<u64>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recompute the route while avoiding one directed edge
    Reroute {
        #[arg(short, long)]
        instance: PathBuf,

        /// Edge start, as a node index or location label
        #[arg(long)]
        from: String,

        /// Edge end, as a node index or location label
        #[arg(long)]
        to: String,

        /// Output the new route to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs per stochastic algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        #[arg(short, long)]
        seed: Option<u64>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip the exact solver
        #[arg(long)]
        no_exact: bool,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Mode {
    /// Minimize total distance
    Distance,
    /// Respect time windows, minimize elapsed time
    Schedule,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum AlgorithmArg {
    /// Every algorithm, ranked by distance
    All,
    /// Nearest neighbor + 2-opt
    NnTwoOpt,
    /// Nearest neighbor + 3-opt
    ThreeOpt,
    /// Simulated annealing
    Sa,
    /// A* (annealing above the exact size limit)
    Astar,
}

impl AlgorithmArg {
    fn algorithm(self) -> Option<solver::Algorithm> {
        match self {
            AlgorithmArg::All => None,
            AlgorithmArg::NnTwoOpt => Some(solver::Algorithm::NnTwoOpt),
            AlgorithmArg::ThreeOpt => Some(solver::Algorithm::ThreeOpt),
            AlgorithmArg::Sa => Some(solver::Algorithm::SimulatedAnnealing),
            AlgorithmArg::Astar => Some(solver::Algorithm::AStar),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve { instance, mode, algorithm, seed, config, output, verbose } => {
            solve_instance(&instance, mode, algorithm, seed, config, output, verbose);
        }

        Commands::Compare { instance, runs, seed, config, output } => {
            compare_algorithms(&instance, runs, seed, config, output);
        }

        Commands::Reroute { instance, from, to, output } => {
            reroute(&instance, &from, &to, output);
        }

        Commands::Benchmark { dir, output, runs, seed, config, no_exact, max_size } => {
            run_benchmark(&dir, &output, runs, seed, config, no_exact, max_size);
        }

        Commands::Analyze { instance } => {
            analyze_instance(&instance);
        }
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn load_instance(path: &Path) -> TSPInstance {
    TSPInstance::from_file(path).unwrap_or_else(|e| fail("Error loading instance", e))
}

fn load_config(path: Option<PathBuf>, seed: Option<u64>) -> SolverConfig {
    let mut config = match path {
        Some(path) => {
            SolverConfig::from_file(&path).unwrap_or_else(|e| fail("Error loading config", e))
        }
        None => SolverConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    config
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fail("Error serializing output", e));
    std::fs::write(path, json).unwrap_or_else(|e| fail("Error writing output", e));
    println!("\nSaved to {:?}", path);
}

fn solve_instance(
    path: &Path,
    mode: Mode,
    algorithm: AlgorithmArg,
    seed: Option<u64>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    verbose: bool,
) {
    println!("Loading instance from {:?}...", path);
    let instance = load_instance(path);
    let config = load_config(config, seed);
    let solver = Solver::with_config(config);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    if verbose {
        println!("{}", instance.statistics());
    }

    let results: Vec<RouteResult> = match (mode, algorithm.algorithm()) {
        (Mode::Schedule, _) => {
            println!("Solving with time windows...");
            solver
                .solve(SolveRequest::time_window(&instance), &mut rng)
                .unwrap_or_else(|e| fail("Solve failed", e))
        }
        (Mode::Distance, None) => {
            println!("Solving with every algorithm...");
            solver
                .solve(SolveRequest::distance(&instance), &mut rng)
                .unwrap_or_else(|e| fail("Solve failed", e))
        }
        (Mode::Distance, Some(algorithm)) => {
            println!("Solving with {}...", algorithm);
            let solution = solver
                .run_algorithm(algorithm, &instance, &mut rng)
                .unwrap_or_else(|e| fail("Solve failed", e));
            vec![RouteResult::from_solution(&instance, &solution)]
        }
    };

    println!("\n========== Results ==========");
    println!("{:<22} {:>12} {:>12}", "Algorithm", "Distance", "Time (ms)");
    println!("{}", "-".repeat(48));
    for route in &results {
        println!(
            "{:<22} {:>12.2} {:>12.3}",
            route.algorithm, route.distance, route.exec_time_ms
        );
    }

    let best = &results[0];
    println!("\nBest: {}", best.algorithm);
    if verbose || mode == Mode::Schedule {
        println!("Tour: {}", best.labels.join(" -> "));
    }
    if let Some(duration) = best.duration {
        println!("Duration: {}", format_seconds(duration));
    }
    if let Some(schedule) = &best.schedule {
        println!("\n{:<20} {:>10} {:>10} {:>10}", "Stop", "Arrival", "Wait", "Departure");
        for stop in schedule {
            println!(
                "{:<20} {:>10} {:>10} {:>10}",
                instance.locations[stop.node], stop.arrival, stop.wait, stop.departure
            );
        }
    }

    if let Some(out_path) = output {
        write_json(&out_path, &results);
    }
}

fn compare_algorithms(
    path: &Path,
    runs: usize,
    seed: Option<u64>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) {
    let instance = load_instance(path);
    let config = load_config(config, seed);

    println!(
        "Comparing algorithms on {} (n={})...\n",
        instance.name,
        instance.dimension()
    );

    let mut benchmark = Benchmark::with_solver(
        BenchmarkConfig {
            num_runs: runs,
            base_seed: config.seed,
            include_exact: true,
        },
        Solver::with_config(config),
    );
    benchmark.run_instance(&instance);

    println!("{}", benchmark.generate_report());

    if let Some(out_path) = output {
        benchmark
            .export_to_csv(&out_path)
            .unwrap_or_else(|e| fail("Failed to write CSV", e));
        println!("Results exported to {:?}", out_path);
    }
}

fn reroute(path: &Path, from: &str, to: &str, output: Option<PathBuf>) {
    let instance = load_instance(path);
    let from = solver::resolve_node(&instance, from).unwrap_or_else(|e| fail("Bad --from", e));
    let to = solver::resolve_node(&instance, to).unwrap_or_else(|e| fail("Bad --to", e));

    let result = Solver::new()
        .reroute(&instance, from, to)
        .unwrap_or_else(|e| fail("Reroute failed", e));

    println!(
        "Avoiding {} -> {}",
        instance.locations[from], instance.locations[to]
    );
    println!("Tour: {}", result.labels.join(" -> "));
    println!("Distance: {:.2}", result.distance);
    if let Some(text) = &result.duration_text {
        println!("Duration: {}", text);
    }

    if let Some(out_path) = output {
        write_json(&out_path, &result);
    }
}

fn run_benchmark(
    dir: &Path,
    output: &Path,
    runs: usize,
    seed: Option<u64>,
    config: Option<PathBuf>,
    no_exact: bool,
    max_size: Option<usize>,
) {
    println!("Loading instances from {:?}...", dir);

    let mut instances = load_instances_from_dir(dir);

    if let Some(max) = max_size {
        instances.retain(|i| i.dimension() <= max);
    }

    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        eprintln!("No instances found!");
        return;
    }

    std::fs::create_dir_all(output)
        .unwrap_or_else(|e| fail("Failed to create output directory", e));

    let config = load_config(config, seed);
    let mut benchmark = Benchmark::with_solver(
        BenchmarkConfig {
            num_runs: runs,
            base_seed: config.seed,
            include_exact: !no_exact,
        },
        Solver::with_config(config),
    );

    let progress = ProgressBar::new(instances.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    for instance in &instances {
        progress.set_message(format!("{} (n={})", instance.name, instance.dimension()));
        benchmark.run_instance(instance);
        progress.inc(1);
    }
    progress.finish_with_message("done");

    let results_path = output.join("results.csv");
    benchmark
        .export_to_csv(&results_path)
        .unwrap_or_else(|e| fail("Failed to export results", e));
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark
        .export_statistics_csv(&stats_path)
        .unwrap_or_else(|e| fail("Failed to export statistics", e));
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report).unwrap_or_else(|e| fail("Failed to save report", e));
    println!("Report saved to {:?}", report_path);
}

fn analyze_instance(path: &Path) {
    let instance = load_instance(path);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let nn = match NearestNeighborHeuristic::new().construct(&instance) {
        Ok(solution) => solution,
        Err(e) => {
            println!("Nearest neighbor: {}", e);
            return;
        }
    };
    let mut improved = nn.clone();
    TwoOptSearch::new().improve(&instance, &mut improved);

    println!("Quick Solution Estimates:");
    println!("  Nearest Neighbor: {:.2}", nn.distance);
    println!("  Nearest Neighbor + 2-Opt: {:.2}", improved.distance);

    if instance.has_time_windows() {
        if let Ok(evaluator) = TimeWindowEvaluator::for_instance(&instance) {
            match evaluator.evaluate(&improved.tour) {
                Evaluation::Feasible { cost, .. } => {
                    println!("  NN + 2-Opt meets every window ({})", format_seconds(cost));
                }
                Evaluation::Infeasible { node, arrival, latest, .. } => println!(
                    "  NN + 2-Opt misses {}: arrives {} after {}",
                    instance.locations[node],
                    format_seconds(arrival),
                    format_seconds(latest)
                ),
            }
        }
    }
}
