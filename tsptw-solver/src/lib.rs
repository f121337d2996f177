//! TSP / TSPTW Solver Library
//!
//! Single-depot tours over precomputed distance and duration matrices.
//!
//! # Features
//!
//! - Nearest neighbor construction
//! - Local search (2-opt, single-pattern 3-opt)
//! - Simulated annealing on distance, or on elapsed time under arrival windows
//! - Exact A* search with an MST lower bound for small instances
//! - Rerouting around a forbidden edge
//! - Benchmarking tools
//!
//! # Example
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use tsptw_solver::instance::TSPInstance;
//! use tsptw_solver::solver::{SolveRequest, Solver};
//!
//! let instance = TSPInstance::from_file("instance.json").unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//!
//! let results = Solver::new()
//!     .solve(SolveRequest::distance(&instance), &mut rng)
//!     .unwrap();
//!
//! for route in &results {
//!     println!("{}: {:.2}", route.algorithm, route.distance);
//! }
//! ```

pub mod error;
pub mod time;
pub mod instance;
pub mod solution;
pub mod heuristics;
pub mod exact;
pub mod config;
pub mod solver;
pub mod benchmark;

pub use error::{SolverError, SolverResult};
pub use instance::TSPInstance;
pub use solution::Solution;
pub use solver::Solver;
