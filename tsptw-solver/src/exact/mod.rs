//! Exact solvers module.
//!
//! A* over (node, visited set) states, limited to small instances.

mod astar;

pub use astar::{mst_heuristic, AStarSolver, MAX_SUPPORTED_NODES};
