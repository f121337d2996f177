//! Solution representation for TSP / TSPTW.
//!
//! This module provides the tour, schedule and result types shared by every
//! heuristic, plus the permutation check every returned tour must pass.

use crate::instance::TSPInstance;
use crate::time::format_seconds;
use serde::{Deserialize, Serialize};

/// Timeline of one traversed edge, attached to its destination node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Destination node of the edge
    pub node: usize,
    /// Arrival time in seconds of day
    pub arrival: f64,
    /// Waiting time before the window opens, in seconds
    pub wait: f64,
    /// Departure time in seconds of day
    pub departure: f64,
}

impl ScheduleEntry {
    pub fn formatted(&self) -> FormattedStop {
        FormattedStop {
            node: self.node,
            arrival: format_seconds(self.arrival),
            wait: format_seconds(self.wait),
            departure: format_seconds(self.departure),
        }
    }
}

/// A schedule entry rendered as `HH:MM:SS` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedStop {
    pub node: usize,
    pub arrival: String,
    pub wait: String,
    pub departure: String,
}

/// Represents a solution to a TSP / TSPTW instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of node indices (starting and ending at depot 0)
    pub tour: Vec<usize>,
    /// Total distance along the tour
    pub distance: f64,
    /// Objective value: distance for plain TSP, elapsed seconds for TSPTW
    pub cost: f64,
    /// Per-edge timeline, only filled by time-windowed solvers
    pub schedule: Vec<ScheduleEntry>,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a solution from a closed tour; cost is the tour distance.
    pub fn from_tour(instance: &TSPInstance, tour: Vec<usize>, algorithm: &str) -> Self {
        let distance = instance.tour_length(&tour);
        Solution {
            tour,
            distance,
            cost: distance,
            schedule: Vec::new(),
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Recompute distance (and distance-based cost) after the tour changed.
    pub fn validate(&mut self, instance: &TSPInstance) {
        self.distance = instance.tour_length(&self.tour);
        self.cost = self.distance;
    }

    /// Check the tour is `[0, permutation of 1..N-1, 0]`.
    pub fn is_complete(&self, instance: &TSPInstance) -> bool {
        is_valid_tour(&self.tour, instance.dimension())
    }

    pub fn formatted_schedule(&self) -> Vec<FormattedStop> {
        self.schedule.iter().map(ScheduleEntry::formatted).collect()
    }
}

/// Returns `true` if `tour` has length `dimension + 1`, starts and ends at
/// the depot, and visits every stop `1..dimension` exactly once.
pub fn is_valid_tour(tour: &[usize], dimension: usize) -> bool {
    if dimension == 0 || tour.len() != dimension + 1 {
        return false;
    }
    if tour[0] != 0 || tour[dimension] != 0 {
        return false;
    }
    let mut seen = vec![false; dimension];
    for &node in &tour[1..dimension] {
        if node == 0 || node >= dimension || seen[node] {
            return false;
        }
        seen[node] = true;
    }
    true
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Distance: {:.2}", self.distance)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}
