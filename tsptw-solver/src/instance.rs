//! Module for loading and representing TSP / TSPTW instances.
//!
//! An instance is a pair of precomputed N×N matrices (distance and travel
//! duration) where node 0 is the depot, plus optional per-stop time windows.
//! Instances are read from JSON files where a `null` matrix entry marks a
//! forbidden edge.

use crate::error::{SolverError, SolverResult};
use crate::time::parse_time_of_day;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default departure time from the depot (08:00).
pub const DEFAULT_START_TIME: f64 = 8.0 * 3600.0;

/// A dense N×N matrix stored in row-major order.
///
/// `f64::INFINITY` marks a forbidden edge. Matrices are not assumed to be
/// symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    size: usize,
}

impl Matrix {
    /// Creates a matrix of the given size, initialized to zero.
    pub fn new(size: usize) -> Self {
        Matrix {
            data: vec![0.0; size * size],
            size,
        }
    }

    /// Builds a matrix from explicit rows.
    ///
    /// Rejects ragged or non-square input, NaN and negative entries.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> SolverResult<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(SolverError::invalid_input(format!(
                    "matrix row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    size
                )));
            }
            for (j, value) in row.into_iter().enumerate() {
                if value.is_nan() || value < 0.0 {
                    return Err(SolverError::invalid_input(format!(
                        "matrix entry ({}, {}) must be non-negative, got {}",
                        i, j, value
                    )));
                }
                data.push(value);
            }
        }
        Ok(Matrix { data, size })
    }

    /// Same as [`Matrix::from_rows`] with `None` read as a forbidden edge.
    pub fn from_optional_rows(rows: Vec<Vec<Option<f64>>>) -> SolverResult<Self> {
        Self::from_rows(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|v| v.unwrap_or(f64::INFINITY))
                        .collect()
                })
                .collect(),
        )
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    #[inline]
    pub fn set(&mut self, from: usize, to: usize, value: f64) {
        self.data[from * self.size + to] = value;
    }

    /// Number of nodes (rows).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_forbidden(&self, from: usize, to: usize) -> bool {
        self.get(from, to).is_infinite()
    }

    /// Number of off-diagonal forbidden edges.
    pub fn forbidden_edges(&self) -> usize {
        (0..self.size)
            .flat_map(|i| (0..self.size).map(move |j| (i, j)))
            .filter(|&(i, j)| i != j && self.is_forbidden(i, j))
            .count()
    }

    /// Returns `true` if the matrix is symmetric within the given tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let (a, b) = (self.get(i, j), self.get(j, i));
                if a.is_infinite() || b.is_infinite() {
                    if a != b {
                        return false;
                    }
                } else if (a - b).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Sum of the matrix entries along consecutive tour positions.
    pub fn path_cost(&self, tour: &[usize]) -> f64 {
        tour.windows(2).map(|w| self.get(w[0], w[1])).sum()
    }
}

/// Arrival time window `[earliest, latest]` in seconds of day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub earliest: f64,
    pub latest: f64,
}

impl TimeWindow {
    /// Creates a window, rejecting `earliest > latest` and NaN bounds.
    pub fn new(earliest: f64, latest: f64) -> SolverResult<Self> {
        if earliest.is_nan() || latest.is_nan() || earliest > latest {
            return Err(SolverError::invalid_input(format!(
                "time window [{}, {}] is empty",
                earliest, latest
            )));
        }
        Ok(TimeWindow { earliest, latest })
    }

    /// The depot's implicit window `[0, +inf)`.
    pub fn unbounded() -> Self {
        TimeWindow {
            earliest: 0.0,
            latest: f64::INFINITY,
        }
    }

    /// Waiting time when arriving at `arrival` (zero if not early).
    pub fn waiting_time(&self, arrival: f64) -> f64 {
        (self.earliest - arrival).max(0.0)
    }

    pub fn is_violated(&self, arrival: f64) -> bool {
        arrival > self.latest
    }

    /// Window of `node` in a per-stop list where `windows[i]` belongs to
    /// node `i + 1`. The depot and unlisted stops get [`TimeWindow::unbounded`].
    pub fn for_node(windows: &[TimeWindow], node: usize) -> TimeWindow {
        if node == 0 {
            return TimeWindow::unbounded();
        }
        windows
            .get(node - 1)
            .copied()
            .unwrap_or_else(TimeWindow::unbounded)
    }
}

/// A time value as written in instance files: seconds or `"HH:MM[:SS]"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl TimeValue {
    pub fn to_seconds(&self) -> SolverResult<f64> {
        match self {
            TimeValue::Seconds(s) => Ok(*s),
            TimeValue::Text(t) => parse_time_of_day(t).map(f64::from),
        }
    }
}

/// Time window entry as written in instance files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindowData {
    pub earliest: TimeValue,
    pub latest: TimeValue,
}

/// Raw instance as supplied by the matrix provider.
///
/// Matrices are optional here: an absent distance matrix is how an exhausted
/// routing provider reports failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub distances: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    pub durations: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    pub time_windows: Vec<TimeWindowData>,
    #[serde(default)]
    pub start_time: Option<TimeValue>,
}

impl InstanceData {
    /// Validate the raw data and build an instance.
    pub fn into_instance(self) -> SolverResult<TSPInstance> {
        let distances = self.distances.ok_or(SolverError::MatrixUnavailable)?;
        let distance_matrix = Matrix::from_optional_rows(distances)?;

        let mut instance = TSPInstance::new(self.name, distance_matrix)?;
        if let Some(durations) = self.durations {
            instance = instance.with_durations(Matrix::from_optional_rows(durations)?)?;
        }
        if !self.time_windows.is_empty() {
            let windows = self
                .time_windows
                .iter()
                .map(|tw| TimeWindow::new(tw.earliest.to_seconds()?, tw.latest.to_seconds()?))
                .collect::<SolverResult<Vec<_>>>()?;
            instance = instance.with_time_windows(windows)?;
        }
        if let Some(start) = self.start_time {
            instance.start_time = start.to_seconds()?;
        }
        if !self.locations.is_empty() {
            instance = instance.with_locations(self.locations)?;
        }
        Ok(instance)
    }
}

/// Represents a complete TSP / TSPTW instance
#[derive(Debug, Clone, PartialEq)]
pub struct TSPInstance {
    /// Name of the instance
    pub name: String,
    /// Display label per node (index-aligned with the matrices)
    pub locations: Vec<String>,
    /// Distance matrix (metres or any additive unit)
    pub distance_matrix: Matrix,
    /// Travel duration matrix in seconds, required for time-windowed solving
    pub duration_matrix: Option<Matrix>,
    /// One window per stop (node 1..N-1); empty when unconstrained
    pub time_windows: Vec<TimeWindow>,
    /// Departure time from the depot, in seconds of day
    pub start_time: f64,
}

impl TSPInstance {
    /// Create an instance over a distance matrix.
    ///
    /// Fails with `InvalidInput` when there is no stop besides the depot.
    pub fn new(name: impl Into<String>, distance_matrix: Matrix) -> SolverResult<Self> {
        let n = distance_matrix.size();
        if n < 2 {
            return Err(SolverError::invalid_input("at least one stop is required"));
        }
        Ok(TSPInstance {
            name: name.into(),
            locations: (0..n).map(default_label).collect(),
            distance_matrix,
            duration_matrix: None,
            time_windows: Vec::new(),
            start_time: DEFAULT_START_TIME,
        })
    }

    pub fn with_durations(mut self, durations: Matrix) -> SolverResult<Self> {
        if durations.size() != self.dimension() {
            return Err(SolverError::invalid_input(format!(
                "duration matrix is {}x{}, distance matrix is {}x{}",
                durations.size(),
                durations.size(),
                self.dimension(),
                self.dimension()
            )));
        }
        self.duration_matrix = Some(durations);
        Ok(self)
    }

    /// Attach one window per stop, ordered like the matrix indices 1..N-1.
    pub fn with_time_windows(mut self, windows: Vec<TimeWindow>) -> SolverResult<Self> {
        if windows.len() != self.num_stops() {
            return Err(SolverError::invalid_input(format!(
                "expected {} time windows, got {}",
                self.num_stops(),
                windows.len()
            )));
        }
        self.time_windows = windows;
        Ok(self)
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_locations(mut self, locations: Vec<String>) -> SolverResult<Self> {
        if locations.len() != self.dimension() {
            return Err(SolverError::invalid_input(format!(
                "expected {} location labels, got {}",
                self.dimension(),
                locations.len()
            )));
        }
        self.locations = locations;
        Ok(self)
    }

    /// Parse an instance from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let text = fs::read_to_string(&path).map_err(|e| SolverError::Io {
            path: path.as_ref().display().to_string(),
            message: e.to_string(),
        })?;
        let mut instance = Self::from_json_str(&text)?;
        if instance.name.is_empty() {
            instance.name = path
                .as_ref()
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(instance)
    }

    pub fn from_json_str(text: &str) -> SolverResult<Self> {
        let data: InstanceData = serde_json::from_str(text).map_err(|e| SolverError::Parse {
            message: e.to_string(),
        })?;
        data.into_instance()
    }

    /// Number of nodes including the depot.
    pub fn dimension(&self) -> usize {
        self.distance_matrix.size()
    }

    /// Number of stops (excluding the depot).
    pub fn num_stops(&self) -> usize {
        self.dimension() - 1
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix.get(i, j)
    }

    /// Duration matrix, or `MatrixUnavailable` when none was supplied.
    pub fn durations(&self) -> SolverResult<&Matrix> {
        self.duration_matrix
            .as_ref()
            .ok_or(SolverError::MatrixUnavailable)
    }

    pub fn has_time_windows(&self) -> bool {
        !self.time_windows.is_empty()
    }

    /// Window for a node; the depot and unconstrained stops get `[0, +inf)`.
    pub fn time_window(&self, node: usize) -> TimeWindow {
        TimeWindow::for_node(&self.time_windows, node)
    }

    /// Total distance along an explicitly closed tour.
    pub fn tour_length(&self, tour: &[usize]) -> f64 {
        self.distance_matrix.path_cost(tour)
    }

    /// Total travel time along a tour (no waiting).
    pub fn tour_duration(&self, tour: &[usize]) -> SolverResult<f64> {
        Ok(self.durations()?.path_cost(tour))
    }

    /// Index of the node with the given label.
    pub fn location_index(&self, label: &str) -> Option<usize> {
        self.locations.iter().position(|l| l == label)
    }

    /// Copy of this instance with the directed edge `from -> to` forbidden.
    ///
    /// `self` is left untouched so other solves reading it are unaffected.
    pub fn with_forbidden_edge(&self, from: usize, to: usize) -> SolverResult<Self> {
        let n = self.dimension();
        if from >= n || to >= n || from == to {
            return Err(SolverError::invalid_input(format!(
                "cannot forbid edge {} -> {} in a {}-node instance",
                from, to, n
            )));
        }
        let mut copy = self.clone();
        copy.distance_matrix.set(from, to, f64::INFINITY);
        Ok(copy)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension();
        let distances: Vec<f64> = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .filter(|&(i, j)| i != j)
            .map(|(i, j)| self.distance(i, j))
            .filter(|d| d.is_finite())
            .collect();
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        let window_span = if self.has_time_windows() {
            let earliest = self
                .time_windows
                .iter()
                .map(|tw| tw.earliest)
                .fold(f64::INFINITY, f64::min);
            let latest = self
                .time_windows
                .iter()
                .map(|tw| tw.latest)
                .fold(f64::NEG_INFINITY, f64::max);
            Some((earliest, latest))
        } else {
            None
        };

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            symmetric: self.distance_matrix.is_symmetric(1e-9),
            forbidden_edges: self.distance_matrix.forbidden_edges(),
            has_durations: self.duration_matrix.is_some(),
            avg_distance,
            max_distance,
            window_span,
            start_time: self.start_time,
        }
    }
}

fn default_label(index: usize) -> String {
    if index == 0 {
        "Depot".to_string()
    } else {
        format!("Stop {}", index)
    }
}

/// Statistics about an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub symmetric: bool,
    pub forbidden_edges: usize,
    pub has_durations: bool,
    pub avg_distance: f64,
    pub max_distance: f64,
    pub window_span: Option<(f64, f64)>,
    pub start_time: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use crate::time::format_seconds;

        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {} (1 depot + {} stops)", self.dimension, self.dimension - 1)?;
        writeln!(f, "  Symmetric: {}", self.symmetric)?;
        writeln!(f, "  Forbidden edges: {}", self.forbidden_edges)?;
        writeln!(f, "  Duration matrix: {}", if self.has_durations { "yes" } else { "no" })?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)?;
        writeln!(f, "  Start time: {}", format_seconds(self.start_time))?;
        match self.window_span {
            Some((earliest, latest)) => writeln!(
                f,
                "  Time windows: {} .. {}",
                format_seconds(earliest),
                format_seconds(latest)
            ),
            None => writeln!(f, "  Time windows: none"),
        }
    }
}
