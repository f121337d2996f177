//! Time-window feasibility and scheduling.
//!
//! Simulates a tour edge by edge from the depot departure time. The first
//! arrival after a stop's `latest` bound ends the simulation: the tour is
//! infeasible and nothing past that edge is evaluated.

use crate::error::SolverResult;
use crate::instance::{Matrix, TSPInstance, TimeWindow};
use crate::solution::ScheduleEntry;

/// Result of simulating one tour.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Every arrival met its window.
    Feasible {
        /// Final departure minus start time, in seconds
        cost: f64,
        /// One entry per edge, keyed to the destination node
        schedule: Vec<ScheduleEntry>,
    },
    /// Arrival at `node` came after `latest`.
    Infeasible {
        node: usize,
        arrival: f64,
        latest: f64,
        /// Edges simulated, the failing one included
        edges_evaluated: usize,
    },
}

impl Evaluation {
    /// Elapsed seconds, or `+inf` when infeasible.
    pub fn cost(&self) -> f64 {
        match self {
            Evaluation::Feasible { cost, .. } => *cost,
            Evaluation::Infeasible { .. } => f64::INFINITY,
        }
    }

    pub fn is_feasible(&self) -> bool {
        matches!(self, Evaluation::Feasible { .. })
    }

    pub fn schedule(&self) -> Option<&[ScheduleEntry]> {
        match self {
            Evaluation::Feasible { schedule, .. } => Some(schedule),
            Evaluation::Infeasible { .. } => None,
        }
    }

    pub fn into_schedule(self) -> Option<Vec<ScheduleEntry>> {
        match self {
            Evaluation::Feasible { schedule, .. } => Some(schedule),
            Evaluation::Infeasible { .. } => None,
        }
    }
}

/// Simulates tours against a duration matrix and per-stop windows.
pub struct TimeWindowEvaluator<'a> {
    durations: &'a Matrix,
    windows: &'a [TimeWindow],
    start_time: f64,
}

impl<'a> TimeWindowEvaluator<'a> {
    /// `windows[i]` belongs to node `i + 1`; the depot is unconstrained.
    pub fn new(durations: &'a Matrix, windows: &'a [TimeWindow], start_time: f64) -> Self {
        TimeWindowEvaluator {
            durations,
            windows,
            start_time,
        }
    }

    /// Evaluator over an instance's duration matrix, windows and start time.
    pub fn for_instance(instance: &'a TSPInstance) -> SolverResult<Self> {
        Ok(Self::new(
            instance.durations()?,
            &instance.time_windows,
            instance.start_time,
        ))
    }

    pub fn evaluate(&self, tour: &[usize]) -> Evaluation {
        let mut clock = self.start_time;
        let mut schedule = Vec::with_capacity(tour.len().saturating_sub(1));

        for (edge, pair) in tour.windows(2).enumerate() {
            let (from, to) = (pair[0], pair[1]);
            let arrival = clock + self.durations.get(from, to);
            let window = TimeWindow::for_node(self.windows, to);

            // A forbidden (+inf) edge never arrives, even at the unbounded depot.
            if !arrival.is_finite() || window.is_violated(arrival) {
                return Evaluation::Infeasible {
                    node: to,
                    arrival,
                    latest: window.latest,
                    edges_evaluated: edge + 1,
                };
            }

            let wait = window.waiting_time(arrival);
            let departure = arrival + wait;
            schedule.push(ScheduleEntry {
                node: to,
                arrival,
                wait,
                departure,
            });
            clock = departure;
        }

        Evaluation::Feasible {
            cost: clock - self.start_time,
            schedule,
        }
    }
}
