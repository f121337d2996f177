//! Heuristics module.
//!
//! This module exports the construction, local search and annealing
//! heuristics, plus the time-window evaluator the annealing relies on.

pub mod construction;
pub mod local_search;
pub mod time_window;
pub mod annealing;

pub use construction::*;
pub use local_search::*;
pub use time_window::*;
pub use annealing::*;
