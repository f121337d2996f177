//! Solver configuration, loadable from a TOML file.
//!
//! ```toml
//! seed = 7
//! exact_max_nodes = 12
//!
//! [annealing]
//! cooling_rate = 0.99
//! ```
//!
//! Every key is optional; missing keys take their default.

use crate::error::{SolverError, SolverResult};
use crate::exact::MAX_SUPPORTED_NODES;
use crate::heuristics::annealing::AnnealingConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Seed for the CLI's random generator
    pub seed: u64,
    pub annealing: AnnealingConfig,
    /// Largest dimension (depot included) handed to A*
    pub exact_max_nodes: usize,
    /// Cap on 3-opt moves per run
    pub three_opt_max_restarts: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            seed: 42,
            annealing: AnnealingConfig::default(),
            exact_max_nodes: 15,
            three_opt_max_restarts: 100_000,
        }
    }
}

impl SolverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let path = path.as_ref();
        let mut text = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut text))
            .map_err(|e| SolverError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> SolverResult<Self> {
        let config: SolverConfig = toml::from_str(text).map_err(|e| SolverError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SolverResult<()> {
        self.annealing.validate()?;
        if self.exact_max_nodes > MAX_SUPPORTED_NODES {
            return Err(SolverError::invalid_input(format!(
                "exact_max_nodes is {}, A* supports at most {} nodes",
                self.exact_max_nodes, MAX_SUPPORTED_NODES
            )));
        }
        Ok(())
    }
}
