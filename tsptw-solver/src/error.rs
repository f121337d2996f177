//! Error types shared by every solver in the crate.

/// Failures that end a solve call.
///
/// None of these are retried inside the solvers. Retrying matrix retrieval is
/// the job of whoever produces the matrices.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The request cannot be solved as given (no stops, bad matrix shape, ...).
    InvalidInput {
        reason: String,
    },
    /// No distance (or duration) matrix was supplied.
    MatrixUnavailable,
    /// Nearest neighbor got stuck: every remaining stop is behind a forbidden edge.
    DisconnectedGraph {
        from: usize,
        unvisited: Vec<usize>,
    },
    /// Time-windowed annealing never found a tour that meets every window.
    InfeasibleTimeWindow,
    /// Reading an instance or config file failed.
    Io {
        path: String,
        message: String,
    },
    /// An instance or config file could not be parsed.
    Parse {
        message: String,
    },
}

impl SolverError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        SolverError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::InvalidInput { reason } => write!(f, "Invalid input: {}", reason),
            SolverError::MatrixUnavailable => {
                write!(f, "No distance/duration matrix available for this request")
            }
            SolverError::DisconnectedGraph { from, unvisited } => write!(
                f,
                "Graph not connected: no reachable stop from node {} (unvisited: {:?})",
                from, unvisited
            ),
            SolverError::InfeasibleTimeWindow => {
                write!(f, "Cannot find a valid route with the given time windows")
            }
            SolverError::Io { path, message } => {
                write!(f, "Cannot read '{}': {}", path, message)
            }
            SolverError::Parse { message } => write!(f, "Parse error: {}", message),
        }
    }
}

impl std::error::Error for SolverError {}

pub type SolverResult<T> = std::result::Result<T, SolverError>;
