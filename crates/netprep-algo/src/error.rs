//! Error type for the pre-processing passes.

use std::path::PathBuf;

use netprep_core::{LineId, NetError};
use thiserror::Error;

/// Errors from PTDF assembly, reduction, tightening and the pipeline driver.
///
/// Running out of time is not an error: the tightener reports it in its
/// summary and keeps every bound it could not rule out.
#[derive(Debug, Error)]
pub enum PrepError {
    /// Inconsistent or invalid network data
    #[error(transparent)]
    Network(#[from] NetError),

    /// The reduced susceptance matrix of a subsystem could not be inverted
    #[error("Singular susceptance matrix in subsystem {subsystem}: {detail}")]
    SingularMatrix { subsystem: usize, detail: String },

    /// The angle model has no feasible point. The model is written to
    /// `tightening.diagnostics_dir` first; `diagnostics` holds the file, or
    /// `None` when it could not be written
    #[error("Angle model is infeasible while examining line {line}{}", diagnostics_suffix(.diagnostics))]
    InfeasibleAngleModel {
        line: LineId,
        diagnostics: Option<PathBuf>,
    },

    /// The LP backend failed for a reason other than infeasibility or time
    #[error("Solver error: {0}")]
    Solver(String),

    /// Reduction left nothing a flow-based model could use
    #[error("Degenerate topology: {0}")]
    DegenerateTopology(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn diagnostics_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" (model written to {})", path.display()),
        None => String::new(),
    }
}

pub type PrepResult<T> = Result<T, PrepError>;

impl From<toml::de::Error> for PrepError {
    fn from(err: toml::de::Error) -> Self {
        PrepError::Config(err.to_string())
    }
}
