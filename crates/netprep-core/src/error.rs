//! Error type for the network data model.
//!
//! Everything that mutates a [`Topology`](crate::Topology) or a
//! [`ThermalFleet`](crate::ThermalFleet) reports failures through
//! [`NetError`]. Algorithms built on top of the model wrap it in their own
//! error enums.
//!
//! # Example
//!
//! ```
//! use netprep_core::{BusId, NetResult, Topology};
//!
//! fn first_bus_degree(topology: &Topology) -> NetResult<usize> {
//!     let bus = topology.bus_or_err(BusId::new(1))?;
//!     Ok(bus.degree())
//! }
//! ```

use thiserror::Error;

use crate::{BusId, LineId};

/// Errors raised while building or mutating the network model.
#[derive(Error, Debug)]
pub enum NetError {
    /// I/O errors (diagnostic files, fixtures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model contradicts itself (dangling references, parallel lines where
    /// none are allowed, mismatched horizons)
    #[error("Inconsistent network data: {0}")]
    Inconsistent(String),

    /// A referenced bus does not exist
    #[error("Unknown bus {0}")]
    UnknownBus(BusId),

    /// A referenced line does not exist
    #[error("Unknown line {0}")]
    UnknownLine(LineId),

    /// Physically meaningless values (zero impedance, negative capacity)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using NetError.
pub type NetResult<T> = Result<T, NetError>;

impl From<String> for NetError {
    fn from(s: String) -> Self {
        NetError::Inconsistent(s)
    }
}

impl From<&str> for NetError {
    fn from(s: &str) -> Self {
        NetError::Inconsistent(s.to_string())
    }
}
