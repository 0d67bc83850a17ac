//! # netprep-core: transmission network model
//!
//! Data structures shared by the pre-processing passes that prepare a network
//! for a unit-commitment scheduler:
//!
//! - [`Topology`] owns buses and lines in canonical (insertion) order and keeps
//!   an id → position index so passes can work on dense arrays.
//! - [`ThermalFleet`] records where dispatchable units inject power.
//! - [`equivalence`] folds parallel lines into a single branch.
//! - [`graph_utils`] decomposes a topology into isolated subsystems.
//!
//! All electrical quantities are per-unit on the system power base (see
//! [`units::PowerBase`]). Time series are indexed by scheduling period.
//!
//! ```
//! use netprep_core::*;
//! use netprep_core::units::{Megawatts, PowerBase};
//!
//! let base = PowerBase::default();
//! let mut topology = Topology::new(1);
//! topology.add_bus(Bus::new(BusId::new(1), "north", 1).as_reference())?;
//! topology.add_bus(Bus::new(BusId::new(2), "south", 1).with_net_load(vec![0.4]))?;
//!
//! let params = LineParams::from_rating(0.1, Megawatts(100.0), base, 1);
//! let line = topology.add_or_merge_line(BusId::new(1), BusId::new(2), params.clone())?;
//! let same = topology.add_or_merge_line(BusId::new(2), BusId::new(1), params)?;
//! assert_eq!(line, same);
//! assert!((topology.line(line).unwrap().params.reactance - 0.05).abs() < 1e-12);
//! # Ok::<(), netprep_core::NetError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod equivalence;
pub mod error;
pub mod graph_utils;
pub mod thermal;
pub mod topology;
pub mod units;

pub use equivalence::{equivalence_parallel_lines, merge_parallel, Admittance};
pub use error::{NetError, NetResult};
pub use graph_utils::{decompose, Partition, Subsystem};
pub use thermal::{ThermalFleet, ThermalUnit};
pub use topology::Topology;
pub use units::{Megawatts, PerUnit, PowerBase, MAX_FLOW_MW};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(usize);

macro_rules! impl_id {
    ($type:ident) => {
        impl $type {
            #[inline]
            pub fn new(value: usize) -> Self {
                $type(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_id!(BusId);
impl_id!(LineId);
impl_id!(UnitId);

/// A network node.
///
/// `net_load[t]` is consumption minus fixed (non-dispatchable) generation in
/// period `t`, in p.u. Incident line lists are maintained by [`Topology`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub is_reference: bool,
    pub net_load: Vec<f64>,
    pub(crate) lines_from: Vec<LineId>,
    pub(crate) lines_to: Vec<LineId>,
}

impl Bus {
    /// A bus with zero net load over `periods` periods.
    pub fn new(id: BusId, name: impl Into<String>, periods: usize) -> Self {
        Self {
            id,
            name: name.into(),
            is_reference: false,
            net_load: vec![0.0; periods],
            lines_from: Vec::new(),
            lines_to: Vec::new(),
        }
    }

    pub fn with_net_load(mut self, net_load: Vec<f64>) -> Self {
        self.net_load = net_load;
        self
    }

    pub fn as_reference(mut self) -> Self {
        self.is_reference = true;
        self
    }

    /// Lines whose stored `from` end is this bus.
    pub fn lines_from(&self) -> &[LineId] {
        &self.lines_from
    }

    /// Lines whose stored `to` end is this bus.
    pub fn lines_to(&self) -> &[LineId] {
        &self.lines_to
    }

    pub fn incident_lines(&self) -> impl Iterator<Item = LineId> + '_ {
        self.lines_from.iter().chain(self.lines_to.iter()).copied()
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.lines_from.len() + self.lines_to.len()
    }

    /// True when any period carries a nonzero net load.
    pub fn has_net_load(&self) -> bool {
        self.net_load.iter().any(|v| *v != 0.0)
    }

    pub fn min_net_load(&self) -> f64 {
        self.net_load.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_net_load(&self) -> f64 {
        self.net_load.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Per-period flow bounds in p.u., oriented from the line's `from` bus to its
/// `to` bus.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowBounds {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

impl FlowBounds {
    /// `[-rating, rating]` in every period.
    pub fn symmetric(rating: f64, periods: usize) -> Self {
        Self {
            upper: vec![rating; periods],
            lower: vec![-rating; periods],
        }
    }

    pub fn periods(&self) -> usize {
        self.upper.len()
    }

    /// The same limits seen from the opposite end.
    pub fn reversed(&self) -> Self {
        Self {
            upper: self.lower.iter().map(|v| -v).collect(),
            lower: self.upper.iter().map(|v| -v).collect(),
        }
    }

    pub fn min_upper(&self) -> f64 {
        self.upper.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_upper(&self) -> f64 {
        self.upper.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_lower(&self) -> f64 {
        self.lower.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_lower(&self) -> f64 {
        self.lower.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest flow magnitude allowed in both directions during `period`.
    pub fn capacity(&self, period: usize) -> f64 {
        self.upper[period].min(-self.lower[period])
    }
}

/// Electrical parameters of a branch. Everything except the endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineParams {
    pub name: String,
    pub resistance: f64,
    pub reactance: f64,
    pub shunt_conductance: f64,
    pub shunt_susceptance: f64,
    pub normal: FlowBounds,
    pub emergency: FlowBounds,
    /// False when the rating is the "no limit" sentinel in every period.
    pub capacity_limited: bool,
}

impl LineParams {
    /// Lossless line with a symmetric rating, used for both normal and
    /// emergency bounds.
    pub fn from_rating(reactance: f64, rating: Megawatts, base: PowerBase, periods: usize) -> Self {
        let bounds = FlowBounds::symmetric(base.to_pu(rating).value(), periods);
        Self {
            name: String::new(),
            resistance: 0.0,
            reactance,
            shunt_conductance: 0.0,
            shunt_susceptance: 0.0,
            emergency: bounds.clone(),
            normal: bounds,
            capacity_limited: !base.is_unlimited(rating),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_resistance(mut self, resistance: f64) -> Self {
        self.resistance = resistance;
        self
    }

    /// Parameters seen from the opposite end: bounds flip sign and swap.
    pub fn reversed(&self) -> Self {
        Self {
            normal: self.normal.reversed(),
            emergency: self.emergency.reversed(),
            ..self.clone()
        }
    }

    /// DC series admittance `1/x`.
    #[inline]
    pub fn susceptance(&self) -> f64 {
        1.0 / self.reactance
    }

    pub fn validate(&self, periods: usize) -> NetResult<()> {
        if !self.reactance.is_finite() || self.reactance == 0.0 {
            return Err(NetError::Validation(format!(
                "line '{}' has reactance {}; a DC model needs a finite nonzero reactance",
                self.name, self.reactance
            )));
        }
        for (label, bounds) in [("normal", &self.normal), ("emergency", &self.emergency)] {
            if bounds.upper.len() != periods || bounds.lower.len() != periods {
                return Err(NetError::Inconsistent(format!(
                    "line '{}' has {} {} bounds for {} periods",
                    self.name,
                    bounds.upper.len().max(bounds.lower.len()),
                    label,
                    periods
                )));
            }
            if let Some(t) = (0..periods).find(|&t| bounds.lower[t] > bounds.upper[t]) {
                return Err(NetError::Validation(format!(
                    "line '{}' has {} lower bound above upper bound in period {}",
                    self.name, label, t
                )));
            }
        }
        Ok(())
    }
}

/// A branch between two buses. Endpoints are stored as (smaller id, larger id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub from_bus: BusId,
    pub to_bus: BusId,
    pub params: LineParams,
}

impl Line {
    #[inline]
    pub fn endpoints(&self) -> (BusId, BusId) {
        (self.from_bus, self.to_bus)
    }

    /// The far end as seen from `bus`, or `None` when `bus` is not an endpoint.
    pub fn other_end(&self, bus: BusId) -> Option<BusId> {
        if bus == self.from_bus {
            Some(self.to_bus)
        } else if bus == self.to_bus {
            Some(self.from_bus)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serde_is_transparent() {
        let json = serde_json::to_string(&BusId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: LineId = serde_json::from_str("12").unwrap();
        assert_eq!(back, LineId::new(12));
    }

    #[test]
    fn test_bus_net_load_extremes() {
        let bus = Bus::new(BusId::new(3), "b3", 3).with_net_load(vec![0.2, -0.1, 0.5]);
        assert_eq!(bus.min_net_load(), -0.1);
        assert_eq!(bus.max_net_load(), 0.5);
        assert!(bus.has_net_load());
        assert!(!Bus::new(BusId::new(4), "b4", 3).has_net_load());
    }

    #[test]
    fn test_flow_bounds_reversed() {
        let bounds = FlowBounds {
            upper: vec![1.0, 2.0],
            lower: vec![-0.5, -1.5],
        };
        let rev = bounds.reversed();
        assert_eq!(rev.upper, vec![0.5, 1.5]);
        assert_eq!(rev.lower, vec![-1.0, -2.0]);
        assert_eq!(bounds.capacity(0), 0.5);
    }

    #[test]
    fn test_sentinel_rating_is_not_capacity_limited() {
        let base = PowerBase::default();
        let params = LineParams::from_rating(0.1, Megawatts(MAX_FLOW_MW), base, 2);
        assert!(!params.capacity_limited);
        let params = LineParams::from_rating(0.1, Megawatts(150.0), base, 2);
        assert!(params.capacity_limited);
        assert_eq!(params.normal.upper, vec![1.5, 1.5]);
    }

    #[test]
    fn test_validate_rejects_zero_reactance() {
        let params = LineParams::from_rating(0.0, Megawatts(100.0), PowerBase::default(), 1);
        assert!(matches!(params.validate(1), Err(NetError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_horizon_mismatch() {
        let params = LineParams::from_rating(0.1, Megawatts(100.0), PowerBase::default(), 2);
        assert!(matches!(params.validate(3), Err(NetError::Inconsistent(_))));
    }
}
