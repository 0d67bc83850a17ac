//! Mid-point buses: no unit, no net load, not a reference.
//!
//! Such a bus only relays flow. What to do with it is pluggable through
//! [`MidpointEliminator`].

use netprep_core::{BusId, FlowBounds, LineId, LineParams, NetResult, Topology};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elimination {
    /// The bus stays.
    Kept,
    /// The bus and its lines are gone; `line` now carries the flow.
    Replaced { line: LineId },
}

pub trait MidpointEliminator: Send + Sync {
    fn eliminate(&self, topology: &mut Topology, bus: BusId) -> NetResult<Elimination>;
}

/// Leaves every mid-point bus in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepMidpoints;

impl MidpointEliminator for KeepMidpoints {
    fn eliminate(&self, _topology: &mut Topology, _bus: BusId) -> NetResult<Elimination> {
        Ok(Elimination::Kept)
    }
}

/// Replaces a degree-2 mid-point `a - m - b` by one series branch `a - b`,
/// merged into an existing `a - b` line if there is one. Other degrees are
/// left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesEliminator;

fn intersect(first: &FlowBounds, second: &FlowBounds) -> FlowBounds {
    FlowBounds {
        upper: first.upper.iter().zip(&second.upper).map(|(a, b)| a.min(*b)).collect(),
        lower: first.lower.iter().zip(&second.lower).map(|(a, b)| a.max(*b)).collect(),
    }
}

/// Two lines in series, both oriented along the path.
pub fn series_params(first: &LineParams, second: &LineParams) -> LineParams {
    LineParams {
        name: format!("{}+{}", first.name, second.name),
        resistance: first.resistance + second.resistance,
        reactance: first.reactance + second.reactance,
        shunt_conductance: first.shunt_conductance + second.shunt_conductance,
        shunt_susceptance: first.shunt_susceptance + second.shunt_susceptance,
        normal: intersect(&first.normal, &second.normal),
        emergency: intersect(&first.emergency, &second.emergency),
        capacity_limited: first.capacity_limited || second.capacity_limited,
    }
}

impl MidpointEliminator for SeriesEliminator {
    fn eliminate(&self, topology: &mut Topology, bus: BusId) -> NetResult<Elimination> {
        let node = topology.bus_or_err(bus)?;
        if node.degree() != 2 || node.is_reference {
            return Ok(Elimination::Kept);
        }
        let neighbors = topology.neighbors(bus)?;
        let [(l1, a), (l2, b)] = [neighbors[0], neighbors[1]];
        if a == b {
            return Ok(Elimination::Kept);
        }

        let first = topology.line_or_err(l1)?;
        let into_mid = if first.from_bus == a {
            first.params.clone()
        } else {
            first.params.reversed()
        };
        let second = topology.line_or_err(l2)?;
        let out_of_mid = if second.from_bus == bus {
            second.params.clone()
        } else {
            second.params.reversed()
        };
        let series = series_params(&into_mid, &out_of_mid);

        topology.remove_line(l1)?;
        topology.remove_line(l2)?;
        topology.remove_bus(bus)?;
        let line = topology.add_or_merge_line(a, b, series)?;
        debug!(bus = %bus, from = %a, to = %b, line = %line, "eliminated mid-point");
        Ok(Elimination::Replaced { line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netprep_core::units::{Megawatts, PowerBase};
    use netprep_core::Bus;

    fn chain() -> Topology {
        let base = PowerBase::default();
        let mut topology = Topology::new(1);
        for id in 1..=3 {
            topology.add_bus(Bus::new(BusId::new(id), format!("b{id}"), 1)).unwrap();
        }
        let mut first = LineParams::from_rating(0.1, Megawatts(100.0), base, 1);
        first.normal.lower = vec![-0.4];
        topology.push_line(BusId::new(1), BusId::new(2), first).unwrap();
        // stored as 2 -> 3 with [-0.8, 0.6]
        let mut second = LineParams::from_rating(0.3, Megawatts(60.0), base, 1);
        second.normal.lower = vec![-0.8];
        topology.push_line(BusId::new(2), BusId::new(3), second).unwrap();
        topology
    }

    #[test]
    fn test_series_branch_replaces_midpoint() {
        let mut topology = chain();
        let outcome = SeriesEliminator.eliminate(&mut topology, BusId::new(2)).unwrap();
        let Elimination::Replaced { line } = outcome else {
            panic!("expected elimination");
        };
        assert_eq!(topology.num_buses(), 2);
        assert_eq!(topology.num_lines(), 1);
        let line = topology.line(line).unwrap();
        assert_eq!(line.endpoints(), (BusId::new(1), BusId::new(3)));
        assert!((line.params.reactance - 0.4).abs() < 1e-12);
        assert!((line.params.normal.upper[0] - 0.6).abs() < 1e-12);
        assert!((line.params.normal.lower[0] + 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_keeps_other_degrees() {
        let mut topology = chain();
        assert_eq!(
            SeriesEliminator.eliminate(&mut topology, BusId::new(1)).unwrap(),
            Elimination::Kept
        );
        assert_eq!(KeepMidpoints.eliminate(&mut topology, BusId::new(2)).unwrap(), Elimination::Kept);
        assert_eq!(topology.num_buses(), 3);
    }

    #[test]
    fn test_merges_into_existing_chord() {
        let mut topology = chain();
        let chord = LineParams::from_rating(0.4, Megawatts(100.0), PowerBase::default(), 1);
        let existing = topology.push_line(BusId::new(1), BusId::new(3), chord).unwrap();
        let outcome = SeriesEliminator.eliminate(&mut topology, BusId::new(2)).unwrap();
        assert_eq!(outcome, Elimination::Replaced { line: existing });
        assert_eq!(topology.num_lines(), 1);
        assert!((topology.line(existing).unwrap().params.reactance - 0.2).abs() < 1e-12);
    }
}
