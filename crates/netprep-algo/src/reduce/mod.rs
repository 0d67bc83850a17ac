//! Topological reduction.
//!
//! An end-of-line bus hangs off the network by a single line that can carry
//! anything the bus could ever inject or absorb. Folding it into its neighbour
//! (net load added, units reattached) leaves every other flow unchanged.
//! Removing one end-of-line bus can expose another, and eliminating
//! mid-points can expose more, so the passes repeat until nothing is left to
//! remove.

use std::collections::HashSet;

use netprep_core::{Bus, BusId, LineId, NetError, NetResult, ThermalFleet, Topology};
use tracing::{debug, info};

use crate::config::ReductionConfig;
use crate::error::{PrepError, PrepResult};
use crate::tighten::ActiveBoundSet;

mod midpoint;

pub use midpoint::{series_params, Elimination, KeepMidpoints, MidpointEliminator, SeriesEliminator};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReductionReport {
    pub passes: usize,
    pub buses_removed: Vec<BusId>,
    pub lines_removed: usize,
    pub midpoints_eliminated: usize,
    /// Lines created or re-parameterized by mid-point elimination.
    pub touched_lines: HashSet<LineId>,
}

impl ReductionReport {
    pub fn is_noop(&self) -> bool {
        self.buses_removed.is_empty() && self.lines_removed == 0
    }
}

/// A line has no effective limit when it was never capacity-limited or when
/// tightening has shown none of its bounds can bind.
fn unlimited(topology: &Topology, line: LineId, flags: Option<&ActiveBoundSet>) -> NetResult<bool> {
    let params = &topology.line_or_err(line)?.params;
    let cleared = flags
        .and_then(|f| f.get(line))
        .is_some_and(|lf| !lf.any_active());
    Ok(!params.capacity_limited || cleared)
}

/// True when `bus` hangs off a single line able to carry its extreme
/// injection and withdrawal in every period.
pub fn is_end_of_line(
    topology: &Topology,
    fleet: &ThermalFleet,
    flags: Option<&ActiveBoundSet>,
    bus: &Bus,
) -> NetResult<bool> {
    if bus.degree() != 1 || bus.is_reference {
        return Ok(false);
    }
    let Some(line_id) = bus.incident_lines().next() else {
        return Ok(false);
    };
    if unlimited(topology, line_id, flags)? {
        return Ok(true);
    }

    let bounds = &topology.line_or_err(line_id)?.params.normal;
    let max_gen = fleet.max_generation_at(bus.id);
    let min_load = bus.min_net_load().min(0.0);
    let max_load = bus.max_net_load().max(0.0);
    Ok((0..topology.periods()).all(|t| {
        let capacity = bounds.capacity(t);
        (max_gen - min_load).abs() <= capacity && max_load.abs() <= capacity
    }))
}

pub fn end_of_line_candidates(
    topology: &Topology,
    fleet: &ThermalFleet,
    flags: Option<&ActiveBoundSet>,
) -> NetResult<Vec<BusId>> {
    let mut out = Vec::new();
    for bus in topology.buses() {
        if is_end_of_line(topology, fleet, flags, bus)? {
            out.push(bus.id);
        }
    }
    Ok(out)
}

/// Folds an end-of-line bus into its neighbour. Returns `false` when the bus
/// has meanwhile lost its last line and was left alone.
pub fn remove_end_of_line_bus(topology: &mut Topology, fleet: &mut ThermalFleet, bus: BusId) -> NetResult<bool> {
    let neighbors = topology.neighbors(bus)?;
    let (line, neighbor) = match neighbors.as_slice() {
        [] => return Ok(false),
        [only] => *only,
        _ => {
            return Err(NetError::Inconsistent(format!(
                "bus {bus} has {} lines and is not an end-of-line bus",
                neighbors.len()
            )))
        }
    };

    topology.remove_line(line)?;
    let removed = topology.remove_bus(bus)?;
    topology.add_net_load(neighbor, &removed.net_load)?;
    let moved = fleet.reattach(bus, neighbor);
    debug!(bus = %bus, into = %neighbor, units = moved, "folded end-of-line bus");
    Ok(true)
}

/// Non-reference buses with no unit and no net load in any period.
pub fn midpoint_buses(topology: &Topology, fleet: &ThermalFleet) -> Vec<BusId> {
    topology
        .buses()
        .iter()
        .filter(|b| !b.is_reference && !b.has_net_load() && !fleet.has_unit_at(b.id))
        .map(|b| b.id)
        .collect()
}

/// Repeats end-of-line removal and mid-point elimination until no end-of-line
/// bus is left.
pub fn reduce(
    topology: &mut Topology,
    fleet: &mut ThermalFleet,
    flags: Option<&ActiveBoundSet>,
    eliminator: &dyn MidpointEliminator,
    config: &ReductionConfig,
) -> PrepResult<ReductionReport> {
    let lines_before = topology.num_lines();
    let mut report = ReductionReport::default();

    let mut candidates = end_of_line_candidates(topology, fleet, flags)?;
    loop {
        report.passes += 1;
        for bus in candidates {
            if remove_end_of_line_bus(topology, fleet, bus)? {
                report.buses_removed.push(bus);
            }
        }

        for bus in midpoint_buses(topology, fleet) {
            if topology.bus(bus).is_none() {
                continue;
            }
            if let Elimination::Replaced { line } = eliminator.eliminate(topology, bus)? {
                report.midpoints_eliminated += 1;
                report.buses_removed.push(bus);
                report.touched_lines.insert(line);
            }
        }

        candidates = end_of_line_candidates(topology, fleet, flags)?;
        if candidates.is_empty() {
            break;
        }
    }
    report.lines_removed = lines_before.saturating_sub(topology.num_lines());

    info!(
        passes = report.passes,
        buses_removed = report.buses_removed.len(),
        lines_removed = report.lines_removed,
        midpoints = report.midpoints_eliminated,
        buses = topology.num_buses(),
        lines = topology.num_lines(),
        "reduced network"
    );

    if config.require_flow_model && topology.num_lines() == 0 {
        return Err(PrepError::DegenerateTopology(format!(
            "no line left after reduction ({} buses remain) but a flow-based network model was requested",
            topology.num_buses()
        )));
    }
    Ok(report)
}
