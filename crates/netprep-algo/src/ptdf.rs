//! Power Transfer Distribution Factors.
//!
//! PTDF[ℓ,n] = sensitivity of flow on line ℓ to a unit injection at bus n,
//! withdrawn at the reference bus of n's subsystem:
//!
//! ```text
//! ΔP_ℓ = PTDF[ℓ,n] × ΔP_injection_n
//! ```
//!
//! Each isolated subsystem is solved on its own:
//!
//! 1. B = Aᵗ·Y·A with A the line-bus incidence (+1 at `from`, -1 at `to`)
//!    and Y = diag(1/x)
//! 2. X = (B without the reference row/column)⁻¹, padded back with a zero
//!    row/column at the reference
//! 3. block = Y·A·X, so PTDF[ℓ,n] = (X[from,n] - X[to,n]) / x_ℓ
//!
//! and the blocks are scattered into one dense (#lines × #buses) table.
//! Entries across subsystems are structurally zero.

use std::collections::{HashMap, HashSet};

use faer::{prelude::*, solvers::PartialPivLu, Mat};
use netprep_core::{decompose, BusId, LineId, NetError, Subsystem, Topology};
use rayon::prelude::*;
use tracing::{debug, info};
use web_time::Instant;

use crate::config::PtdfConfig;
use crate::error::{PrepError, PrepResult};

/// Dense PTDF table over the current topology version.
///
/// Rows follow the topology's line order, columns its bus order.
#[derive(Debug, Clone)]
pub struct PtdfTable {
    /// Row index → line ID
    pub line_ids: Vec<LineId>,
    /// Column index → bus ID
    pub bus_ids: Vec<BusId>,
    /// PTDF values: ptdf[line_idx][bus_idx]
    values: Vec<Vec<f64>>,
    line_to_idx: HashMap<LineId, usize>,
    bus_to_idx: HashMap<BusId, usize>,
}

impl PtdfTable {
    fn zeros(topology: &Topology) -> Self {
        let line_ids: Vec<LineId> = topology.lines().iter().map(|l| l.id).collect();
        let bus_ids: Vec<BusId> = topology.buses().iter().map(|b| b.id).collect();
        Self {
            values: vec![vec![0.0; bus_ids.len()]; line_ids.len()],
            line_to_idx: line_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect(),
            bus_to_idx: bus_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect(),
            line_ids,
            bus_ids,
        }
    }

    /// PTDF of line ℓ with respect to injection at bus n.
    pub fn get(&self, line: LineId, bus: BusId) -> Option<f64> {
        let row = self.line_to_idx.get(&line)?;
        let col = self.bus_to_idx.get(&bus)?;
        Some(self.values[*row][*col])
    }

    pub fn get_by_idx(&self, line_idx: usize, bus_idx: usize) -> f64 {
        self.values
            .get(line_idx)
            .and_then(|row| row.get(bus_idx))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, line: LineId) -> Option<&[f64]> {
        self.line_to_idx.get(&line).map(|&i| self.values[i].as_slice())
    }

    pub fn num_lines(&self) -> usize {
        self.line_ids.len()
    }

    pub fn num_buses(&self) -> usize {
        self.bus_ids.len()
    }

    /// Line flows for a vector of bus injections in column order.
    pub fn flows(&self, injections: &[f64]) -> PrepResult<Vec<f64>> {
        if injections.len() != self.num_buses() {
            return Err(NetError::Inconsistent(format!(
                "{} injections for {} buses",
                injections.len(),
                self.num_buses()
            ))
            .into());
        }
        Ok(self
            .values
            .iter()
            .map(|row| row.iter().zip(injections).map(|(p, inj)| p * inj).sum())
            .collect())
    }

    /// Number of stored nonzero coefficients.
    pub fn nnz(&self) -> usize {
        self.values
            .iter()
            .map(|row| row.iter().filter(|v| **v != 0.0).count())
            .sum()
    }
}

/// One subsystem's contribution: rows/columns are global positions.
struct SubsystemBlock {
    line_positions: Vec<usize>,
    bus_positions: Vec<usize>,
    values: Mat<f64>,
}

fn ensure_no_parallel_lines(topology: &Topology) -> PrepResult<()> {
    let mut seen = HashSet::new();
    for line in topology.lines() {
        if !seen.insert(line.endpoints()) {
            let (a, b) = line.endpoints();
            return Err(NetError::Inconsistent(format!(
                "there are parallel lines between bus {a} and bus {b}; equivalence them before building the PTDF"
            ))
            .into());
        }
    }
    Ok(())
}

fn subsystem_block(
    key: usize,
    subsystem: &Subsystem,
    reference: BusId,
    topology: &Topology,
    tolerance: f64,
) -> PrepResult<SubsystemBlock> {
    let n = subsystem.nodes.len();
    let local: HashMap<BusId, usize> = subsystem
        .nodes
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    let r = local[&reference];

    // (line position, local from, local to, 1/x)
    let mut lines = Vec::with_capacity(subsystem.edges.len());
    for &(a, b) in &subsystem.edges {
        let id = topology.line_between(a, b).ok_or_else(|| {
            NetError::Inconsistent(format!("edge ({a}, {b}) of subsystem {key} has no matching line"))
        })?;
        let pos = topology.line_position(id).ok_or(NetError::UnknownLine(id))?;
        let line = &topology.lines()[pos];
        lines.push((pos, local[&line.from_bus], local[&line.to_bus], line.params.susceptance()));
    }

    // B = AᵗYA, assembled line by line
    let mut b = Mat::<f64>::zeros(n, n);
    for &(_, i, j, y) in &lines {
        b.write(i, i, b.read(i, i) + y);
        b.write(j, j, b.read(j, j) + y);
        b.write(i, j, b.read(i, j) - y);
        b.write(j, i, b.read(j, i) - y);
    }

    let keep: Vec<usize> = (0..n).filter(|&k| k != r).collect();
    let reduced = Mat::from_fn(n - 1, n - 1, |i, j| b.read(keep[i], keep[j]));
    let identity = Mat::from_fn(n - 1, n - 1, |i, j| if i == j { 1.0 } else { 0.0 });
    let lu = PartialPivLu::new(reduced.as_ref());
    let inverse = lu.solve(&identity);

    for i in 0..n - 1 {
        for j in 0..n - 1 {
            if !inverse.read(i, j).is_finite() {
                return Err(PrepError::SingularMatrix {
                    subsystem: key,
                    detail: format!("non-finite entry at ({i}, {j}) of the reduced inverse"),
                });
            }
        }
    }

    // Zero-padded inverse: the reference row and column vanish
    let x = |i: usize, j: usize| -> f64 {
        if i == r || j == r {
            return 0.0;
        }
        let pi = if i < r { i } else { i - 1 };
        let pj = if j < r { j } else { j - 1 };
        inverse.read(pi, pj)
    };

    let values = Mat::from_fn(lines.len(), n, |row, col| {
        let (_, i, j, y) = lines[row];
        let v = y * (x(i, col) - x(j, col));
        if v.abs() < tolerance {
            0.0
        } else {
            v
        }
    });

    let bus_positions = subsystem
        .nodes
        .iter()
        .map(|id| topology.bus_position(*id).ok_or(NetError::UnknownBus(*id)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SubsystemBlock {
        line_positions: lines.iter().map(|l| l.0).collect(),
        bus_positions,
        values,
    })
}

/// Builds the PTDF table of `topology`.
///
/// Fails when two lines still share an endpoint pair; run
/// [`netprep_core::equivalence_parallel_lines`] first.
pub fn build_ptdf(topology: &Topology, config: &PtdfConfig) -> PrepResult<PtdfTable> {
    let start = Instant::now();
    ensure_no_parallel_lines(topology)?;

    let partition = decompose(topology);
    let jobs: Vec<(usize, &Subsystem, BusId)> = partition
        .iter()
        .filter(|(_, s)| !s.is_singleton())
        .filter_map(|(key, s)| partition.reference_bus(key, topology).map(|r| (key, s, r)))
        .collect();

    let blocks = jobs
        .par_iter()
        .map(|(key, subsystem, reference)| {
            subsystem_block(*key, subsystem, *reference, topology, config.coeff_tolerance)
        })
        .collect::<PrepResult<Vec<_>>>()?;

    let mut table = PtdfTable::zeros(topology);
    for block in &blocks {
        for (row, &line_pos) in block.line_positions.iter().enumerate() {
            for (col, &bus_pos) in block.bus_positions.iter().enumerate() {
                table.values[line_pos][bus_pos] = block.values.read(row, col);
            }
        }
    }

    debug!(subsystems = partition.len(), solved = blocks.len(), "assembled PTDF blocks");
    info!(
        lines = table.num_lines(),
        buses = table.num_buses(),
        nnz = table.nnz(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "built PTDF"
    );
    Ok(table)
}
