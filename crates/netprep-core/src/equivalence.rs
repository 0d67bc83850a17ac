//! Parallel-line equivalencing.
//!
//! Two branches between the same pair of buses are replaced by one branch with
//! the summed series admittance:
//!
//! ```text
//! g = r / (r² + x²)        b = -x / (r² + x²)
//! y_eq = y₁ + y₂
//! r_eq = g_eq / |y_eq|²    x_eq = -b_eq / |y_eq|²
//! ```
//!
//! Flow limits are carried through the voltage-product bound `rating / |y|`:
//! the tighter of the two lines' products, rescaled by `|y_eq|`. This assumes
//! both lines see the same voltage difference, which holds exactly for true
//! parallel lines under the DC approximation.

use std::collections::HashMap;
use std::ops::Add;

use tracing::debug;

use crate::{BusId, FlowBounds, LineId, LineParams, NetError, NetResult, Topology};

/// Series admittance `g + jb` of a branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admittance {
    pub g: f64,
    pub b: f64,
}

impl Admittance {
    pub fn from_impedance(r: f64, x: f64) -> NetResult<Self> {
        let z2 = r * r + x * x;
        if z2 == 0.0 || !z2.is_finite() {
            return Err(NetError::Validation(format!(
                "impedance {r} + j{x} has no finite admittance"
            )));
        }
        Ok(Self {
            g: r / z2,
            b: -x / z2,
        })
    }

    #[inline]
    pub fn magnitude(&self) -> f64 {
        self.g.hypot(self.b)
    }

    /// Back to `(r, x)`.
    pub fn to_impedance(&self) -> NetResult<(f64, f64)> {
        let y2 = self.g * self.g + self.b * self.b;
        if y2 == 0.0 {
            return Err(NetError::Validation("zero admittance has no impedance".into()));
        }
        Ok((self.g / y2, -self.b / y2))
    }
}

impl Add for Admittance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            g: self.g + rhs.g,
            b: self.b + rhs.b,
        }
    }
}

fn merge_bounds(
    first: &FlowBounds,
    y1: f64,
    second: &FlowBounds,
    y2: f64,
    y_eq: f64,
) -> NetResult<FlowBounds> {
    if first.periods() != second.periods() || first.lower.len() != second.lower.len() {
        return Err(NetError::Inconsistent(format!(
            "parallel lines carry {} and {} periods of bounds",
            first.periods(),
            second.periods()
        )));
    }
    let upper = first
        .upper
        .iter()
        .zip(&second.upper)
        .map(|(u1, u2)| (u1 / y1).min(u2 / y2) * y_eq)
        .collect();
    let lower = first
        .lower
        .iter()
        .zip(&second.lower)
        .map(|(l1, l2)| (l1 / y1).max(l2 / y2) * y_eq)
        .collect();
    Ok(FlowBounds { upper, lower })
}

/// Equivalent parameters of two lines sharing both endpoints. Both must be
/// oriented the same way. The result keeps `existing`'s name.
pub fn merge_parallel(existing: &LineParams, incoming: &LineParams) -> NetResult<LineParams> {
    let y1 = Admittance::from_impedance(existing.resistance, existing.reactance)?;
    let y2 = Admittance::from_impedance(incoming.resistance, incoming.reactance)?;
    let y_eq = y1 + y2;
    let (resistance, reactance) = y_eq.to_impedance()?;
    let (m1, m2, m_eq) = (y1.magnitude(), y2.magnitude(), y_eq.magnitude());

    Ok(LineParams {
        name: existing.name.clone(),
        resistance,
        reactance,
        shunt_conductance: existing.shunt_conductance + incoming.shunt_conductance,
        shunt_susceptance: existing.shunt_susceptance + incoming.shunt_susceptance,
        normal: merge_bounds(&existing.normal, m1, &incoming.normal, m2, m_eq)?,
        emergency: merge_bounds(&existing.emergency, m1, &incoming.emergency, m2, m_eq)?,
        capacity_limited: existing.capacity_limited || incoming.capacity_limited,
    })
}

impl Topology {
    /// Adds a line, or folds it into the line already joining the same buses.
    /// Returns the id of the line that now represents the pair.
    pub fn add_or_merge_line(&mut self, from: BusId, to: BusId, params: LineParams) -> NetResult<LineId> {
        let Some(existing) = self.line_between(from, to) else {
            return self.push_line(from, to, params);
        };
        params.validate(self.periods())?;
        let line = self.line_or_err(existing)?;
        let incoming = if line.from_bus == from { params } else { params.reversed() };
        let merged = merge_parallel(&line.params, &incoming)?;
        debug!(line = %existing, from = %from, to = %to, x_eq = merged.reactance, "merged parallel line");
        *self.line_params_mut(existing)? = merged;
        Ok(existing)
    }
}

/// Folds every group of parallel lines already present in `topology` into the
/// first line of the group (canonical order). Returns one `(removed, kept)`
/// pair per line folded away, in the order the merges were applied.
pub fn equivalence_parallel_lines(topology: &mut Topology) -> NetResult<Vec<(LineId, LineId)>> {
    let mut first: HashMap<(BusId, BusId), LineId> = HashMap::new();
    let mut duplicates = Vec::new();
    for line in topology.lines() {
        match first.get(&line.endpoints()) {
            Some(target) => duplicates.push((line.id, *target)),
            None => {
                first.insert(line.endpoints(), line.id);
            }
        }
    }

    for (dup, target) in &duplicates {
        let removed = topology.remove_line(*dup)?;
        let merged = merge_parallel(&topology.line_or_err(*target)?.params, &removed.params)?;
        *topology.line_params_mut(*target)? = merged;
    }
    if !duplicates.is_empty() {
        debug!(merged = duplicates.len(), "equivalenced parallel lines");
    }
    Ok(duplicates)
}
