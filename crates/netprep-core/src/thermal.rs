//! Dispatchable units and where they inject.

use serde::{Deserialize, Serialize};

use crate::{BusId, NetError, NetResult, UnitId};

/// A dispatchable unit. `attachments` lists the buses it injects into and the
/// share of its output each receives; a plain unit has one entry with
/// coefficient 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalUnit {
    pub id: UnitId,
    pub name: String,
    pub min_p: f64,
    pub max_p: f64,
    pub attachments: Vec<(BusId, f64)>,
}

impl ThermalUnit {
    pub fn new(id: UnitId, name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id,
            name: name.into(),
            min_p: 0.0,
            max_p: 0.0,
            attachments: vec![(bus, 1.0)],
        }
    }

    pub fn with_p_limits(mut self, min_p: f64, max_p: f64) -> Self {
        self.min_p = min_p;
        self.max_p = max_p;
        self
    }

    /// Share of this unit's output injected at `bus`.
    pub fn coefficient_at(&self, bus: BusId) -> f64 {
        self.attachments
            .iter()
            .filter(|(b, _)| *b == bus)
            .map(|(_, c)| c)
            .sum()
    }

    fn reattach(&mut self, from: BusId, to: BusId) {
        let moved: f64 = self
            .attachments
            .iter()
            .filter(|(b, _)| *b == from)
            .map(|(_, c)| c)
            .sum();
        if moved == 0.0 {
            return;
        }
        self.attachments.retain(|(b, _)| *b != from);
        match self.attachments.iter_mut().find(|(b, _)| *b == to) {
            Some((_, coeff)) => *coeff += moved,
            None => self.attachments.push((to, moved)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalFleet {
    units: Vec<ThermalUnit>,
}

impl ThermalFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, unit: ThermalUnit) -> NetResult<()> {
        if self.units.iter().any(|u| u.id == unit.id) {
            return Err(NetError::Inconsistent(format!("thermal unit {} declared twice", unit.id)));
        }
        if unit.max_p < unit.min_p {
            return Err(NetError::Validation(format!(
                "thermal unit {} has max_p {} below min_p {}",
                unit.id, unit.max_p, unit.min_p
            )));
        }
        self.units.push(unit);
        Ok(())
    }

    pub fn units(&self) -> &[ThermalUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&ThermalUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn units_at(&self, bus: BusId) -> impl Iterator<Item = &ThermalUnit> + '_ {
        self.units
            .iter()
            .filter(move |u| u.attachments.iter().any(|(b, _)| *b == bus))
    }

    pub fn has_unit_at(&self, bus: BusId) -> bool {
        self.units_at(bus).next().is_some()
    }

    /// Largest dispatchable injection at `bus`: Σ coefficient × max_p.
    pub fn max_generation_at(&self, bus: BusId) -> f64 {
        self.units_at(bus).map(|u| u.coefficient_at(bus) * u.max_p).sum()
    }

    /// Moves every attachment at `from` onto `to`, merging coefficients when a
    /// unit already injects at `to`. Returns the number of units touched.
    pub fn reattach(&mut self, from: BusId, to: BusId) -> usize {
        let mut moved = 0;
        for unit in &mut self.units {
            if unit.attachments.iter().any(|(b, _)| *b == from) {
                unit.reattach(from, to);
                moved += 1;
            }
        }
        moved
    }
}
