//! Bus/line container with canonical ordering.
//!
//! Buses and lines live in `Vec`s in insertion order; every pass that needs a
//! dense layout uses positions in those vectors. The id → position maps are
//! rebuilt after each removal so positions always match the current version.

use std::collections::HashMap;

use tracing::debug;

use crate::{Bus, BusId, Line, LineId, LineParams, NetError, NetResult};

#[derive(Debug, Clone, Default)]
pub struct Topology {
    periods: usize,
    pub(crate) buses: Vec<Bus>,
    pub(crate) lines: Vec<Line>,
    bus_index: HashMap<BusId, usize>,
    line_index: HashMap<LineId, usize>,
    next_line_id: usize,
}

impl Topology {
    /// Empty topology over a horizon of `periods` scheduling periods.
    pub fn new(periods: usize) -> Self {
        Self {
            periods,
            ..Self::default()
        }
    }

    #[inline]
    pub fn periods(&self) -> usize {
        self.periods
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn num_buses(&self) -> usize {
        self.buses.len()
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.bus_index.get(&id).map(|&pos| &self.buses[pos])
    }

    pub fn bus_or_err(&self, id: BusId) -> NetResult<&Bus> {
        self.bus(id).ok_or(NetError::UnknownBus(id))
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.line_index.get(&id).map(|&pos| &self.lines[pos])
    }

    pub fn line_or_err(&self, id: LineId) -> NetResult<&Line> {
        self.line(id).ok_or(NetError::UnknownLine(id))
    }

    pub fn bus_position(&self, id: BusId) -> Option<usize> {
        self.bus_index.get(&id).copied()
    }

    pub fn line_position(&self, id: LineId) -> Option<usize> {
        self.line_index.get(&id).copied()
    }

    pub fn add_bus(&mut self, mut bus: Bus) -> NetResult<()> {
        if self.bus_index.contains_key(&bus.id) {
            return Err(NetError::Inconsistent(format!("bus {} declared twice", bus.id)));
        }
        if bus.net_load.len() != self.periods {
            return Err(NetError::Inconsistent(format!(
                "bus {} has {} net-load values for {} periods",
                bus.id,
                bus.net_load.len(),
                self.periods
            )));
        }
        bus.lines_from.clear();
        bus.lines_to.clear();
        self.bus_index.insert(bus.id, self.buses.len());
        self.buses.push(bus);
        Ok(())
    }

    /// Appends a line with a fresh id, even if its endpoints already carry
    /// one. Use [`Topology::add_or_merge_line`] to keep the line set free of
    /// parallel lines.
    pub fn push_line(&mut self, from: BusId, to: BusId, params: LineParams) -> NetResult<LineId> {
        let id = LineId::new(self.next_line_id);
        self.add_line(id, from, to, params)?;
        Ok(id)
    }

    /// Appends a line under a caller-chosen id.
    ///
    /// Endpoints are normalized to (smaller id, larger id); when the caller
    /// passes them the other way round the flow bounds are flipped to match.
    pub fn add_line(&mut self, id: LineId, from: BusId, to: BusId, params: LineParams) -> NetResult<()> {
        if self.line_index.contains_key(&id) {
            return Err(NetError::Inconsistent(format!("line {id} declared twice")));
        }
        if from == to {
            return Err(NetError::Inconsistent(format!("line {id} connects bus {from} to itself")));
        }
        params.validate(self.periods)?;
        let from_pos = self.bus_position(from).ok_or(NetError::UnknownBus(from))?;
        let to_pos = self.bus_position(to).ok_or(NetError::UnknownBus(to))?;

        let (from_pos, to_pos, from_bus, to_bus, params) = if from < to {
            (from_pos, to_pos, from, to, params)
        } else {
            (to_pos, from_pos, to, from, params.reversed())
        };

        self.buses[from_pos].lines_from.push(id);
        self.buses[to_pos].lines_to.push(id);
        self.line_index.insert(id, self.lines.len());
        self.lines.push(Line {
            id,
            from_bus,
            to_bus,
            params,
        });
        self.next_line_id = self.next_line_id.max(id.value() + 1);
        Ok(())
    }

    /// First line (in canonical order) joining `a` and `b`, in either
    /// orientation.
    pub fn line_between(&self, a: BusId, b: BusId) -> Option<LineId> {
        let bus = self.bus(a)?;
        bus.incident_lines()
            .filter_map(|id| {
                let pos = self.line_position(id)?;
                (self.lines[pos].other_end(a) == Some(b)).then_some(pos)
            })
            .min()
            .map(|pos| self.lines[pos].id)
    }

    /// Buses reachable from `bus` through a single line, one entry per line.
    pub fn neighbors(&self, bus: BusId) -> NetResult<Vec<(LineId, BusId)>> {
        let node = self.bus_or_err(bus)?;
        node.incident_lines()
            .map(|id| {
                let line = self.line_or_err(id)?;
                let other = line
                    .other_end(bus)
                    .ok_or_else(|| NetError::Inconsistent(format!("line {id} is listed at bus {bus} but does not touch it")))?;
                Ok((id, other))
            })
            .collect()
    }

    /// Detaches a line from both endpoints and deletes it.
    pub fn remove_line(&mut self, id: LineId) -> NetResult<Line> {
        let pos = self.line_position(id).ok_or(NetError::UnknownLine(id))?;
        let line = self.lines.remove(pos);
        for end in [line.from_bus, line.to_bus] {
            if let Some(bus_pos) = self.bus_position(end) {
                let bus = &mut self.buses[bus_pos];
                bus.lines_from.retain(|l| *l != id);
                bus.lines_to.retain(|l| *l != id);
            }
        }
        self.reindex_lines();
        debug!(line = %id, from = %line.from_bus, to = %line.to_bus, "removed line");
        Ok(line)
    }

    /// Deletes a bus that no longer has incident lines.
    pub fn remove_bus(&mut self, id: BusId) -> NetResult<Bus> {
        let pos = self.bus_position(id).ok_or(NetError::UnknownBus(id))?;
        if self.buses[pos].degree() > 0 {
            return Err(NetError::Inconsistent(format!(
                "bus {id} still has {} incident lines",
                self.buses[pos].degree()
            )));
        }
        let bus = self.buses.remove(pos);
        self.reindex_buses();
        debug!(bus = %id, "removed bus");
        Ok(bus)
    }

    /// Adds `extra` period by period to a bus's net load.
    pub fn add_net_load(&mut self, id: BusId, extra: &[f64]) -> NetResult<()> {
        if extra.len() != self.periods {
            return Err(NetError::Inconsistent(format!(
                "net-load series of length {} for {} periods",
                extra.len(),
                self.periods
            )));
        }
        let pos = self.bus_position(id).ok_or(NetError::UnknownBus(id))?;
        for (value, add) in self.buses[pos].net_load.iter_mut().zip(extra) {
            *value += add;
        }
        Ok(())
    }

    pub fn total_net_load(&self, period: usize) -> f64 {
        self.buses.iter().map(|b| b.net_load[period]).sum()
    }

    pub(crate) fn line_params_mut(&mut self, id: LineId) -> NetResult<&mut LineParams> {
        let pos = self.line_position(id).ok_or(NetError::UnknownLine(id))?;
        Ok(&mut self.lines[pos].params)
    }

    fn reindex_lines(&mut self) {
        self.line_index = self
            .lines
            .iter()
            .enumerate()
            .map(|(pos, line)| (line.id, pos))
            .collect();
    }

    fn reindex_buses(&mut self) {
        self.bus_index = self
            .buses
            .iter()
            .enumerate()
            .map(|(pos, bus)| (bus.id, pos))
            .collect();
    }
}
