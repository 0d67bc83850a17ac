//! Which line flow bounds can still bind.

use std::collections::{HashMap, HashSet};

use netprep_core::{LineId, NetError, Topology};

use crate::error::PrepResult;

/// Per-period "possibly active" flags of one line. The aggregate flags are
/// the OR over periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFlags {
    pub upper: Vec<bool>,
    pub lower: Vec<bool>,
}

impl LineFlags {
    pub fn uniform(active: bool, periods: usize) -> Self {
        Self {
            upper: vec![active; periods],
            lower: vec![active; periods],
        }
    }

    pub fn upper_active(&self) -> bool {
        self.upper.iter().any(|f| *f)
    }

    pub fn lower_active(&self) -> bool {
        self.lower.iter().any(|f| *f)
    }

    pub fn any_active(&self) -> bool {
        self.upper_active() || self.lower_active()
    }

    pub fn clear_upper(&mut self) {
        self.upper.iter_mut().for_each(|f| *f = false);
    }

    pub fn clear_lower(&mut self) {
        self.lower.iter_mut().for_each(|f| *f = false);
    }

    fn count(&self) -> usize {
        self.upper.iter().chain(&self.lower).filter(|f| **f).count()
    }

    fn and_assign(&mut self, other: &LineFlags) {
        for (a, b) in self.upper.iter_mut().zip(&other.upper) {
            *a &= *b;
        }
        for (a, b) in self.lower.iter_mut().zip(&other.lower) {
            *a &= *b;
        }
    }
}

/// Flags for every line of one topology version, in its line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveBoundSet {
    periods: usize,
    line_ids: Vec<LineId>,
    index: HashMap<LineId, usize>,
    flags: Vec<LineFlags>,
}

impl ActiveBoundSet {
    fn build(periods: usize, entries: Vec<(LineId, LineFlags)>) -> Self {
        let line_ids: Vec<LineId> = entries.iter().map(|(id, _)| *id).collect();
        Self {
            periods,
            index: line_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect(),
            line_ids,
            flags: entries.into_iter().map(|(_, f)| f).collect(),
        }
    }

    /// Capacity-limited lines start fully active; the rest never are.
    pub fn from_topology(topology: &Topology) -> Self {
        let periods = topology.periods();
        Self::build(
            periods,
            topology
                .lines()
                .iter()
                .map(|l| (l.id, LineFlags::uniform(l.params.capacity_limited, periods)))
                .collect(),
        )
    }

    /// Same lines, every flag set. The identity of [`ActiveBoundSet::and_merge`].
    pub fn all_active_like(other: &ActiveBoundSet) -> Self {
        Self::build(
            other.periods,
            other
                .line_ids
                .iter()
                .map(|id| (*id, LineFlags::uniform(true, other.periods)))
                .collect(),
        )
    }

    /// Carries flags over to a new topology version. Lines that are new, or
    /// listed in `reset` because their parameters changed, are seeded again
    /// from their capacity flag.
    pub fn rebase(&self, topology: &Topology, reset: &HashSet<LineId>) -> Self {
        let periods = topology.periods();
        Self::build(
            periods,
            topology
                .lines()
                .iter()
                .map(|l| {
                    let flags = match self.get(l.id) {
                        Some(f) if !reset.contains(&l.id) => f.clone(),
                        _ => LineFlags::uniform(l.params.capacity_limited, periods),
                    };
                    (l.id, flags)
                })
                .collect(),
        )
    }

    pub fn periods(&self) -> usize {
        self.periods
    }

    pub fn line_ids(&self) -> &[LineId] {
        &self.line_ids
    }

    pub fn len(&self) -> usize {
        self.line_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_ids.is_empty()
    }

    pub fn get(&self, line: LineId) -> Option<&LineFlags> {
        self.index.get(&line).map(|&i| &self.flags[i])
    }

    pub fn get_mut(&mut self, line: LineId) -> Option<&mut LineFlags> {
        self.index.get(&line).map(|&i| &mut self.flags[i])
    }

    pub fn upper_active(&self, line: LineId) -> bool {
        self.get(line).is_some_and(LineFlags::upper_active)
    }

    pub fn lower_active(&self, line: LineId) -> bool {
        self.get(line).is_some_and(LineFlags::lower_active)
    }

    pub fn any_active(&self, line: LineId) -> bool {
        self.get(line).is_some_and(LineFlags::any_active)
    }

    /// Lines with at least one possibly active bound, in line order.
    pub fn active_lines(&self) -> Vec<LineId> {
        self.line_ids
            .iter()
            .zip(&self.flags)
            .filter(|(_, f)| f.any_active())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Number of set (line, period, side) flags.
    pub fn count_active(&self) -> usize {
        self.flags.iter().map(LineFlags::count).sum()
    }

    /// Element-wise AND with another set over the same lines.
    pub fn and_merge(&mut self, other: &ActiveBoundSet) -> PrepResult<()> {
        if self.line_ids != other.line_ids || self.periods != other.periods {
            return Err(NetError::Inconsistent(
                "cannot merge active-bound sets of different topology versions".into(),
            )
            .into());
        }
        for (mine, theirs) in self.flags.iter_mut().zip(&other.flags) {
            mine.and_assign(theirs);
        }
        Ok(())
    }

    /// True when every flag set here is also set in `other`.
    pub fn is_subset_of(&self, other: &ActiveBoundSet) -> bool {
        self.line_ids.iter().zip(&self.flags).all(|(id, mine)| match other.get(*id) {
            Some(theirs) => {
                mine.upper.iter().zip(&theirs.upper).all(|(a, b)| !*a || *b)
                    && mine.lower.iter().zip(&theirs.lower).all(|(a, b)| !*a || *b)
            }
            None => !mine.any_active(),
        })
    }
}
