//! Island decomposition.
//!
//! A topology splits into isolated subsystems: maximal sets of buses joined by
//! lines. Connected components are numbered 0..k in the canonical order of
//! their first bus. A bus without lines forms a singleton subsystem keyed
//! `bus_id + k`, which can never collide with a component key.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::unionfind::UnionFind;

use crate::{BusId, Topology};

/// One isolated subsystem. Parallel lines appear as a single edge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subsystem {
    pub nodes: Vec<BusId>,
    pub edges: Vec<(BusId, BusId)>,
}

impl Subsystem {
    pub fn is_singleton(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Partition {
    subsystems: BTreeMap<usize, Subsystem>,
    membership: HashMap<BusId, usize>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }

    pub fn get(&self, key: usize) -> Option<&Subsystem> {
        self.subsystems.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Subsystem)> + '_ {
        self.subsystems.iter().map(|(k, s)| (*k, s))
    }

    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.subsystems.keys().copied()
    }

    pub fn subsystem_of(&self, bus: BusId) -> Option<usize> {
        self.membership.get(&bus).copied()
    }

    /// The declared reference bus of subsystem `key`, or its first bus when
    /// none is declared.
    pub fn reference_bus(&self, key: usize, topology: &Topology) -> Option<BusId> {
        let subsystem = self.subsystems.get(&key)?;
        subsystem
            .nodes
            .iter()
            .copied()
            .find(|id| topology.bus(*id).is_some_and(|b| b.is_reference))
            .or_else(|| subsystem.nodes.first().copied())
    }

    /// One reference bus per subsystem, in key order.
    pub fn reference_buses(&self, topology: &Topology) -> Vec<BusId> {
        self.keys()
            .filter_map(|key| self.reference_bus(key, topology))
            .collect()
    }
}

/// Splits `topology` into isolated subsystems.
pub fn decompose(topology: &Topology) -> Partition {
    let buses = topology.buses();
    let mut sets = UnionFind::<usize>::new(buses.len());
    for line in topology.lines() {
        if let (Some(a), Some(b)) = (
            topology.bus_position(line.from_bus),
            topology.bus_position(line.to_bus),
        ) {
            sets.union(a, b);
        }
    }

    let mut root_to_key: HashMap<usize, usize> = HashMap::new();
    for (pos, bus) in buses.iter().enumerate() {
        if bus.degree() > 0 {
            let next = root_to_key.len();
            root_to_key.entry(sets.find(pos)).or_insert(next);
        }
    }
    let components = root_to_key.len();

    let mut partition = Partition::default();
    for (pos, bus) in buses.iter().enumerate() {
        let key = if bus.degree() > 0 {
            root_to_key[&sets.find(pos)]
        } else {
            bus.id.value() + components
        };
        partition.membership.insert(bus.id, key);
        partition.subsystems.entry(key).or_default().nodes.push(bus.id);
    }

    let mut seen = HashSet::new();
    for line in topology.lines() {
        if !seen.insert(line.endpoints()) {
            continue;
        }
        if let Some(key) = partition.membership.get(&line.from_bus) {
            if let Some(subsystem) = partition.subsystems.get_mut(key) {
                subsystem.edges.push(line.endpoints());
            }
        }
    }
    partition
}
