//! Shared network fixtures for the integration tests.
#![allow(dead_code)]

use netprep_core::units::{Megawatts, PowerBase};
use netprep_core::{Bus, BusId, LineParams, ThermalFleet, ThermalUnit, Topology, UnitId};

/// 14 buses, 18 lines. Bus 2 (position 1) is the reference.
pub const FOURTEEN_BUS_LINES: [(usize, usize); 18] = [
    (1, 2),
    (1, 5),
    (2, 3),
    (2, 4),
    (2, 5),
    (3, 4),
    (4, 5),
    (4, 7),
    (4, 9),
    (5, 6),
    (6, 11),
    (6, 12),
    (7, 8),
    (7, 9),
    (9, 10),
    (10, 11),
    (12, 13),
    (13, 14),
];

/// The 14-bus network once buses 8, 12, 13 and 14 are folded away.
pub const TEN_BUS_LINES: [(usize, usize); 14] = [
    (1, 2),
    (1, 5),
    (2, 3),
    (2, 4),
    (2, 5),
    (3, 4),
    (4, 5),
    (4, 7),
    (4, 9),
    (5, 6),
    (6, 11),
    (7, 9),
    (9, 10),
    (10, 11),
];

pub const TEN_BUS_IDS: [usize; 10] = [1, 2, 3, 4, 5, 6, 7, 9, 10, 11];

/// Every line has x = 0.1 p.u. (susceptance 10) and a 100 MW rating.
pub const REACTANCE: f64 = 0.1;

pub fn build(bus_ids: &[usize], lines: &[(usize, usize)], loads: &[(usize, f64)], periods: usize) -> Topology {
    let base = PowerBase::default();
    let mut topology = Topology::new(periods);
    for &id in bus_ids {
        let mut bus = Bus::new(BusId::new(id), format!("bus{id}"), periods);
        if let Some((_, load)) = loads.iter().find(|(b, _)| *b == id) {
            bus = bus.with_net_load(vec![*load; periods]);
        }
        if id == 2 {
            bus = bus.as_reference();
        }
        topology.add_bus(bus).unwrap();
    }
    for &(from, to) in lines {
        let params = LineParams::from_rating(REACTANCE, Megawatts(100.0), base, periods).with_name(format!("{from}-{to}"));
        topology.push_line(BusId::new(from), BusId::new(to), params).unwrap();
    }
    topology
}

pub fn fourteen_bus() -> Topology {
    let ids: Vec<usize> = (1..=14).collect();
    build(&ids, &FOURTEEN_BUS_LINES, &fourteen_bus_loads(), 1)
}

pub fn ten_bus() -> Topology {
    build(&TEN_BUS_IDS, &TEN_BUS_LINES, &[], 1)
}

pub fn fourteen_bus_loads() -> Vec<(usize, f64)> {
    vec![
        (3, 0.3),
        (4, 0.2),
        (5, 0.1),
        (6, 0.1),
        (8, 0.15),
        (9, 0.25),
        (10, 0.1),
        (11, 0.05),
        (12, 0.1),
        (13, 0.05),
        (14, 0.15),
    ]
}

/// Units at buses 1, 2 and 7, 0 to 100 MW each.
pub fn fleet() -> ThermalFleet {
    let mut fleet = ThermalFleet::new();
    for (i, bus) in [1, 2, 7].into_iter().enumerate() {
        fleet
            .add_unit(ThermalUnit::new(UnitId::new(i), format!("g{bus}"), BusId::new(bus)).with_p_limits(0.0, 1.0))
            .unwrap();
    }
    fleet
}

/// Y·A·B⁻¹ with the reference row and column of B removed before inverting
/// and zero-padded afterwards. Gauss-Jordan with partial pivoting.
pub fn reference_ptdf(n: usize, lines: &[(usize, usize)], reference: usize, y: f64) -> Vec<Vec<f64>> {
    let mut b = vec![vec![0.0; n]; n];
    for &(f, t) in lines {
        b[f][f] += y;
        b[t][t] += y;
        b[f][t] -= y;
        b[t][f] -= y;
    }
    let keep: Vec<usize> = (0..n).filter(|&i| i != reference).collect();
    let m = keep.len();
    let mut aug: Vec<Vec<f64>> = keep
        .iter()
        .enumerate()
        .map(|(r, &i)| {
            let mut row: Vec<f64> = keep.iter().map(|&j| b[i][j]).collect();
            row.extend((0..m).map(|c| if c == r { 1.0 } else { 0.0 }));
            row
        })
        .collect();
    for col in 0..m {
        let pivot = (col..m)
            .max_by(|&a, &b| aug[a][col].abs().total_cmp(&aug[b][col].abs()))
            .unwrap();
        aug.swap(col, pivot);
        let p = aug[col][col];
        for v in aug[col].iter_mut() {
            *v /= p;
        }
        let pivot_row = aug[col].clone();
        for (r, row) in aug.iter_mut().enumerate() {
            let factor = row[col];
            if r != col && factor != 0.0 {
                for (v, pv) in row.iter_mut().zip(&pivot_row) {
                    *v -= factor * pv;
                }
            }
        }
    }

    let mut inv = vec![vec![0.0; n]; n];
    for (r, &i) in keep.iter().enumerate() {
        for (c, &j) in keep.iter().enumerate() {
            inv[i][j] = aug[r][m + c];
        }
    }
    lines
        .iter()
        .map(|&(f, t)| (0..n).map(|c| y * (inv[f][c] - inv[t][c])).collect())
        .collect()
}

/// Maps 1-based bus ids in `lines` to positions in `bus_ids`.
pub fn positions(bus_ids: &[usize], lines: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let pos = |id: usize| bus_ids.iter().position(|&b| b == id).unwrap();
    lines.iter().map(|&(f, t)| (pos(f), pos(t))).collect()
}
