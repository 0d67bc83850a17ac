//! End-of-line and mid-point reduction on the 14-bus fixture.

mod common;

use netprep_algo::{build_ptdf, reduce, KeepMidpoints, PtdfConfig, ReductionConfig, SeriesEliminator};
use netprep_core::{BusId, ThermalFleet};

use common::{fleet, fourteen_bus, ten_bus, REACTANCE};

fn exact() -> PtdfConfig {
    PtdfConfig { coeff_tolerance: 0.0 }
}

#[test]
fn test_end_of_line_chain_is_folded() {
    let mut topology = fourteen_bus();
    let mut fleet = fleet();
    let load_before = topology.total_net_load(0);

    let report = reduce(&mut topology, &mut fleet, None, &KeepMidpoints, &ReductionConfig::default()).unwrap();

    // 8 and 14 first, which exposes 13 and then 12
    let removed: Vec<usize> = report.buses_removed.iter().map(|b| b.value()).collect();
    assert_eq!(removed, vec![8, 14, 13, 12]);
    assert_eq!(report.passes, 3);
    assert_eq!(report.lines_removed, 4);
    assert_eq!(topology.num_buses(), 10);
    assert_eq!(topology.num_lines(), 14);
    assert!((topology.total_net_load(0) - load_before).abs() < 1e-12);

    // 0.1 + 0.05 + 0.15 ended up on bus 6 on top of its own 0.1
    let bus6 = topology.bus(BusId::new(6)).unwrap();
    assert!((bus6.net_load[0] - 0.4).abs() < 1e-12);
    let bus7 = topology.bus(BusId::new(7)).unwrap();
    assert!((bus7.net_load[0] - 0.15).abs() < 1e-12);
}

#[test]
fn test_reduced_ptdf_matches_ten_bus_fixture() {
    let mut topology = fourteen_bus();
    let mut fleet = fleet();
    reduce(&mut topology, &mut fleet, None, &KeepMidpoints, &ReductionConfig::default()).unwrap();

    let reduced = build_ptdf(&topology, &exact()).unwrap();
    let fixture = ten_bus();
    let direct = build_ptdf(&fixture, &exact()).unwrap();

    assert_eq!(reduced.num_lines(), direct.num_lines());
    for line in topology.lines() {
        let twin = fixture.line_between(line.from_bus, line.to_bus).unwrap();
        for bus in fixture.buses() {
            let a = reduced.get(line.id, bus.id).unwrap();
            let b = direct.get(twin, bus.id).unwrap();
            assert!((a - b).abs() < 1e-9, "line {}-{} bus {}", line.from_bus, line.to_bus, bus.id);
        }
    }
}

#[test]
fn test_units_follow_their_bus() {
    let mut topology = fourteen_bus();
    let mut fleet = ThermalFleet::new();
    fleet
        .add_unit(
            netprep_core::ThermalUnit::new(netprep_core::UnitId::new(0), "peaker", BusId::new(14))
                .with_p_limits(0.0, 0.2),
        )
        .unwrap();

    reduce(&mut topology, &mut fleet, None, &KeepMidpoints, &ReductionConfig::default()).unwrap();
    assert!(fleet.has_unit_at(BusId::new(6)));
    assert!(!fleet.has_unit_at(BusId::new(14)));
}

#[test]
fn test_series_elimination_preserves_other_flows() {
    // bus 3 carries no load and relays between 2 and 4
    let ids: Vec<usize> = (1..=14).collect();
    let mut loads = common::fourteen_bus_loads();
    loads.retain(|(b, _)| *b != 3);
    loads.push((1, 0.05));
    loads.push((2, 0.05));
    loads.push((7, 0.05));
    let original = common::build(&ids, &common::FOURTEEN_BUS_LINES, &loads, 1);
    let mut topology = original.clone();
    let mut fleet = ThermalFleet::new();

    let report = reduce(&mut topology, &mut fleet, None, &SeriesEliminator, &ReductionConfig::default()).unwrap();
    assert_eq!(report.midpoints_eliminated, 1);
    assert!(topology.bus(BusId::new(3)).is_none());

    let line_24 = topology.line_between(BusId::new(2), BusId::new(4)).unwrap();
    assert!(report.touched_lines.contains(&line_24));
    // x = 0.1 in parallel with the 0.2 series path
    let x = topology.line(line_24).unwrap().params.reactance;
    assert!((x - REACTANCE * 2.0 / 3.0).abs() < 1e-12);

    let before = build_ptdf(&original, &exact()).unwrap();
    let after = build_ptdf(&topology, &exact()).unwrap();
    let old_23 = original.line_between(BusId::new(2), BusId::new(3)).unwrap();
    let old_24 = original.line_between(BusId::new(2), BusId::new(4)).unwrap();
    for line in topology.lines() {
        for bus in topology.buses() {
            let now = after.get(line.id, bus.id).unwrap();
            let then = if line.id == line_24 {
                // the merged branch carries what used to go over 2-4 and 2-3
                before.get(old_24, bus.id).unwrap() + before.get(old_23, bus.id).unwrap()
            } else {
                before.get(line.id, bus.id).unwrap()
            };
            assert!((now - then).abs() < 1e-9, "line {} bus {}", line.id, bus.id);
        }
    }
}
