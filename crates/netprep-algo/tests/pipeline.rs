//! End-to-end runs of `prepare`.

mod common;

use netprep_algo::{prepare, ClarabelOracle, PrepConfig, PrepError, ReductionConfig, TighteningConfig};
use netprep_core::units::{Megawatts, PowerBase};
use netprep_core::{Bus, BusId, LineParams, ThermalFleet, ThermalUnit, Topology, UnitId, MAX_FLOW_MW};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_fourteen_bus_settles_after_one_pass() -> anyhow::Result<()> {
    init_tracing();
    let prepared = prepare(
        common::fourteen_bus(),
        common::fleet(),
        &ClarabelOracle::default(),
        &PrepConfig::default(),
    )?;

    assert_eq!(prepared.topology.num_buses(), 10);
    assert_eq!(prepared.topology.num_lines(), 14);
    assert_eq!(prepared.ptdf.num_lines(), 14);
    assert_eq!(prepared.ptdf.num_buses(), 10);
    assert_eq!(prepared.active_bounds.line_ids().len(), 14);
    assert_eq!(prepared.report.passes.len(), 1);
    assert_eq!(prepared.report.total_buses_removed(), 4);
    assert!(!prepared.report.timed_out());
    Ok(())
}

/// Triangle 1-2-3 with bus 4 hanging off bus 3 through a 20 MW line. The
/// unit at bus 4 could push 50 MW, but the whole system only ever consumes
/// 10 MW, so the 20 MW limit can never bind.
fn overbuilt_leaf() -> (Topology, ThermalFleet) {
    let base = PowerBase::default();
    let mut topology = Topology::new(1);
    topology.add_bus(Bus::new(BusId::new(1), "a", 1).as_reference()).unwrap();
    topology.add_bus(Bus::new(BusId::new(2), "b", 1)).unwrap();
    topology.add_bus(Bus::new(BusId::new(3), "c", 1).with_net_load(vec![0.1])).unwrap();
    topology.add_bus(Bus::new(BusId::new(4), "leaf", 1)).unwrap();
    for (a, b, mw) in [(1, 2, 100.0), (2, 3, 100.0), (1, 3, 100.0), (3, 4, 20.0)] {
        let params = LineParams::from_rating(0.1, Megawatts(mw), base, 1);
        topology.push_line(BusId::new(a), BusId::new(b), params).unwrap();
    }
    let mut fleet = ThermalFleet::new();
    fleet
        .add_unit(ThermalUnit::new(UnitId::new(0), "leaf gen", BusId::new(4)).with_p_limits(0.0, 0.5))
        .unwrap();
    (topology, fleet)
}

#[test]
fn test_tightening_feeds_back_into_reduction() -> anyhow::Result<()> {
    init_tracing();
    let (topology, fleet) = overbuilt_leaf();
    let prepared = prepare(topology, fleet, &ClarabelOracle::default(), &PrepConfig::default())?;

    let passes = &prepared.report.passes;
    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0].buses_removed, 0);
    assert_eq!(passes[0].buses, 4);
    assert_eq!(passes[1].buses_removed, 1);
    assert_eq!(passes[1].buses, 3);

    assert!(prepared.topology.bus(BusId::new(4)).is_none());
    assert!(prepared.fleet.has_unit_at(BusId::new(3)));
    assert_eq!(prepared.active_bounds.count_active(), 0);
    Ok(())
}

#[test]
fn test_disabled_passes_leave_network_alone() -> anyhow::Result<()> {
    let config = PrepConfig {
        reduction: ReductionConfig {
            enabled: false,
            ..ReductionConfig::default()
        },
        tightening: TighteningConfig {
            enabled: false,
            ..TighteningConfig::default()
        },
        ..PrepConfig::default()
    };
    let (topology, fleet) = overbuilt_leaf();
    let prepared = prepare(topology, fleet, &ClarabelOracle::default(), &config)?;

    assert_eq!(prepared.report.passes.len(), 1);
    assert_eq!(prepared.topology.num_buses(), 4);
    assert_eq!(prepared.active_bounds.count_active(), 2 * 4);
    Ok(())
}

#[test]
fn test_max_passes_caps_the_loop() -> anyhow::Result<()> {
    let config = PrepConfig::from_toml_str(
        r#"
        [reduction]
        max_passes = 1
        "#,
    )?;
    let (topology, fleet) = overbuilt_leaf();
    let prepared = prepare(topology, fleet, &ClarabelOracle::default(), &config)?;

    assert_eq!(prepared.report.passes.len(), 1);
    assert!(prepared.topology.bus(BusId::new(4)).is_some());
    assert!(prepared.report.total_bounds_cleared() > 0);
    Ok(())
}

#[test]
fn test_radial_pair_is_degenerate() {
    let base = PowerBase::default();
    let mut topology = Topology::new(1);
    topology.add_bus(Bus::new(BusId::new(1), "a", 1).as_reference()).unwrap();
    topology.add_bus(Bus::new(BusId::new(2), "b", 1).with_net_load(vec![0.3])).unwrap();
    topology
        .push_line(BusId::new(1), BusId::new(2), LineParams::from_rating(0.1, Megawatts(100.0), base, 1))
        .unwrap();

    let err = prepare(topology, ThermalFleet::new(), &ClarabelOracle::default(), &PrepConfig::default())
        .unwrap_err();
    assert!(matches!(err, PrepError::DegenerateTopology(_)));
}

#[test]
fn test_parallel_input_lines_are_merged() -> anyhow::Result<()> {
    let base = PowerBase::default();
    let mut topology = common::ten_bus();
    topology.push_line(
        BusId::new(4),
        BusId::new(7),
        LineParams::from_rating(0.1, Megawatts(100.0), base, 1),
    )?;
    let config = PrepConfig {
        tightening: TighteningConfig {
            enabled: false,
            ..TighteningConfig::default()
        },
        ..PrepConfig::default()
    };
    let prepared = prepare(topology, ThermalFleet::new(), &ClarabelOracle::default(), &config)?;

    assert_eq!(prepared.report.passes[0].parallel_lines_merged, 1);
    assert_eq!(prepared.topology.num_lines(), 14);
    let merged = prepared.topology.line_between(BusId::new(4), BusId::new(7)).unwrap();
    assert!((prepared.topology.line(merged).unwrap().params.reactance - 0.05).abs() < 1e-12);
    Ok(())
}

/// An unlimited 1-2 line listed before a 10 MW one: the merged pair is limited
/// and its bound can bind, so it has to come out of tightening still active.
#[test]
fn test_merged_parallel_line_keeps_its_bounds() -> anyhow::Result<()> {
    init_tracing();
    let base = PowerBase::default();
    let mut topology = Topology::new(1);
    topology.add_bus(Bus::new(BusId::new(1), "ref", 1).as_reference())?;
    topology.add_bus(Bus::new(BusId::new(2), "load", 1).with_net_load(vec![0.8]))?;
    topology.add_bus(Bus::new(BusId::new(3), "c", 1))?;
    for (a, b, mw) in [(1, 2, MAX_FLOW_MW), (1, 2, 10.0), (2, 3, 100.0), (1, 3, 100.0)] {
        topology.push_line(BusId::new(a), BusId::new(b), LineParams::from_rating(0.1, Megawatts(mw), base, 1))?;
    }
    let mut fleet = ThermalFleet::new();
    fleet.add_unit(ThermalUnit::new(UnitId::new(0), "g", BusId::new(1)).with_p_limits(0.0, 1.0))?;
    let config = PrepConfig {
        reduction: ReductionConfig {
            enabled: false,
            ..ReductionConfig::default()
        },
        ..PrepConfig::default()
    };

    let prepared = prepare(topology, fleet, &ClarabelOracle::default(), &config)?;

    assert_eq!(prepared.report.passes[0].parallel_lines_merged, 1);
    let merged = prepared.topology.line_between(BusId::new(1), BusId::new(2)).unwrap();
    assert!(prepared.topology.line(merged).unwrap().params.capacity_limited);
    assert!(prepared.active_bounds.any_active(merged));
    Ok(())
}
