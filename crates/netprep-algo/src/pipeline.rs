//! Pipeline driver: reduce → equivalence → PTDF → tighten, repeated while
//! tightening keeps exposing buses the reducer can fold away.

use std::collections::HashSet;

use netprep_core::{equivalence_parallel_lines, LineId, ThermalFleet, Topology};
use tracing::{info, info_span};
use web_time::Instant;

use crate::config::PrepConfig;
use crate::error::PrepResult;
use crate::lp::LpOracle;
use crate::ptdf::{build_ptdf, PtdfTable};
use crate::reduce::{reduce, KeepMidpoints, MidpointEliminator, ReductionReport, SeriesEliminator};
use crate::tighten::{ActiveBoundSet, BoundTightener, TighteningReport};

/// Counts after one pass of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    pub buses: usize,
    pub lines: usize,
    pub buses_removed: usize,
    pub lines_removed: usize,
    pub parallel_lines_merged: usize,
    pub bounds_cleared: usize,
    pub active_bounds: usize,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub passes: Vec<PassStats>,
}

impl PipelineReport {
    pub fn total_buses_removed(&self) -> usize {
        self.passes.iter().map(|p| p.buses_removed).sum()
    }

    pub fn total_bounds_cleared(&self) -> usize {
        self.passes.iter().map(|p| p.bounds_cleared).sum()
    }

    pub fn timed_out(&self) -> bool {
        self.passes.iter().any(|p| p.timed_out)
    }
}

/// Network ready for the scheduler.
#[derive(Debug, Clone)]
pub struct PreparedNetwork {
    pub topology: Topology,
    pub fleet: ThermalFleet,
    pub ptdf: PtdfTable,
    pub active_bounds: ActiveBoundSet,
    pub report: PipelineReport,
}

/// Runs every enabled pass until reduction stops making progress or
/// `reduction.max_passes` is reached.
pub fn prepare(
    mut topology: Topology,
    mut fleet: ThermalFleet,
    oracle: &dyn LpOracle,
    config: &PrepConfig,
) -> PrepResult<PreparedNetwork> {
    config.validate()?;
    let _span = info_span!("prepare", buses = topology.num_buses(), lines = topology.num_lines()).entered();

    let eliminator: &dyn MidpointEliminator = if config.reduction.eliminate_midpoints {
        &SeriesEliminator
    } else {
        &KeepMidpoints
    };
    let tightener = BoundTightener::new(oracle, &config.tightening);

    let mut flags = ActiveBoundSet::from_topology(&topology);
    let mut reduction = if config.reduction.enabled {
        Some(reduce(&mut topology, &mut fleet, None, eliminator, &config.reduction)?)
    } else {
        None
    };
    let mut report = PipelineReport::default();

    loop {
        let merges = equivalence_parallel_lines(&mut topology)?;
        let mut reset: HashSet<LineId> = reduction.as_ref().map(|r| r.touched_lines.clone()).unwrap_or_default();
        // A merged line inherits the capacity flag of any duplicate, so its
        // bounds must be re-armed.
        reset.extend(merges.iter().map(|(_, kept)| *kept));
        flags = flags.rebase(&topology, &reset);

        let ptdf = build_ptdf(&topology, &config.ptdf)?;

        let tightening = if config.tightening.enabled && flags.count_active() > 0 {
            let deadline = Instant::now() + config.tightening.time_limit();
            tightener.tighten(&topology, &fleet, &mut flags, deadline)?
        } else {
            TighteningReport::default()
        };

        let stats = pass_stats(&topology, reduction.as_ref(), merges.len(), &tightening, &flags);
        info!(
            pass = report.passes.len() + 1,
            buses = stats.buses,
            lines = stats.lines,
            removed = stats.buses_removed,
            cleared = stats.bounds_cleared,
            active = stats.active_bounds,
            "pipeline pass done"
        );
        report.passes.push(stats);

        if !config.reduction.enabled || report.passes.len() >= config.reduction.max_passes {
            return Ok(PreparedNetwork {
                topology,
                fleet,
                ptdf,
                active_bounds: flags,
                report,
            });
        }

        let next = reduce(&mut topology, &mut fleet, Some(&flags), eliminator, &config.reduction)?;
        if next.is_noop() {
            return Ok(PreparedNetwork {
                topology,
                fleet,
                ptdf,
                active_bounds: flags,
                report,
            });
        }
        reduction = Some(next);
    }
}

fn pass_stats(
    topology: &Topology,
    reduction: Option<&ReductionReport>,
    merged: usize,
    tightening: &TighteningReport,
    flags: &ActiveBoundSet,
) -> PassStats {
    PassStats {
        buses: topology.num_buses(),
        lines: topology.num_lines(),
        buses_removed: reduction.map_or(0, |r| r.buses_removed.len()),
        lines_removed: reduction.map_or(0, |r| r.lines_removed),
        parallel_lines_merged: merged,
        bounds_cleared: tightening.bounds_cleared,
        active_bounds: flags.count_active(),
        timed_out: tightening.timed_out,
    }
}
