//! Flow-bound tightening.
//!
//! For every line whose limit might bind, the angle model is solved to find
//! the smallest and largest flow the network can push through it. A limit the
//! optimum cannot reach (by more than `epsilon`) is marked inactive, so the
//! scheduler can drop that constraint.
//!
//! - Phase A uses injection ranges over the whole horizon and clears a side
//!   for every period at once.
//! - Phase B revisits surviving lines period by period, last period first.
//!
//! Jobs are split into contiguous chunks, one per worker. Each worker gets its
//! own copy of the topology, fleet and flags and reports back a flag set in
//! which lines it did not examine are left fully set; the results are combined
//! with an element-wise AND. Flags only ever go from set to cleared.

use std::collections::HashSet;
use std::path::PathBuf;

use netprep_core::{LineId, NetError, ThermalFleet, Topology};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use web_time::Instant;

use crate::config::TighteningConfig;
use crate::error::{PrepError, PrepResult};
use crate::lp::{LpModel, LpOracle, LpStatus, Objective};

mod bounds;
mod model;

pub use bounds::{ActiveBoundSet, LineFlags};
pub use model::{AngleModel, InjectionBounds};

/// File name of the model written when the angle model is infeasible.
pub const INFEASIBLE_MODEL_FILE: &str = "infeas_angles.lp";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TighteningReport {
    pub lines_examined: usize,
    /// Number of (line, period, side) flags cleared.
    pub bounds_cleared: usize,
    pub solves: usize,
    /// The deadline cut at least one solve short.
    pub timed_out: bool,
}

impl TighteningReport {
    fn absorb(&mut self, other: &TighteningReport) {
        self.lines_examined += other.lines_examined;
        self.solves += other.solves;
        self.timed_out |= other.timed_out;
    }
}

/// Contiguous chunks, one per worker; the last worker takes the remainder.
pub fn partition_jobs(jobs: &[LineId], workers: usize) -> Vec<&[LineId]> {
    if jobs.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, jobs.len());
    let chunk = jobs.len() / workers;
    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == workers { jobs.len() } else { start + chunk };
            &jobs[start..end]
        })
        .collect()
}

pub struct BoundTightener<'a> {
    oracle: &'a dyn LpOracle,
    config: &'a TighteningConfig,
}

impl<'a> BoundTightener<'a> {
    pub fn new(oracle: &'a dyn LpOracle, config: &'a TighteningConfig) -> Self {
        Self { oracle, config }
    }

    /// Examines every line that still has a possibly active bound.
    pub fn tighten(
        &self,
        topology: &Topology,
        fleet: &ThermalFleet,
        flags: &mut ActiveBoundSet,
        deadline: Instant,
    ) -> PrepResult<TighteningReport> {
        let jobs = flags.active_lines();
        self.tighten_jobs(topology, fleet, flags, &jobs, deadline)
    }

    pub fn tighten_jobs(
        &self,
        topology: &Topology,
        fleet: &ThermalFleet,
        flags: &mut ActiveBoundSet,
        jobs: &[LineId],
        deadline: Instant,
    ) -> PrepResult<TighteningReport> {
        let start = Instant::now();
        let before = flags.count_active();
        let workers = match self.config.workers {
            0 => rayon::current_num_threads(),
            n => n,
        };
        let chunks = partition_jobs(jobs, workers);
        if chunks.is_empty() {
            return Ok(TighteningReport::default());
        }

        let snapshot: &ActiveBoundSet = flags;
        let run = || {
            chunks
                .par_iter()
                .map(|chunk| {
                    self.run_worker(topology.clone(), fleet.clone(), snapshot.clone(), chunk, deadline)
                })
                .collect::<PrepResult<Vec<_>>>()
        };
        let results = if self.config.workers > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|e| PrepError::Config(format!("cannot start {} workers: {e}", self.config.workers)))?
                .install(run)?
        } else {
            run()?
        };

        let mut report = TighteningReport::default();
        for (worker_flags, worker_report) in &results {
            flags.and_merge(worker_flags)?;
            report.absorb(worker_report);
        }
        report.bounds_cleared = before - flags.count_active();

        info!(
            lines = report.lines_examined,
            workers = chunks.len(),
            cleared = report.bounds_cleared,
            solves = report.solves,
            timed_out = report.timed_out,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tightened flow bounds"
        );
        Ok(report)
    }

    fn run_worker(
        &self,
        topology: Topology,
        fleet: ThermalFleet,
        mut flags: ActiveBoundSet,
        jobs: &[LineId],
        deadline: Instant,
    ) -> PrepResult<(ActiveBoundSet, TighteningReport)> {
        let mut report = TighteningReport {
            lines_examined: jobs.len(),
            ..TighteningReport::default()
        };
        let injections = InjectionBounds::compute(&topology, &fleet);
        let mut angle = AngleModel::build(&topology, &injections, &flags, self.config.angle_bound)?;
        let eps = self.config.epsilon;
        let mut stalled: HashSet<LineId> = HashSet::new();

        // Phase A: whole-horizon injection ranges
        for &id in jobs {
            let pos = topology.line_position(id).ok_or(NetError::UnknownLine(id))?;
            let bounds = &topology.lines()[pos].params.normal;
            let var = angle.flow_var(pos);
            let Some(line_flags) = flags.get_mut(id) else { continue };

            if line_flags.lower_active() {
                match self.probe(&angle.model, Objective::minimize(var), id, deadline, &mut report)? {
                    Some(lowest) if lowest > bounds.max_lower() + eps => {
                        debug!(line = %id, lowest, "lower bound never binds");
                        line_flags.clear_lower();
                    }
                    Some(_) => {}
                    None => {
                        stalled.insert(id);
                        continue;
                    }
                }
            }
            if line_flags.upper_active() {
                match self.probe(&angle.model, Objective::maximize(var), id, deadline, &mut report)? {
                    Some(highest) if highest < bounds.min_upper() - eps => {
                        debug!(line = %id, highest, "upper bound never binds");
                        line_flags.clear_upper();
                    }
                    Some(_) => {}
                    None => {
                        stalled.insert(id);
                    }
                }
            }
        }

        // Phase B: one period at a time for what is left
        let remaining: Vec<LineId> = jobs
            .iter()
            .copied()
            .filter(|id| !stalled.contains(id) && flags.any_active(*id))
            .collect();
        if self.config.run_single_period_models && !remaining.is_empty() {
            for t in (0..topology.periods()).rev() {
                angle.bound_injections_for_period(&injections, t);
                for &id in &remaining {
                    if stalled.contains(&id) {
                        continue;
                    }
                    let pos = topology.line_position(id).ok_or(NetError::UnknownLine(id))?;
                    let bounds = &topology.lines()[pos].params.normal;
                    let var = angle.flow_var(pos);
                    let Some(line_flags) = flags.get_mut(id) else { continue };

                    if line_flags.lower[t] {
                        match self.probe(&angle.model, Objective::minimize(var), id, deadline, &mut report)? {
                            Some(lowest) if lowest > bounds.lower[t] + eps => line_flags.lower[t] = false,
                            Some(_) => {}
                            None => {
                                stalled.insert(id);
                                continue;
                            }
                        }
                    }
                    if line_flags.upper[t] {
                        match self.probe(&angle.model, Objective::maximize(var), id, deadline, &mut report)? {
                            Some(highest) if highest < bounds.upper[t] - eps => line_flags.upper[t] = false,
                            Some(_) => {}
                            None => {
                                stalled.insert(id);
                            }
                        }
                    }
                }
            }
        }

        let mut out = ActiveBoundSet::all_active_like(&flags);
        for &id in jobs {
            if let (Some(src), Some(dst)) = (flags.get(id), out.get_mut(id)) {
                *dst = src.clone();
            }
        }
        Ok((out, report))
    }

    /// One solve. `None` means the budget ran out and the bound must be kept.
    fn probe(
        &self,
        model: &LpModel,
        objective: Objective,
        line: LineId,
        deadline: Instant,
        report: &mut TighteningReport,
    ) -> PrepResult<Option<f64>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            report.timed_out = true;
            return Ok(None);
        }
        report.solves += 1;
        let outcome = self.oracle.solve(model, &objective, remaining)?;
        match outcome.status {
            LpStatus::Optimal => outcome.objective.map(Some).ok_or_else(|| {
                PrepError::Solver(format!("{} reported optimal without a value", self.oracle.name()))
            }),
            LpStatus::TimeLimit => {
                report.timed_out = true;
                Ok(None)
            }
            LpStatus::Infeasible => Err(self.infeasible(model, &objective, line)),
        }
    }

    fn infeasible(&self, model: &LpModel, objective: &Objective, line: LineId) -> PrepError {
        let dir = &self.config.diagnostics_dir;
        let path: PathBuf = dir.join(INFEASIBLE_MODEL_FILE);
        let written = std::fs::create_dir_all(dir)
            .map_err(PrepError::from)
            .and_then(|_| model.write_lp(&path, Some(objective)));
        let diagnostics = match written {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not write infeasible model");
                None
            }
        };
        warn!(line = %line, "angle model is infeasible");
        PrepError::InfeasibleAngleModel { line, diagnostics }
    }
}
