//! # netprep-algo: network pre-processing for unit commitment
//!
//! Passes that shrink a transmission network and its flow constraints before
//! a unit-commitment scheduler sees them:
//!
//! | Pass | Entry point | Result |
//! |------|-------------|--------|
//! | Topological reduction | [`reduce()`] | end-of-line and mid-point buses folded away |
//! | PTDF assembly | [`build_ptdf`] | dense line × bus sensitivity table |
//! | Bound tightening | [`BoundTightener`] | flags for flow limits that can never bind |
//! | Pipeline | [`prepare`] | all of the above, repeated until reduction stalls |
//!
//! ## LP oracles
//!
//! The tightener only talks to an [`LpOracle`]. [`ClarabelOracle`] feeds
//! Clarabel directly and honours the wall-clock budget; with the default
//! `solver-clarabel` feature [`GoodLpOracle`] routes the same model through
//! `good_lp`. Any model can also be written in CPLEX LP format
//! ([`LpModel::write_lp`]), which is what happens to an infeasible angle model:
//! it lands in `tightening.diagnostics_dir`, the working directory by default.
//!
//! ## Example
//!
//! ```ignore
//! use netprep_algo::{prepare, ClarabelOracle, PrepConfig};
//!
//! let config = PrepConfig::load_from("netprep.toml".as_ref())?;
//! let prepared = prepare(topology, fleet, &ClarabelOracle::default(), &config)?;
//! println!(
//!     "{} buses, {} lines, {} active bounds",
//!     prepared.topology.num_buses(),
//!     prepared.topology.num_lines(),
//!     prepared.active_bounds.count_active(),
//! );
//! ```

pub mod config;
pub mod error;
pub mod lp;
pub mod pipeline;
pub mod ptdf;
pub mod reduce;
pub mod tighten;

pub use config::{PrepConfig, PtdfConfig, ReductionConfig, TighteningConfig};
pub use error::{PrepError, PrepResult};
#[cfg(feature = "solver-clarabel")]
pub use lp::GoodLpOracle;
pub use lp::{ClarabelOracle, LpModel, LpOracle, LpOutcome, LpStatus, Objective, Relation, Sense, VarId};
pub use pipeline::{prepare, PassStats, PipelineReport, PreparedNetwork};
pub use ptdf::{build_ptdf, PtdfTable};
pub use reduce::{reduce, KeepMidpoints, MidpointEliminator, ReductionReport, SeriesEliminator};
pub use tighten::{ActiveBoundSet, BoundTightener, LineFlags, TighteningReport};
