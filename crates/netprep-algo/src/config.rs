//! Pre-processing configuration.
//!
//! [`PrepConfig`] groups the tolerances, budgets and switches of every pass.
//! All sections are `#[serde(default)]`, so a TOML file only needs the keys it
//! changes:
//!
//! ```toml
//! [tightening]
//! time_limit_secs = 600
//! workers = 4
//! diagnostics_dir = "/var/tmp/netprep"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, PrepResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    pub ptdf: PtdfConfig,

    pub reduction: ReductionConfig,

    pub tightening: TighteningConfig,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            ptdf: PtdfConfig::default(),
            reduction: ReductionConfig::default(),
            tightening: TighteningConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PtdfConfig {
    /// Coefficients with a smaller magnitude are stored as zero.
    pub coeff_tolerance: f64,
}

impl Default for PtdfConfig {
    fn default() -> Self {
        Self {
            coeff_tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Remove end-of-line and mid-point buses.
    pub enabled: bool,

    /// Fail when reduction leaves no line while the scheduler still wants a
    /// flow-based network model.
    pub require_flow_model: bool,

    /// Replace degree-2 zero-injection buses by a series branch.
    pub eliminate_midpoints: bool,

    /// Upper bound on reduce → PTDF → tighten passes.
    pub max_passes: usize,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_flow_model: true,
            eliminate_midpoints: false,
            max_passes: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TighteningConfig {
    pub enabled: bool,

    /// A bound is unreachable when the optimum misses it by more than this (p.u.).
    pub epsilon: f64,

    /// Wall-clock budget for one tightening call.
    pub time_limit_secs: u64,

    /// Number of worker threads (0 = rayon default).
    pub workers: usize,

    /// Refine surviving bounds period by period.
    pub run_single_period_models: bool,

    /// Lower bound on bus angles in radians.
    pub angle_bound: f64,

    /// Directory that receives the model when it turns out infeasible.
    /// Created on demand; defaults to the working directory.
    pub diagnostics_dir: PathBuf,
}

impl Default for TighteningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            epsilon: 1e-6,
            time_limit_secs: 3600,
            workers: 1,
            run_single_period_models: true,
            angle_bound: 1e4,
            diagnostics_dir: PathBuf::from("."),
        }
    }
}

impl TighteningConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }
}

impl PrepConfig {
    pub fn from_toml_str(contents: &str) -> PrepResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load_from(path: &Path) -> PrepResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> PrepResult<()> {
        if !(self.ptdf.coeff_tolerance >= 0.0) {
            return Err(PrepError::Config(format!(
                "ptdf.coeff_tolerance must be non-negative, got {}",
                self.ptdf.coeff_tolerance
            )));
        }
        if !(self.tightening.epsilon >= 0.0) {
            return Err(PrepError::Config(format!(
                "tightening.epsilon must be non-negative, got {}",
                self.tightening.epsilon
            )));
        }
        if !(self.tightening.angle_bound > 0.0) {
            return Err(PrepError::Config(format!(
                "tightening.angle_bound must be positive, got {}",
                self.tightening.angle_bound
            )));
        }
        if self.reduction.max_passes == 0 {
            return Err(PrepError::Config("reduction.max_passes must be at least 1".into()));
        }
        Ok(())
    }
}
