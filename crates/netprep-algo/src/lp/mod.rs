//! LP model descriptors and the oracles that solve them.
//!
//! An [`LpModel`] is plain data: bounded variables and linear rows. It can be
//! rebuilt, cloned per worker and handed to any [`LpOracle`], which solves it
//! for one [`Objective`] within a time limit and reports an [`LpOutcome`].
//! Nothing is kept between calls, so one oracle can serve many threads.

use std::time::Duration;

use crate::error::PrepResult;

mod clarabel_oracle;
mod export;
#[cfg(feature = "solver-clarabel")]
mod good_lp_oracle;

pub use clarabel_oracle::ClarabelOracle;
#[cfg(feature = "solver-clarabel")]
pub use good_lp_oracle::GoodLpOracle;

/// Index of a variable inside its [`LpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LpVariable {
    pub name: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LpModel {
    pub name: String,
    variables: Vec<LpVariable>,
    constraints: Vec<LinearConstraint>,
}

impl LpModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a variable; `None` means unbounded on that side.
    pub fn add_variable(&mut self, name: impl Into<String>, lower: Option<f64>, upper: Option<f64>) -> VarId {
        self.variables.push(LpVariable {
            name: name.into(),
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn set_bounds(&mut self, var: VarId, lower: Option<f64>, upper: Option<f64>) {
        let v = &mut self.variables[var.0];
        v.lower = lower;
        v.upper = upper;
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        relation: Relation,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            terms,
            relation,
            rhs,
        });
    }

    pub fn variables(&self) -> &[LpVariable] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &LpVariable {
        &self.variables[var.0]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: Sense,
    pub terms: Vec<(VarId, f64)>,
}

impl Objective {
    pub fn minimize(var: VarId) -> Self {
        Self {
            sense: Sense::Minimize,
            terms: vec![(var, 1.0)],
        }
    }

    pub fn maximize(var: VarId) -> Self {
        Self {
            sense: Sense::Maximize,
            terms: vec![(var, 1.0)],
        }
    }

    /// Value of the objective expression at `x`.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.terms.iter().map(|(v, c)| c * x[v.0]).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    TimeLimit,
    Infeasible,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LpOutcome {
    pub status: LpStatus,
    /// Objective value (in the objective's own sense) when optimal.
    pub objective: Option<f64>,
}

impl LpOutcome {
    pub fn optimal(objective: f64) -> Self {
        Self {
            status: LpStatus::Optimal,
            objective: Some(objective),
        }
    }

    pub fn time_limit() -> Self {
        Self {
            status: LpStatus::TimeLimit,
            objective: None,
        }
    }

    pub fn infeasible() -> Self {
        Self {
            status: LpStatus::Infeasible,
            objective: None,
        }
    }
}

/// Stateless LP solving service.
pub trait LpOracle: Send + Sync {
    /// Solve `model` for `objective`, giving up after `time_limit`.
    fn solve(&self, model: &LpModel, objective: &Objective, time_limit: Duration) -> PrepResult<LpOutcome>;

    fn name(&self) -> &str;
}
