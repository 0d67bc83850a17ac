//! LP oracle calling Clarabel directly.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    (1/2)x'Px + q'x
//! subject to  Ax + s = b,  s ∈ K
//! ```
//!
//! An LP uses P = 0. Equalities (and fixed variables) go to one zero cone,
//! inequalities and finite variable bounds to one nonnegative cone, in that
//! row order.

use std::time::Duration;

use clarabel::{
    algebra::CscMatrix,
    solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT},
};

use super::{LpModel, LpOracle, LpOutcome, Objective, Relation, Sense};
use crate::error::{PrepError, PrepResult};

#[derive(Debug, Clone, Default)]
pub struct ClarabelOracle {
    /// Print Clarabel's iteration log.
    pub verbose: bool,
}

impl ClarabelOracle {
    pub fn new() -> Self {
        Self::default()
    }
}

type Row = (Vec<(usize, f64)>, f64);

/// Splits the model into zero-cone rows and nonnegative-cone rows, both in
/// `a·x (+ s) = b` form.
fn conic_rows(model: &LpModel) -> (Vec<Row>, Vec<Row>) {
    let mut eq: Vec<Row> = Vec::new();
    let mut ineq: Vec<Row> = Vec::new();

    for c in model.constraints() {
        let terms: Vec<(usize, f64)> = c.terms.iter().map(|(v, a)| (v.index(), *a)).collect();
        match c.relation {
            Relation::Eq => eq.push((terms, c.rhs)),
            Relation::Le => ineq.push((terms, c.rhs)),
            Relation::Ge => ineq.push((terms.into_iter().map(|(i, a)| (i, -a)).collect(), -c.rhs)),
        }
    }

    for (i, var) in model.variables().iter().enumerate() {
        match (var.lower, var.upper) {
            (Some(l), Some(u)) if l == u => eq.push((vec![(i, 1.0)], l)),
            (lower, upper) => {
                if let Some(u) = upper {
                    ineq.push((vec![(i, 1.0)], u));
                }
                if let Some(l) = lower {
                    ineq.push((vec![(i, -1.0)], -l));
                }
            }
        }
    }
    (eq, ineq)
}

impl LpOracle for ClarabelOracle {
    fn solve(&self, model: &LpModel, objective: &Objective, time_limit: Duration) -> PrepResult<LpOutcome> {
        if time_limit.is_zero() {
            return Ok(LpOutcome::time_limit());
        }
        let n_var = model.num_variables();
        if n_var == 0 {
            return Ok(LpOutcome::optimal(0.0));
        }

        let (eq, ineq) = conic_rows(model);

        // Column-wise entries; a variable repeated within one row is summed
        let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_var];
        let mut rhs = Vec::with_capacity(eq.len() + ineq.len());
        for (row, (terms, b)) in eq.iter().chain(ineq.iter()).enumerate() {
            for &(col, a) in terms {
                match columns[col].last_mut() {
                    Some((r, v)) if *r == row => *v += a,
                    _ => columns[col].push((row, a)),
                }
            }
            rhs.push(*b);
        }

        let mut col_ptr = Vec::with_capacity(n_var + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        for column in &columns {
            col_ptr.push(row_idx.len());
            for &(r, v) in column {
                row_idx.push(r);
                values.push(v);
            }
        }
        col_ptr.push(row_idx.len());

        let a_mat = CscMatrix::new(rhs.len(), n_var, col_ptr, row_idx, values);
        let p_mat = CscMatrix::new(n_var, n_var, vec![0; n_var + 1], Vec::new(), Vec::new());

        let sign = match objective.sense {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        let mut q = vec![0.0; n_var];
        for (var, c) in &objective.terms {
            q[var.index()] += sign * c;
        }

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if !eq.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(eq.len()));
        }
        if !ineq.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(ineq.len()));
        }

        let settings = DefaultSettingsBuilder::default()
            .verbose(self.verbose)
            .time_limit(time_limit.as_secs_f64())
            .build()
            .map_err(|e| PrepError::Solver(format!("Clarabel settings error: {:?}", e)))?;

        let mut solver = DefaultSolver::new(&p_mat, &q, &a_mat, &rhs, &cones, settings)
            .map_err(|e| PrepError::Solver(format!("Clarabel initialization failed: {:?}", e)))?;
        solver.solve();

        let sol = &solver.solution;
        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                Ok(LpOutcome::optimal(objective.evaluate(&sol.x)))
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Ok(LpOutcome::infeasible())
            }
            SolverStatus::MaxTime => Ok(LpOutcome::time_limit()),
            other => Err(PrepError::Solver(format!(
                "{} ({} variables, {} rows) returned status {:?}",
                model.name,
                n_var,
                rhs.len(),
                other
            ))),
        }
    }

    fn name(&self) -> &str {
        "clarabel"
    }
}
