//! LP oracle going through `good_lp` with its Clarabel backend.
//!
//! `good_lp` exposes no time limit for this backend, so the budget is only
//! checked before the solve starts.

use std::time::Duration;

use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};

use super::{LpModel, LpOracle, LpOutcome, Objective, Relation, Sense, VarId};
use crate::error::{PrepError, PrepResult};

#[derive(Debug, Clone, Default)]
pub struct GoodLpOracle;

fn linear(terms: &[(VarId, f64)], handles: &[Variable]) -> Expression {
    terms
        .iter()
        .fold(Expression::from(0.0), |acc, (v, c)| acc + *c * handles[v.index()])
}

impl LpOracle for GoodLpOracle {
    fn solve(&self, model: &LpModel, objective: &Objective, time_limit: Duration) -> PrepResult<LpOutcome> {
        if time_limit.is_zero() {
            return Ok(LpOutcome::time_limit());
        }

        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = model
            .variables()
            .iter()
            .map(|v| {
                let mut def = variable().name(v.name.clone());
                if let Some(lower) = v.lower {
                    def = def.min(lower);
                }
                if let Some(upper) = v.upper {
                    def = def.max(upper);
                }
                vars.add(def)
            })
            .collect();

        let goal = linear(&objective.terms, &handles);
        let unsolved = match objective.sense {
            Sense::Minimize => vars.minimise(goal),
            Sense::Maximize => vars.maximise(goal),
        };
        let mut problem = unsolved.using(clarabel);

        for c in model.constraints() {
            let lhs = linear(&c.terms, &handles);
            problem = match c.relation {
                Relation::Eq => problem.with(constraint!(lhs == c.rhs)),
                Relation::Le => problem.with(constraint!(lhs <= c.rhs)),
                Relation::Ge => problem.with(constraint!(lhs >= c.rhs)),
            };
        }

        match problem.solve() {
            Ok(solution) => {
                let value = objective
                    .terms
                    .iter()
                    .map(|(v, c)| c * solution.value(handles[v.index()]))
                    .sum();
                Ok(LpOutcome::optimal(value))
            }
            Err(ResolutionError::Infeasible) => Ok(LpOutcome::infeasible()),
            Err(e) => Err(PrepError::Solver(format!("good_lp ({}): {e}", model.name))),
        }
    }

    fn name(&self) -> &str {
        "good_lp-clarabel"
    }
}
