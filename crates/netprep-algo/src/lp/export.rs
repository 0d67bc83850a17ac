//! CPLEX LP-format rendering of a model, used for infeasibility diagnostics.

use std::fmt::Write as _;
use std::path::Path;

use super::{LpModel, Objective, Relation, Sense, VarId};
use crate::error::PrepResult;

fn lp_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

impl LpModel {
    fn write_terms(&self, out: &mut String, terms: &[(VarId, f64)]) {
        for (var, coeff) in terms {
            let sign = if *coeff < 0.0 { '-' } else { '+' };
            let _ = write!(out, " {sign} {} {}", coeff.abs(), lp_name(&self.variable(*var).name));
        }
    }

    /// Renders the model; `objective` defaults to the zero objective.
    pub fn to_lp_format(&self, objective: Option<&Objective>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\\ Model {}", self.name);

        let sense = objective.map_or(Sense::Minimize, |o| o.sense);
        out.push_str(match sense {
            Sense::Minimize => "Minimize\n",
            Sense::Maximize => "Maximize\n",
        });
        out.push_str(" obj:");
        match objective {
            Some(o) if !o.terms.is_empty() => self.write_terms(&mut out, &o.terms),
            _ => {
                if let Some(first) = self.variables().first() {
                    let _ = write!(out, " 0 {}", lp_name(&first.name));
                }
            }
        }
        out.push('\n');

        out.push_str("Subject To\n");
        for c in self.constraints() {
            let _ = write!(out, " {}:", lp_name(&c.name));
            self.write_terms(&mut out, &c.terms);
            let op = match c.relation {
                Relation::Eq => "=",
                Relation::Le => "<=",
                Relation::Ge => ">=",
            };
            let _ = writeln!(out, " {op} {}", c.rhs);
        }

        out.push_str("Bounds\n");
        for v in self.variables() {
            let name = lp_name(&v.name);
            let _ = match (v.lower, v.upper) {
                (None, None) => writeln!(out, " {name} free"),
                (Some(l), Some(u)) if l == u => writeln!(out, " {name} = {l}"),
                (Some(l), Some(u)) => writeln!(out, " {l} <= {name} <= {u}"),
                (Some(l), None) => writeln!(out, " {name} >= {l}"),
                (None, Some(u)) => writeln!(out, " -inf <= {name} <= {u}"),
            };
        }
        out.push_str("End\n");
        out
    }

    pub fn write_lp(&self, path: &Path, objective: Option<&Objective>) -> PrepResult<()> {
        std::fs::write(path, self.to_lp_format(objective))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lp_format_sections() {
        let mut model = LpModel::new("angles");
        let theta = model.add_variable("theta_1", Some(-1e4), None);
        let flow = model.add_variable("flow_0", None, None);
        let p = model.add_variable("p 2", Some(-0.5), Some(1.0));
        let fixed = model.add_variable("theta_2", Some(0.0), Some(0.0));
        model.add_constraint("flow_def_0", vec![(flow, 1.0), (theta, -10.0), (fixed, 10.0)], Relation::Eq, 0.0);
        model.add_constraint("cap", vec![(p, 1.0)], Relation::Le, 0.75);

        let text = model.to_lp_format(Some(&Objective::maximize(flow)));
        assert!(text.starts_with("\\ Model angles\nMaximize\n obj: + 1 flow_0\n"));
        assert!(text.contains(" flow_def_0: + 1 flow_0 - 10 theta_1 + 10 theta_2 = 0\n"));
        assert!(text.contains(" cap: + 1 p_2 <= 0.75\n"));
        assert!(text.contains(" theta_1 >= -10000\n"));
        assert!(text.contains(" flow_0 free\n"));
        assert!(text.contains(" -0.5 <= p_2 <= 1\n"));
        assert!(text.contains(" theta_2 = 0\n"));
        assert!(text.ends_with("End\n"));
    }

    #[test]
    fn test_names_are_sanitized() {
        assert_eq!(lp_name("3rd bus"), "_3rd_bus");
        assert_eq!(lp_name("ok_name"), "ok_name");
        assert_eq!(lp_name(""), "_");
    }

    #[test]
    fn test_write_lp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.lp");
        let mut model = LpModel::new("tiny");
        model.add_variable("x", Some(0.0), Some(1.0));
        model.write_lp(&path, None).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Minimize\n obj: 0 x\n"));
    }
}
