//! DC angle model used to probe how far each line flow can go.
//!
//! ```text
//! θ_ref = 0,  θ_b ≥ -angle_bound
//! f_ℓ = (θ_from - θ_to) / x_ℓ
//! p_b - Σ_{ℓ leaves b} f_ℓ + Σ_{ℓ enters b} f_ℓ = 0
//! p_b ∈ [min injection, max injection]
//! f_ℓ ∈ [min lower bound, max upper bound]   (lines with an active flag)
//! ```
//!
//! Buses without lines carry no flow and are left out.

use netprep_core::{decompose, ThermalFleet, Topology};

use super::bounds::ActiveBoundSet;
use crate::error::PrepResult;
use crate::lp::{LpModel, Relation, VarId};

/// Per-bus injection range by period: max = Σ coeff·max_p - net load,
/// min = -net load.
#[derive(Debug, Clone)]
pub struct InjectionBounds {
    min: Vec<Vec<f64>>,
    max: Vec<Vec<f64>>,
}

impl InjectionBounds {
    pub fn compute(topology: &Topology, fleet: &ThermalFleet) -> Self {
        let (min, max) = topology
            .buses()
            .iter()
            .map(|bus| {
                let gen = fleet.max_generation_at(bus.id);
                let min: Vec<f64> = bus.net_load.iter().map(|nl| -nl).collect();
                let max: Vec<f64> = bus.net_load.iter().map(|nl| gen - nl).collect();
                (min, max)
            })
            .unzip();
        Self { min, max }
    }

    /// Range over the whole horizon of the bus at `bus_pos`.
    pub fn aggregate(&self, bus_pos: usize) -> (f64, f64) {
        let lo = self.min[bus_pos].iter().copied().fold(f64::INFINITY, f64::min);
        let hi = self.max[bus_pos].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lo, hi)
    }

    pub fn period(&self, bus_pos: usize, period: usize) -> (f64, f64) {
        (self.min[bus_pos][period], self.max[bus_pos][period])
    }
}

#[derive(Debug, Clone)]
pub struct AngleModel {
    pub model: LpModel,
    flow: Vec<VarId>,
    injection: Vec<Option<VarId>>,
}

impl AngleModel {
    /// Builds the model with injections bounded over the whole horizon.
    pub fn build(
        topology: &Topology,
        injections: &InjectionBounds,
        flags: &ActiveBoundSet,
        angle_bound: f64,
    ) -> PrepResult<Self> {
        let mut model = LpModel::new("angles");
        let partition = decompose(topology);
        let references = partition.reference_buses(topology);

        let theta: Vec<Option<VarId>> = topology
            .buses()
            .iter()
            .map(|bus| {
                if bus.degree() == 0 {
                    None
                } else if references.contains(&bus.id) {
                    Some(model.add_variable(format!("theta_{}", bus.id), Some(0.0), Some(0.0)))
                } else {
                    Some(model.add_variable(format!("theta_{}", bus.id), Some(-angle_bound), None))
                }
            })
            .collect();

        let injection: Vec<Option<VarId>> = topology
            .buses()
            .iter()
            .enumerate()
            .map(|(pos, bus)| {
                (bus.degree() > 0).then(|| {
                    let (lo, hi) = injections.aggregate(pos);
                    model.add_variable(format!("p_{}", bus.id), Some(lo), Some(hi))
                })
            })
            .collect();

        let mut flow = Vec::with_capacity(topology.num_lines());
        for line in topology.lines() {
            let (lo, hi) = if flags.any_active(line.id) {
                (Some(line.params.normal.min_lower()), Some(line.params.normal.max_upper()))
            } else {
                (None, None)
            };
            let f = model.add_variable(format!("flow_{}", line.id), lo, hi);
            flow.push(f);

            let from = topology
                .bus_position(line.from_bus)
                .and_then(|p| theta[p])
                .ok_or(netprep_core::NetError::UnknownBus(line.from_bus))?;
            let to = topology
                .bus_position(line.to_bus)
                .and_then(|p| theta[p])
                .ok_or(netprep_core::NetError::UnknownBus(line.to_bus))?;
            let y = line.params.susceptance();
            model.add_constraint(
                format!("flow_def_{}", line.id),
                vec![(f, 1.0), (from, -y), (to, y)],
                Relation::Eq,
                0.0,
            );
        }

        for (pos, bus) in topology.buses().iter().enumerate() {
            let Some(p) = injection[pos] else { continue };
            let mut terms = vec![(p, 1.0)];
            for id in bus.lines_from() {
                if let Some(lp) = topology.line_position(*id) {
                    terms.push((flow[lp], -1.0));
                }
            }
            for id in bus.lines_to() {
                if let Some(lp) = topology.line_position(*id) {
                    terms.push((flow[lp], 1.0));
                }
            }
            model.add_constraint(format!("balance_{}", bus.id), terms, Relation::Eq, 0.0);
        }

        Ok(Self {
            model,
            flow,
            injection,
        })
    }

    pub fn flow_var(&self, line_pos: usize) -> VarId {
        self.flow[line_pos]
    }

    pub fn bound_injections_for_period(&mut self, injections: &InjectionBounds, period: usize) {
        for (pos, var) in self.injection.iter().enumerate() {
            if let Some(var) = var {
                let (lo, hi) = injections.period(pos, period);
                self.model.set_bounds(*var, Some(lo), Some(hi));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netprep_core::units::{Megawatts, PowerBase};
    use netprep_core::{Bus, BusId, LineParams, ThermalUnit, UnitId};

    fn setup() -> (Topology, ThermalFleet) {
        let base = PowerBase::default();
        let mut topology = Topology::new(2);
        topology.add_bus(Bus::new(BusId::new(1), "gen", 2)).unwrap();
        topology
            .add_bus(Bus::new(BusId::new(2), "load", 2).with_net_load(vec![0.3, 0.6]))
            .unwrap();
        topology.add_bus(Bus::new(BusId::new(3), "island", 2)).unwrap();
        topology
            .push_line(BusId::new(1), BusId::new(2), LineParams::from_rating(0.1, Megawatts(100.0), base, 2))
            .unwrap();
        let mut fleet = ThermalFleet::new();
        fleet
            .add_unit(ThermalUnit::new(UnitId::new(1), "g", BusId::new(1)).with_p_limits(0.0, 1.0))
            .unwrap();
        (topology, fleet)
    }

    #[test]
    fn test_injection_bounds() {
        let (topology, fleet) = setup();
        let inj = InjectionBounds::compute(&topology, &fleet);
        assert_eq!(inj.aggregate(0), (0.0, 1.0));
        assert_eq!(inj.aggregate(1), (-0.6, -0.3));
        assert_eq!(inj.period(1, 0), (-0.3, -0.3));
    }

    #[test]
    fn test_model_shape() {
        let (topology, fleet) = setup();
        let inj = InjectionBounds::compute(&topology, &fleet);
        let flags = ActiveBoundSet::from_topology(&topology);
        let angle = AngleModel::build(&topology, &inj, &flags, 1e4).unwrap();

        // two angles, two injections, one flow; the lineless bus is skipped
        assert_eq!(angle.model.num_variables(), 5);
        // one flow definition, two balances
        assert_eq!(angle.model.constraints().len(), 3);
        let flow = angle.model.variable(angle.flow_var(0));
        assert_eq!((flow.lower, flow.upper), (Some(-1.0), Some(1.0)));
        let theta_ref = &angle.model.variables()[0];
        assert_eq!((theta_ref.lower, theta_ref.upper), (Some(0.0), Some(0.0)));
    }

    #[test]
    fn test_period_rebounding() {
        let (topology, fleet) = setup();
        let inj = InjectionBounds::compute(&topology, &fleet);
        let flags = ActiveBoundSet::from_topology(&topology);
        let mut angle = AngleModel::build(&topology, &inj, &flags, 1e4).unwrap();
        angle.bound_injections_for_period(&inj, 1);
        let p_load = angle
            .model
            .variables()
            .iter()
            .find(|v| v.name == "p_2")
            .unwrap();
        assert_eq!((p_load.lower, p_load.upper), (Some(-0.6), Some(-0.6)));
    }
}
