use nalgebra::{Isometry3, Point3, Vector3};
use tracing::debug;

use super::calc::ComponentCalc;
use super::conditions::FlightConditions;
use super::drag::{axial_cd, base_cd, component_cf, stagnation_cd};
use super::forces::{AerodynamicForces, CenterOfPressure};
use crate::error::Result;
use crate::math::{pow2, pow3, pow4, sign, EPSILON};
use crate::vehicle::{ComponentId, FlightConfiguration, RocketLayout};
use crate::warning::WarningSet;

/// Drag coefficients of fins and body broadside to the flow.
const TUMBLE_CD_FIN: f64 = 1.42;
const TUMBLE_CD_BODY: f64 = 0.56;
/// Tumbling drag efficiency by fin count.
const FIN_EFFICIENCY: [f64; 8] = [0.0, 0.5, 1.0, 1.41, 1.81, 1.73, 1.90, 1.85];

// ---------------------------------------------------------------------------
// Whole-rocket Barrowman aggregator
// ---------------------------------------------------------------------------

/// One aerodynamic component with its placed instances.
#[derive(Debug, Clone)]
struct CalcEntry {
    id: ComponentId,
    stage: usize,
    x: f64,      // fore end, m
    length: f64, // m
    fin_count: usize,
    prev_body: Option<ComponentId>,
    next_body: Option<ComponentId>,
    calc: ComponentCalc,
    instances: Vec<Isometry3<f64>>,
}

/// Aerodynamic model of a rocket, built once per layout and shared
/// read-only between flight branches.
#[derive(Debug, Clone)]
pub struct BarrowmanCalculator {
    entries: Vec<CalcEntry>,
    roughness: f64,
    perfect_finish: bool,
}

impl BarrowmanCalculator {
    pub fn new(layout: &RocketLayout) -> Result<Self> {
        let mut entries = vec![];
        for component in &layout.components {
            let Some(calc) = ComponentCalc::new(layout, component)? else {
                continue;
            };
            let instances = calc
                .instance_angles(component)
                .into_iter()
                .map(|angle| {
                    let offset = Vector3::new(component.x, 0.0, 0.0);
                    Isometry3::new(offset, Vector3::new(angle, 0.0, 0.0))
                })
                .collect();
            let fin_count = match &calc {
                ComponentCalc::FinSet(g) => g.fin_count,
                _ => 0,
            };
            entries.push(CalcEntry {
                id: component.id,
                stage: component.stage,
                x: component.x,
                length: component.length,
                fin_count,
                prev_body: component.prev_body,
                next_body: component.next_body,
                calc,
                instances,
            });
        }
        debug!(components = entries.len(), "aerodynamic model built");
        Ok(Self { entries, roughness: layout.roughness, perfect_finish: layout.perfect_finish })
    }

    fn active<'a>(
        &'a self,
        config: &'a FlightConfiguration,
    ) -> impl Iterator<Item = &'a CalcEntry> + 'a {
        self.entries.iter().filter(move |e| config.is_stage_active(e.stage))
    }

    fn body_entry(&self, id: ComponentId, config: &FlightConfiguration) -> Option<&CalcEntry> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .filter(|e| config.is_stage_active(e.stage))
    }

    /// Axial extent of the active airframe, the Reynolds-number length.
    pub fn aerodynamic_length(&self, config: &FlightConfiguration) -> f64 {
        let (lo, hi) = self
            .active(config)
            .filter(|e| e.calc.body().is_some())
            .fold((f64::MAX, f64::MIN), |(lo, hi), e| (lo.min(e.x), hi.max(e.x + e.length)));
        if hi > lo {
            hi - lo
        } else {
            0.0
        }
    }

    // -----------------------------------------------------------------------
    // Normal forces and moments
    // -----------------------------------------------------------------------

    /// Sum of the per-instance normal forces with CP in rocket coordinates.
    pub fn nonaxial_forces(
        &self,
        config: &FlightConfiguration,
        conditions: &FlightConditions,
        warnings: &mut WarningSet,
    ) -> AerodynamicForces {
        let mut total = AerodynamicForces::zero();
        for entry in self.active(config) {
            for transform in &entry.instances {
                let mut f = entry.calc.nonaxial_forces(conditions, transform, warnings);
                let cp = transform.transform_point(&Point3::new(f.cp.x, f.cp.y, f.cp.z));
                f.cp = CenterOfPressure::axial(cp.x, f.cp.weight);
                f.cm = f.cn * f.cp.x / conditions.ref_length;
                total.merge(&f);
            }
        }
        total
    }

    /// Centre of pressure of the active stages.
    pub fn cp(
        &self,
        config: &FlightConfiguration,
        conditions: &FlightConditions,
    ) -> CenterOfPressure {
        let mut ignored = WarningSet::new();
        self.nonaxial_forces(config, conditions, &mut ignored).cp
    }

    // -----------------------------------------------------------------------
    // Drag
    // -----------------------------------------------------------------------

    /// Friction, pressure and base drag plus the axial coefficient, written
    /// into `total`.
    pub fn drag(
        &self,
        config: &FlightConfiguration,
        conditions: &FlightConditions,
        warnings: &mut WarningSet,
        total: &mut AerodynamicForces,
    ) {
        let mach = conditions.mach;
        let length = self.aerodynamic_length(config);
        let re = conditions.velocity * length / conditions.kinematic_viscosity();
        let cf = component_cf(mach, re, self.roughness, length, self.perfect_finish);
        let stagnation = stagnation_cd(mach);
        let base = base_cd(mach);

        let (mut body_friction, mut other_friction) = (0.0, 0.0);
        let (mut min_x, mut max_x, mut max_r) = (f64::MAX, 0.0_f64, 0.0_f64);
        let (mut pressure, mut base_total) = (0.0, 0.0);

        for entry in self.active(config) {
            let count = entry.instances.len() as f64;
            let friction = entry.calc.friction_drag_coefficient(conditions, cf, warnings) * count;
            let component_pressure =
                entry.calc.pressure_drag_coefficient(conditions, stagnation, base, warnings);
            pressure += component_pressure * count;

            let Some(body) = entry.calc.body() else {
                other_friction += friction;
                continue;
            };
            body_friction += friction;
            min_x = min_x.min(entry.x);
            max_x = max_x.max(entry.x + entry.length);
            max_r = max_r.max(body.fore_radius.max(body.aft_radius));

            let (mut fore, mut aft) = (body.fore_radius, body.aft_radius);
            if entry.length == 0.0 {
                fore = fore.max(aft);
                aft = fore;
            }

            // forward-facing disc not shadowed by the body in front
            let prev_r = entry
                .prev_body
                .and_then(|id| self.body_entry(id, config))
                .and_then(|e| e.calc.body())
                .map_or(0.0, |b| b.aft_radius);
            if prev_r < fore {
                let exposed = std::f64::consts::PI * (pow2(fore) - pow2(prev_r));
                pressure += stagnation * exposed / conditions.ref_area;
            }

            let next_r = entry
                .next_body
                .and_then(|id| self.body_entry(id, config))
                .and_then(|e| e.calc.body())
                .map_or(0.0, |b| b.fore_radius);
            if next_r < aft {
                let exposed = std::f64::consts::PI * (pow2(aft) - pow2(next_r));
                base_total += base * exposed / conditions.ref_area;
            }
        }

        let correction = if max_r > 0.0 {
            let fineness = (max_x - min_x + 0.0001) / max_r;
            1.0 + 1.0 / (2.0 * fineness)
        } else {
            1.0
        };

        total.friction_cd = other_friction + correction * body_friction;
        total.pressure_cd = pressure;
        total.base_cd = base_total;
        total.cd = total.friction_cd + total.pressure_cd + total.base_cd;
        total.cd_axial = axial_cd(conditions.aoa, total.cd);
    }

    // -----------------------------------------------------------------------
    // Pitch and yaw damping
    // -----------------------------------------------------------------------

    fn damping_multiplier(
        &self,
        config: &FlightConfiguration,
        conditions: &FlightConditions,
        cg: f64,
    ) -> f64 {
        let (mut area, mut length) = (0.0, 0.0);
        for body in self.active(config).filter_map(|e| e.calc.body()) {
            area += body.planform_area;
            length += body.length;
        }
        let diameter = if length > 0.0 { area / length } else { 0.0 };
        let ref_moment = conditions.ref_area * conditions.ref_length;

        let mut mul = 0.275 * diameter / ref_moment * (pow4(cg) + pow4(length - cg));
        for entry in self.active(config) {
            if let ComponentCalc::FinSet(g) = &entry.calc {
                let midchord = entry.x + g.midchord_position();
                let fin_count = entry.fin_count.min(4) as f64;
                mul += 0.6 * fin_count * g.area * pow3((midchord - cg).abs()) / ref_moment;
            }
        }
        mul
    }

    /// Pitch and yaw damping moments for rotation about `cg`, written into
    /// `total`. `total.cm` must already hold the pitch moment.
    pub fn damping_moments(
        &self,
        config: &FlightConfiguration,
        conditions: &FlightConditions,
        cg: f64,
        total: &mut AerodynamicForces,
    ) {
        let v = conditions.velocity;
        if v < EPSILON {
            total.pitch_damping_moment = 0.0;
            total.yaw_damping_moment = 0.0;
            return;
        }
        // tripled for a realistic turn at apogee
        let mul = 3.0 * self.damping_multiplier(config, conditions, cg);
        let pitch = (mul * pow2(conditions.pitch_rate / v)).min(total.cm);
        let yaw = (mul * pow2(conditions.yaw_rate / v)).min(total.cyaw);
        total.pitch_damping_moment = sign(conditions.pitch_rate) * pitch;
        total.yaw_damping_moment = sign(conditions.yaw_rate) * yaw;
    }

    /// Drag area (m^2) of the rocket tumbling end over end.
    pub fn tumble_drag_area(&self, config: &FlightConfiguration) -> f64 {
        let (mut fins, mut body) = (0.0, 0.0);
        for entry in self.active(config) {
            match &entry.calc {
                ComponentCalc::FinSet(g) if g.fin_count > 0 => {
                    let eff = FIN_EFFICIENCY[g.fin_count.min(FIN_EFFICIENCY.len() - 1)];
                    fins += g.area * eff / g.fin_count as f64;
                }
                ComponentCalc::BodyTube(g) | ComponentCalc::Transition(g) => {
                    body += g.planform_area;
                }
                _ => {}
            }
        }
        TUMBLE_CD_FIN * fins + TUMBLE_CD_BODY * body
    }

    /// Normal forces, drag and damping in one evaluation.
    pub fn forces(
        &self,
        config: &FlightConfiguration,
        conditions: &FlightConditions,
        cg: f64,
        warnings: &mut WarningSet,
    ) -> AerodynamicForces {
        let mut total = self.nonaxial_forces(config, conditions, warnings);
        self.drag(config, conditions, warnings, &mut total);
        self.damping_moments(config, conditions, cg, &mut total);
        total.cm -= total.pitch_damping_moment;
        total.cyaw -= total.yaw_damping_moment;
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::isa;
    use crate::vehicle::presets;
    use approx::assert_relative_eq;

    fn setup() -> (RocketLayout, BarrowmanCalculator, FlightConfiguration) {
        let rocket = presets::sparrow();
        let layout = RocketLayout::new(&rocket);
        let calc = BarrowmanCalculator::new(&layout).unwrap();
        (layout, calc, FlightConfiguration::new(&rocket))
    }

    #[test]
    fn tumbling_drag_area_counts_fins_and_body() {
        let (_, calc, config) = setup();
        let area = calc.tumble_drag_area(&config);
        assert!(area > 0.0);
        let mut none = config.clone();
        none.set_stage_active(0, false);
        assert_eq!(calc.tumble_drag_area(&none), 0.0);
    }

    #[test]
    fn sparrow_is_stable() {
        let (layout, calc, config) = setup();
        let cond = FlightConditions::new(layout.reference_length(&config), isa(0.0))
            .with_velocity(50.0)
            .with_aoa(0.05);
        let cp = calc.cp(&config, &cond);
        let length = calc.aerodynamic_length(&config);
        assert_relative_eq!(length, 0.324, epsilon = 1e-9);
        // CP well aft of the mid-body
        assert!(cp.x > 0.5 * length && cp.x < length, "cp {}", cp.x);
    }

    #[test]
    fn fin_cp_independent_of_roll_plane() {
        let (layout, calc, config) = setup();
        let base = FlightConditions::new(layout.reference_length(&config), isa(0.0))
            .with_velocity(50.0)
            .with_aoa(0.05);
        let a = calc.cp(&config, &base.clone().with_theta(0.0));
        let b = calc.cp(&config, &base.with_theta(0.7));
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
        assert_relative_eq!(a.weight, b.weight, max_relative = 1e-9);
    }

    #[test]
    fn drag_is_positive_and_axial_matches_at_zero_aoa() {
        let (layout, calc, config) = setup();
        let cond =
            FlightConditions::new(layout.reference_length(&config), isa(0.0)).with_velocity(60.0);
        let mut warnings = WarningSet::new();
        let f = calc.forces(&config, &cond, 0.2, &mut warnings);
        assert!(f.friction_cd > 0.0);
        assert!(f.pressure_cd > 0.0);
        assert!(f.base_cd > 0.0);
        assert_relative_eq!(f.cd, f.friction_cd + f.pressure_cd + f.base_cd);
        assert_relative_eq!(f.cd_axial, f.cd, epsilon = 1e-9);
        assert!(f.cd > 0.2 && f.cd < 1.5, "cd {}", f.cd);
    }

    #[test]
    fn no_rotation_no_damping() {
        let (layout, calc, config) = setup();
        let cond = FlightConditions::new(layout.reference_length(&config), isa(0.0))
            .with_velocity(60.0)
            .with_aoa(0.02);
        let mut warnings = WarningSet::new();
        let f = calc.forces(&config, &cond, 0.2, &mut warnings);
        assert_eq!(f.pitch_damping_moment, 0.0);
        assert_eq!(f.yaw_damping_moment, 0.0);
        assert_eq!(f.croll, 0.0);
    }
}
