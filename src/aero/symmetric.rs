use std::f64::consts::PI;
use std::sync::LazyLock;

use nalgebra::Isometry3;

use super::conditions::FlightConditions;
use super::forces::{AerodynamicForces, CenterOfPressure};
use super::tube::{interior_flow_cd, TubeFlow};
use crate::math::{pow2, safe_sqrt, LinearInterpolator, PolyInterpolator, EPSILON};
use crate::vehicle::component::{Transition, TransitionShape};
use crate::warning::{Warning, WarningSet};

/// Galejs body-lift constant.
pub const BODY_LIFT_K: f64 = 1.1;

const GAMMA: f64 = 1.4;
/// Axial slices used to integrate the body profile.
const PROFILE_SLICES: usize = 100;

static CONICAL_TRANSONIC: LazyLock<Option<PolyInterpolator>> =
    LazyLock::new(|| PolyInterpolator::new(&[&[1.0, 1.3], &[1.0, 1.3]]));

// ---------------------------------------------------------------------------
// Axisymmetric body geometry
// ---------------------------------------------------------------------------

/// Profile integrals of a nose cone, transition or body tube.
#[derive(Debug, Clone)]
pub struct SymmetricGeometry {
    pub name: String,
    pub length: f64,      // m
    pub fore_radius: f64, // m
    pub aft_radius: f64,  // m
    pub fineness: f64,
    pub full_volume: f64,     // m^3
    pub planform_area: f64,   // m^2, side projection
    pub planform_center: f64, // m from the fore end
    pub wetted_area: f64,     // m^2
    /// |π(r_fore² - r_aft²)|
    pub frontal_area: f64, // m^2
    /// Mach-indexed pressure drag of a forward-facing nose or shoulder.
    pub nose_drag: Option<LinearInterpolator>,
    /// Interior flow through a hollow forward airframe tube.
    pub interior: Option<TubeFlow>,
}

impl SymmetricGeometry {
    pub fn is_tube(&self) -> bool {
        (self.fore_radius - self.aft_radius).abs() < EPSILON
    }
}

/// Geometry of a transition or nose cone.
pub fn derive_transition(name: &str, t: &Transition) -> SymmetricGeometry {
    let mut geometry = profile(name, t.length, t.fore_radius, t.aft_radius, |x| t.radius_at(x));
    if t.aft_radius > t.fore_radius && t.length >= 0.001 {
        let r = t.radius_at(0.99 * t.length);
        let sin_phi = (t.aft_radius - r) / (t.aft_radius - r).hypot(0.01 * t.length);
        let param = match t.shape {
            TransitionShape::Conical => 0.0,
            TransitionShape::Ogive => t.shape_parameter,
        };
        geometry.nose_drag = Some(nose_drag_table(param, sin_phi));
    }
    geometry
}

/// Geometry of a body tube. `open` marks a hollow tube with nothing in
/// front of it, which lets air flow through the airframe.
pub fn derive_body_tube(
    name: &str,
    length: f64,
    outer_radius: f64,
    inner_radius: f64,
    open: bool,
    roughness: f64,
) -> SymmetricGeometry {
    let mut geometry = profile(name, length, outer_radius, outer_radius, |_| outer_radius);
    if open && inner_radius > 0.0 {
        geometry.interior = Some(TubeFlow { length, inner_radius, outer_radius, roughness });
    }
    geometry
}

fn profile(
    name: &str,
    length: f64,
    fore: f64,
    aft: f64,
    radius: impl Fn(f64) -> f64,
) -> SymmetricGeometry {
    let (mut volume, mut planform, mut moment, mut wetted) = (0.0, 0.0, 0.0, 0.0);
    if length > 0.0 {
        let dx = length / PROFILE_SLICES as f64;
        for i in 0..PROFILE_SLICES {
            let x0 = i as f64 * dx;
            let (r0, r1) = (radius(x0), radius(x0 + dx));
            let r = 0.5 * (r0 + r1);
            volume += PI * dx * (r0 * r0 + r0 * r1 + r1 * r1) / 3.0;
            planform += 2.0 * r * dx;
            moment += 2.0 * r * dx * (x0 + dx / 2.0);
            wetted += 2.0 * PI * r * dx.hypot(r1 - r0);
        }
    }
    SymmetricGeometry {
        name: name.to_string(),
        length,
        fore_radius: fore,
        aft_radius: aft,
        fineness: length / (2.0 * (aft - fore).abs()),
        full_volume: volume,
        planform_area: planform,
        planform_center: if planform > 0.0 { moment / planform } else { length / 2.0 },
        wetted_area: wetted,
        frontal_area: (PI * (pow2(fore) - pow2(aft))).abs(),
        nose_drag: None,
        interior: None,
    }
}

/// Pressure drag of a conical or ogive nose against Mach number, extended
/// below Mach 1 with a power law.
fn nose_drag_table(param: f64, sin_phi: f64) -> LinearInterpolator {
    let cd_mach1 = 2.1 * pow2(sin_phi) + 0.6019 * sin_phi;
    let mul = 0.72 * pow2(param - 0.5) + 0.82;

    let mut points = vec![];
    if let Some(poly) = CONICAL_TRANSONIC.as_ref() {
        let c = poly.interpolate(&[
            sin_phi,
            cd_mach1,
            4.0 / (GAMMA + 1.0) * (1.0 - 0.5 * cd_mach1),
            -1.1341 * sin_phi,
        ]);
        for i in 0..=15 {
            let m = 1.0 + 0.02 * i as f64;
            points.push((m, mul * PolyInterpolator::eval(m, &c)));
        }
    }
    for i in 0..134 {
        let m = 1.32 + 0.02 * i as f64;
        points.push((m, mul * (2.1 * pow2(sin_phi) + 0.5 * sin_phi / safe_sqrt(m * m - 1.0))));
    }
    let table = LinearInterpolator::new(points);

    let Some(min) = table.x_min() else {
        return table;
    };
    let min_value = table.value(min);
    if min_value < 0.001 {
        return table;
    }
    let cd_mach0 = 0.8 * pow2(sin_phi);
    let min_deriv = (table.value(min + 0.01) - min_value) / 0.01;
    if cd_mach0 >= min_value - 0.01 || min_deriv <= 0.01 {
        return table;
    }

    let a = min_value - cd_mach0;
    let b = min_deriv / a;
    let mut points = table.points().to_vec();
    let mut i = 0;
    while 0.05 * (i as f64) < min {
        let m = 0.05 * i as f64;
        points.push((m, a * m.powf(b) + cd_mach0));
        i += 1;
    }
    LinearInterpolator::new(points)
}

// ---------------------------------------------------------------------------
// Body forces
// ---------------------------------------------------------------------------

impl SymmetricGeometry {
    /// Barrowman normal force of the area change plus Galejs body lift.
    pub fn nonaxial_forces(
        &self,
        conditions: &FlightConditions,
        _transform: &Isometry3<f64>,
        warnings: &mut WarningSet,
    ) -> AerodynamicForces {
        let lift = CenterOfPressure::axial(
            self.planform_center,
            BODY_LIFT_K * self.planform_area / conditions.ref_area
                * conditions.sin_aoa
                * conditions.sinc_aoa,
        );

        let cp = if self.is_tube() {
            lift
        } else {
            let a0 = PI * pow2(self.fore_radius);
            let a1 = PI * pow2(self.aft_radius);
            let x = (self.length * a1 - self.full_volume) / (a1 - a0);
            let weight = 2.0 * (a1 - a0) * conditions.sinc_aoa / conditions.ref_area;
            CenterOfPressure::axial(x, weight).average(&lift)
        };

        if conditions.mach > 1.1 {
            warnings.add(Warning::Supersonic);
        }

        let cn = cp.weight * conditions.aoa;
        AerodynamicForces {
            cp,
            cna: cp.weight,
            cn,
            cm: cn * cp.x / conditions.ref_length,
            ..AerodynamicForces::zero()
        }
    }

    pub fn friction_cd(&self, conditions: &FlightConditions, component_cf: f64) -> f64 {
        component_cf * self.wetted_area / conditions.ref_area
    }

    /// Pressure drag of the body itself. The stagnation disc in front and
    /// the base behind are added by the aggregator.
    pub fn pressure_cd(
        &self,
        conditions: &FlightConditions,
        stagnation_cd: f64,
        base_cd: f64,
        warnings: &mut WarningSet,
    ) -> f64 {
        if self.is_tube() {
            return match &self.interior {
                Some(tube) => {
                    warnings.add(Warning::OpenAirframeForward { component: self.name.clone() });
                    interior_flow_cd(tube, conditions)
                }
                None => 0.0,
            };
        }

        let ref_area = conditions.ref_area;
        if self.length < 0.001 {
            return if self.fore_radius < self.aft_radius {
                stagnation_cd * self.frontal_area / ref_area
            } else {
                base_cd * self.frontal_area / ref_area
            };
        }

        // boattail
        if self.aft_radius < self.fore_radius {
            if self.fineness >= 3.0 {
                return 0.0;
            }
            let cd = base_cd * self.frontal_area / ref_area;
            if self.fineness <= 1.0 {
                return cd;
            }
            return cd * (3.0 - self.fineness) / 2.0;
        }

        match &self.nose_drag {
            Some(table) => table.value(conditions.mach) * self.frontal_area / ref_area,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::isa;
    use approx::assert_relative_eq;

    fn cone() -> Transition {
        Transition {
            fore_radius: 0.0,
            aft_radius: 0.02,
            length: 0.1,
            shape: TransitionShape::Conical,
            shape_parameter: 0.0,
        }
    }

    fn cond(mach: f64, aoa: f64) -> FlightConditions {
        FlightConditions::new(0.04, isa(0.0)).with_mach(mach).with_aoa(aoa)
    }

    #[test]
    fn conical_nose_barrowman() {
        let g = derive_transition("Nose", &cone());
        let mut warnings = WarningSet::new();
        let f = g.nonaxial_forces(&cond(0.3, 0.0), &Isometry3::identity(), &mut warnings);
        // CNa = 2 for a nose with the reference diameter; CP at 2/3 length
        assert_relative_eq!(f.cna, 2.0, epsilon = 1e-9);
        assert_relative_eq!(f.cp.x, 2.0 / 3.0 * 0.1, epsilon = 1e-6);
        assert_eq!(f.cn, 0.0);
    }

    #[test]
    fn cone_volume_and_planform() {
        let g = derive_transition("Nose", &cone());
        assert_relative_eq!(g.full_volume, PI * 0.02 * 0.02 * 0.1 / 3.0, max_relative = 1e-9);
        assert_relative_eq!(g.planform_area, 0.02 * 0.1, max_relative = 1e-9);
    }

    #[test]
    fn tube_lift_vanishes_at_zero_aoa() {
        let g = derive_body_tube("Body", 0.3, 0.02, 0.019, false, 60e-6);
        let mut warnings = WarningSet::new();
        let f = g.nonaxial_forces(&cond(0.3, 0.0), &Isometry3::identity(), &mut warnings);
        assert_eq!(f.cna, 0.0);
        let f = g.nonaxial_forces(&cond(0.3, 0.2), &Isometry3::identity(), &mut warnings);
        assert!(f.cna > 0.0);
        assert_relative_eq!(f.cp.x, 0.15, epsilon = 1e-9);
    }

    #[test]
    fn boattail_drag_fades_with_fineness() {
        let short = Transition {
            fore_radius: 0.02,
            aft_radius: 0.015,
            length: 0.01,
            shape: TransitionShape::Conical,
            shape_parameter: 0.0,
        };
        let long = Transition { length: 0.04, ..short.clone() };
        let c = cond(0.3, 0.0);
        let mut w = WarningSet::new();
        let cd_short = derive_transition("Short", &short).pressure_cd(&c, 0.9, 0.13, &mut w);
        let cd_long = derive_transition("Long", &long).pressure_cd(&c, 0.9, 0.13, &mut w);
        let shoulder = PI * (0.0004 - 0.000225);
        assert_relative_eq!(cd_short, 0.13 * shoulder / c.ref_area, epsilon = 1e-12);
        assert_eq!(cd_long, 0.0);
    }

    #[test]
    fn nose_drag_rises_through_transonic() {
        let g = derive_transition("Nose", &cone());
        let mut w = WarningSet::new();
        let subsonic = g.pressure_cd(&cond(0.5, 0.0), 0.9, 0.13, &mut w);
        let supersonic = g.pressure_cd(&cond(1.2, 0.0), 0.9, 0.13, &mut w);
        assert!(subsonic >= 0.0);
        assert!(supersonic > subsonic);
    }

    #[test]
    fn supersonic_transition_warns() {
        let g = derive_transition("Nose", &cone());
        let mut w = WarningSet::new();
        g.nonaxial_forces(&cond(1.5, 0.0), &Isometry3::identity(), &mut w);
        assert!(w.contains(&Warning::Supersonic));
    }
}
