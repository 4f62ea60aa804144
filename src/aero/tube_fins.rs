use std::f64::consts::PI;

use nalgebra::Isometry3;

use super::conditions::FlightConditions;
use super::fins::{cp_polynomial, cp_position, STALL_ANGLE};
use super::forces::{AerodynamicForces, CenterOfPressure};
use super::tube::{interior_pressure_cd, TubeFlow};
use crate::math::{pow2, EPSILON};
use crate::vehicle::component::TubeFinSet;
use crate::warning::{Warning, WarningSet};

// ---------------------------------------------------------------------------
// Tube-fin geometry
// ---------------------------------------------------------------------------

/// Derived properties of one tube of a tube-fin set.
#[derive(Debug, Clone)]
pub struct TubeFinGeometry {
    pub name: String,
    pub fin_count: usize,
    pub body_radius: f64, // m
    pub chord: f64,       // m, tube length
    pub tube: TubeFlow,
    pub aspect_ratio: f64,
    /// Gap between the body and the tube on each side.
    pub interstice_area: f64, // m^2
    pub wetted_area: f64,     // m^2
    /// Ring-airfoil CNa before division by the reference area.
    pub cna_const: f64,
    pub cp_poly: [f64; 6],
    pub warnings: Vec<Warning>,
}

pub fn derive_geometry(
    name: &str,
    tubes: &TubeFinSet,
    body_radius: f64,
    roughness: f64,
) -> TubeFinGeometry {
    let ro = tubes.outer_radius;
    let ri = tubes.inner_radius;
    let chord = tubes.length;
    let mut warnings = vec![];

    if tubes.fin_count >= 3 {
        let s = (PI / tubes.fin_count as f64).sin();
        let touching = body_radius * s / (1.0 - s);
        let separation = 2.0 * (touching - ro);
        if separation > EPSILON {
            warnings.push(Warning::TubeFinSeparation { component: name.to_string() });
        } else if separation < -EPSILON {
            warnings.push(Warning::TubeFinOverlap { component: name.to_string() });
        }
    }

    let aspect_ratio = if chord > 0.0 { 2.0 * ri / chord } else { 0.0 };

    // triangle between the two centres and the tangent point, less the two
    // circular sectors it overlaps
    let d = (pow2(body_radius + ro) - pow2(ro)).max(0.0).sqrt();
    let theta1 = if ro + body_radius > 0.0 { (ro / (ro + body_radius)).acos() } else { 0.0 };
    let theta2 = PI / 2.0 - theta1;
    let interstice_area = d * ro - pow2(ro) * theta1 - pow2(body_radius) * theta2;

    let outer_area = chord * 2.0 * (PI - theta1) * ro;
    let masked_area = chord * 2.0 * theta2 * body_radius;

    let ar_prime = 2.0 * aspect_ratio / PI;
    let cna_const = 2.0 * (ar_prime / (1.0 + ar_prime)) * PI * PI * ri * chord;

    TubeFinGeometry {
        name: name.to_string(),
        fin_count: tubes.fin_count,
        body_radius,
        chord,
        tube: TubeFlow { length: chord, inner_radius: ri, outer_radius: ro, roughness },
        aspect_ratio,
        interstice_area,
        wetted_area: outer_area - masked_area,
        cna_const,
        cp_poly: cp_polynomial(aspect_ratio),
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Tube-fin forces
// ---------------------------------------------------------------------------

impl TubeFinGeometry {
    pub fn nonaxial_forces(
        &self,
        conditions: &FlightConditions,
        _transform: &Isometry3<f64>,
        _warnings: &mut WarningSet,
    ) -> AerodynamicForces {
        if self.tube.outer_radius < 0.001 {
            return AerodynamicForces::zero();
        }
        let cna = self.cna_const / conditions.ref_area;
        let x = cp_position(self.aspect_ratio, &self.cp_poly, conditions) * self.chord;
        let arm = self.body_radius + self.tube.outer_radius;

        // tube fins cannot be canted
        let croll_force = 0.0;
        let croll_damp = if conditions.velocity > EPSILON {
            arm * conditions.roll_rate / conditions.velocity * cna / conditions.ref_length
        } else {
            0.0
        };

        let cn = cna * conditions.aoa.min(STALL_ANGLE);
        AerodynamicForces {
            cp: CenterOfPressure::axial(x, cna),
            cna,
            cn,
            cm: cn * x / conditions.ref_length,
            croll_force,
            croll_damp,
            croll: croll_force - croll_damp,
            ..AerodynamicForces::zero()
        }
    }

    pub fn friction_cd(&self, conditions: &FlightConditions, component_cf: f64) -> f64 {
        component_cf * self.wetted_area / conditions.ref_area
    }

    pub fn pressure_cd(
        &self,
        conditions: &FlightConditions,
        stagnation_cd: f64,
        base_cd: f64,
        warnings: &mut WarningSet,
    ) -> f64 {
        for w in &self.warnings {
            warnings.add(w.clone());
        }
        interior_pressure_cd(&self.tube, conditions, stagnation_cd, base_cd)
            + (stagnation_cd + base_cd) * self.interstice_area / conditions.ref_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::isa;
    use approx::assert_relative_eq;

    fn touching(n: usize, body: f64) -> f64 {
        let s = (PI / n as f64).sin();
        body * s / (1.0 - s)
    }

    #[test]
    fn touching_tubes_do_not_warn() {
        let ro = touching(6, 0.02);
        let set = TubeFinSet {
            fin_count: 6,
            outer_radius: ro,
            inner_radius: ro - 0.0005,
            length: 0.08,
            base_rotation: 0.0,
        };
        let g = derive_geometry("Tubes", &set, 0.02, 60e-6);
        assert!(g.warnings.is_empty());
        assert!(g.interstice_area > 0.0);
        assert!(g.wetted_area > 0.0);
    }

    #[test]
    fn small_tubes_leave_gaps() {
        let set = TubeFinSet {
            fin_count: 6,
            outer_radius: 0.01,
            inner_radius: 0.0095,
            length: 0.08,
            base_rotation: 0.0,
        };
        let g = derive_geometry("Tubes", &set, 0.02, 60e-6);
        assert_eq!(g.warnings, vec![Warning::TubeFinSeparation { component: "Tubes".into() }]);
        let big = TubeFinSet { outer_radius: 0.03, inner_radius: 0.0295, ..set };
        let g = derive_geometry("Tubes", &big, 0.02, 60e-6);
        assert_eq!(g.warnings, vec![Warning::TubeFinOverlap { component: "Tubes".into() }]);
    }

    #[test]
    fn ring_airfoil_lift() {
        let set = TubeFinSet {
            fin_count: 4,
            outer_radius: 0.01,
            inner_radius: 0.0095,
            length: 0.05,
            base_rotation: 0.0,
        };
        let g = derive_geometry("Tubes", &set, 0.02, 60e-6);
        let cond = FlightConditions::new(0.04, isa(0.0)).with_velocity(30.0).with_aoa(0.1);
        let mut warnings = WarningSet::new();
        let f = g.nonaxial_forces(&cond, &Isometry3::identity(), &mut warnings);
        assert_relative_eq!(f.cna, g.cna_const / cond.ref_area);
        assert_relative_eq!(f.cp.x, 0.25 * 0.05);
        assert_eq!(f.croll, 0.0);
    }
}
