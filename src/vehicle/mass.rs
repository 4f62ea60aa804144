use super::component::ComponentKind;
use super::layout::{PlacedComponent, RocketLayout};
use super::motor::Motor;
use super::rocket::FlightConfiguration;

// ---------------------------------------------------------------------------
// Rigid-body mass properties along the rocket axis
// ---------------------------------------------------------------------------

/// Mass, axial CG position and inertias about the CG.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigidBody {
    pub mass: f64,         // kg
    pub cg: f64,           // m aft of the nose tip
    pub long_inertia: f64, // kg·m^2, about a transverse axis through the CG
    pub rot_inertia: f64,  // kg·m^2, about the rocket axis
}

impl RigidBody {
    pub fn new(mass: f64, cg: f64, long_inertia: f64, rot_inertia: f64) -> Self {
        Self { mass, cg, long_inertia, rot_inertia }
    }

    /// Combine two bodies, shifting inertias with the parallel-axis theorem.
    pub fn add(&self, other: &RigidBody) -> RigidBody {
        let mass = self.mass + other.mass;
        if mass <= 0.0 {
            return RigidBody::default();
        }
        let cg = (self.mass * self.cg + other.mass * other.cg) / mass;
        let shift = |b: &RigidBody| b.long_inertia + b.mass * (b.cg - cg).powi(2);
        RigidBody {
            mass,
            cg,
            long_inertia: shift(self) + shift(other),
            rot_inertia: self.rot_inertia + other.rot_inertia,
        }
    }
}

/// Mass properties of one placed component.
pub fn component_body(c: &PlacedComponent) -> RigidBody {
    let m = c.mass;
    if m <= 0.0 {
        return RigidBody::default();
    }
    let len = c.length;
    match &c.kind {
        ComponentKind::BodyTube(t) => {
            let r2 = t.outer_radius.powi(2) + t.inner_radius.powi(2);
            RigidBody::new(m, c.x + len / 2.0, m * (r2 / 4.0 + len * len / 12.0), m * r2 / 2.0)
        }
        ComponentKind::Transition(t) => {
            // thin conical shell
            let (r1, r2) = (t.fore_radius, t.aft_radius);
            let centroid = if r1 + r2 > 0.0 {
                len * (r1 + 2.0 * r2) / (3.0 * (r1 + r2))
            } else {
                len / 2.0
            };
            let r = 0.5 * (r1 + r2);
            RigidBody::new(m, c.x + centroid, m * (r * r / 2.0 + len * len / 12.0), m * r * r)
        }
        ComponentKind::FinSet(f) => {
            let arm = c.body_radius + f.span() / 2.0;
            let cg = c.x + planform_centroid(&f.outline).unwrap_or(len / 2.0);
            RigidBody::new(m, cg, m * (len * len / 12.0 + arm * arm / 2.0), m * arm * arm)
        }
        ComponentKind::TubeFinSet(t) => {
            let arm = c.body_radius + t.outer_radius;
            let own = (t.outer_radius.powi(2) + t.inner_radius.powi(2)) / 2.0;
            RigidBody::new(
                m,
                c.x + len / 2.0,
                m * (own / 2.0 + len * len / 12.0 + arm * arm / 2.0),
                m * (own + arm * arm),
            )
        }
        ComponentKind::LaunchLug(l) => {
            let arm = c.body_radius + l.outer_radius;
            let pitch = m * (len * len / 12.0 + arm * arm / 2.0);
            RigidBody::new(m, c.x + len / 2.0, pitch, m * arm * arm)
        }
        ComponentKind::Parachute(_)
        | ComponentKind::MassObject { .. }
        | ComponentKind::Assembly => {
            RigidBody::new(m, c.x + len / 2.0, m * len * len / 12.0, 0.0)
        }
    }
}

/// Structural mass of every component in an active stage.
pub fn structure_mass(layout: &RocketLayout, config: &FlightConfiguration) -> RigidBody {
    layout
        .active(config)
        .map(component_body)
        .fold(RigidBody::default(), |acc, b| acc.add(&b))
}

/// A motor of given mass, modelled as a solid cylinder ending at `x_aft`.
pub fn motor_body(motor: &Motor, mass: f64, x_aft: f64) -> RigidBody {
    let r = motor.diameter / 2.0;
    let len = motor.length;
    RigidBody::new(
        mass,
        x_aft - len / 2.0,
        mass * (3.0 * r * r + len * len) / 12.0,
        mass * r * r / 2.0,
    )
}

/// Axial centroid of a fin outline closed along the root chord.
fn planform_centroid(outline: &[(f64, f64)]) -> Option<f64> {
    let n = outline.len();
    if n < 3 {
        return None;
    }
    let (mut area, mut cx) = (0.0, 0.0);
    for i in 0..n {
        let (x0, y0) = outline[i];
        let (x1, y1) = outline[(i + 1) % n];
        let cross = x0 * y1 - x1 * y0;
        area += cross;
        cx += (x0 + x1) * cross;
    }
    if area.abs() < 1e-12 {
        return None;
    }
    Some(cx / (3.0 * area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn combined_cg_is_mass_weighted() {
        let a = RigidBody::new(1.0, 0.0, 0.0, 0.0);
        let b = RigidBody::new(3.0, 1.0, 0.0, 0.0);
        let c = a.add(&b);
        assert_relative_eq!(c.cg, 0.75);
        // parallel axis: 1*0.75^2 + 3*0.25^2
        assert_relative_eq!(c.long_inertia, 0.75);
    }

    #[test]
    fn adding_empty_body_is_identity() {
        let a = RigidBody::new(2.0, 0.4, 0.1, 0.01);
        assert_eq!(a.add(&RigidBody::default()), a);
    }

    #[test]
    fn rectangle_centroid_is_mid_chord() {
        let rect = [(0.0, 0.0), (0.0, 1.0), (2.0, 1.0), (2.0, 0.0)];
        assert_relative_eq!(planform_centroid(&rect).unwrap(), 1.0, epsilon = 1e-12);
    }
}
