use nalgebra::{Quaternion, Rotation3, Vector3};

use super::state::{Deriv, RigidState};
use crate::aero::{AerodynamicForces, FlightConditions};
use crate::vehicle::RigidBody;

// ---------------------------------------------------------------------------
// Launch guide constraint
// ---------------------------------------------------------------------------

/// How the launch rod constrains the rocket at the current phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    pub liftoff: bool,
    pub rod_cleared: bool,
    pub rod_direction: Vector3<f64>, // unit
}

impl Guide {
    pub fn free() -> Self {
        Self { liftoff: true, rod_cleared: true, rod_direction: Vector3::z() }
    }
}

/// Forces acting on the rocket at one evaluation.
#[derive(Debug, Clone)]
pub struct Loads<'a> {
    pub conditions: &'a FlightConditions,
    pub forces: &'a AerodynamicForces,
    pub mass: RigidBody,
    pub thrust: f64,  // N, along body z
    pub gravity: f64, // m/s^2
}

// ---------------------------------------------------------------------------
// 6DOF Equations of motion
// ---------------------------------------------------------------------------

/// Airspeed in the body frame for a given wind.
pub fn body_airspeed(state: &RigidState, wind: &Vector3<f64>) -> Vector3<f64> {
    state.quat.inverse() * (state.vel - wind)
}

/// State derivatives for the given loads.
///
/// Forces are resolved in the angle-of-attack plane, rotated back by the
/// roll-plane angle and then into the launch-site frame. Moments are taken
/// about the CG and give body-frame angular acceleration.
pub fn derivatives(state: &RigidState, loads: &Loads, guide: &Guide) -> Deriv {
    let cond = loads.conditions;
    let forces = loads.forces;
    let m = loads.mass.mass;
    let q_area = cond.dynamic_pressure() * cond.ref_area;

    let normal = forces.cn * q_area;
    let side = forces.cside * q_area;
    let axial = loads.thrust - q_area * forces.cd_axial;

    let roll_plane = Rotation3::from_axis_angle(&Vector3::z_axis(), cond.theta);
    let accel_body = roll_plane * Vector3::new(-normal / m, -side / m, axial / m);
    let mut accel = state.quat * accel_body - Vector3::new(0.0, 0.0, loads.gravity);

    let mut domega = Vector3::zeros();
    if !guide.rod_cleared {
        // sliding along the rod
        accel = guide.rod_direction * accel.dot(&guide.rod_direction);
    } else {
        // moments about the CG
        let cg = loads.mass.cg;
        let cm = forces.cm - forces.cn * cg / cond.ref_length;
        let cyaw = forces.cyaw - forces.cside * cg / cond.ref_length;
        let scale = q_area * cond.ref_length;
        let moment = Vector3::new(-cyaw * scale, cm * scale, forces.croll * scale);
        let inertia = &loads.mass;
        domega = roll_plane
            * Vector3::new(
                moment.x / inertia.long_inertia,
                moment.y / inertia.long_inertia,
                moment.z / inertia.rot_inertia,
            );
    }

    if !guide.liftoff && accel.z < 0.0 {
        // the pad holds the rocket up
        accel = Vector3::zeros();
    }

    // dq/dt = 0.5 * q * omega_quat
    let omega_quat = Quaternion::new(0.0, state.omega.x, state.omega.y, state.omega.z);
    let dquat = state.quat.quaternion() * omega_quat * 0.5;

    Deriv { dpos: state.vel, dvel: accel, dquat, domega }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::isa;
    use approx::assert_relative_eq;

    fn still() -> (AerodynamicForces, RigidBody) {
        (AerodynamicForces::zero(), RigidBody::new(1.0, 0.3, 0.01, 0.0001))
    }

    #[test]
    fn free_fall_is_gravity_only() {
        let cond = FlightConditions::new(0.05, isa(0.0));
        let (forces, mass) = still();
        let loads = Loads { conditions: &cond, forces: &forces, mass, thrust: 0.0, gravity: 9.8 };
        let d = derivatives(&RigidState::on_pad(&Vector3::z()), &loads, &Guide::free());
        assert_relative_eq!(d.dvel, Vector3::new(0.0, 0.0, -9.8), epsilon = 1e-12);
        assert_eq!(d.domega, Vector3::zeros());
    }

    #[test]
    fn pad_holds_rocket_until_thrust_exceeds_weight() {
        let cond = FlightConditions::new(0.05, isa(0.0));
        let (forces, mass) = still();
        let guide = Guide { liftoff: false, rod_cleared: false, rod_direction: Vector3::z() };
        let state = RigidState::on_pad(&Vector3::z());
        let weak = Loads { conditions: &cond, forces: &forces, mass, thrust: 5.0, gravity: 9.8 };
        assert_eq!(derivatives(&state, &weak, &guide).dvel, Vector3::zeros());
        let strong = Loads { thrust: 20.0, ..weak };
        assert_relative_eq!(derivatives(&state, &strong, &guide).dvel.z, 10.2, epsilon = 1e-12);
    }

    #[test]
    fn rod_projects_acceleration() {
        let cond = FlightConditions::new(0.05, isa(0.0));
        let (forces, mass) = still();
        let rod = Vector3::new(0.2_f64.sin(), 0.0, 0.2_f64.cos());
        let guide = Guide { liftoff: true, rod_cleared: false, rod_direction: rod };
        let state = RigidState::on_pad(&rod);
        let loads = Loads { conditions: &cond, forces: &forces, mass, thrust: 30.0, gravity: 9.8 };
        let d = derivatives(&state, &loads, &guide);
        assert_relative_eq!(d.dvel.normalize(), rod, epsilon = 1e-9);
        assert_relative_eq!(d.dvel.norm(), 30.0 - 9.8 * 0.2_f64.cos(), epsilon = 1e-9);
    }

    #[test]
    fn normal_force_behind_cg_turns_nose_into_wind() {
        let cond = FlightConditions::new(0.05, isa(0.0)).with_velocity(50.0).with_aoa(0.05);
        let forces = AerodynamicForces {
            cn: 0.5,
            cm: 0.5 * 0.4 / 0.05,
            ..AerodynamicForces::zero()
        };
        let mass = RigidBody::new(1.0, 0.3, 0.01, 0.0001);
        let loads = Loads { conditions: &cond, forces: &forces, mass, thrust: 0.0, gravity: 0.0 };
        let d = derivatives(&RigidState::on_pad(&Vector3::z()), &loads, &Guide::free());
        // airspeed lies in +x, so the nose swings toward +x
        assert!(d.domega.y > 0.0);
        assert!(d.dvel.x < 0.0);
    }
}
