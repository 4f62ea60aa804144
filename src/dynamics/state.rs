use nalgebra::{Quaternion, UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Rigid-body state: position, velocity, attitude, angular rate
// ---------------------------------------------------------------------------

/// Kinematic state of the rocket. Mass is not integrated; it follows from the
/// motor curves at the state's time.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidState {
    pub time: f64,
    pub pos: Vector3<f64>,         // m, launch-site frame (x east, y north, z up)
    pub vel: Vector3<f64>,         // m/s
    pub quat: UnitQuaternion<f64>, // body→launch-site rotation
    pub omega: Vector3<f64>,       // rad/s, body frame
}

impl RigidState {
    /// At rest on the pad, body z pointing along `rod_direction`.
    pub fn on_pad(rod_direction: &Vector3<f64>) -> Self {
        let quat = UnitQuaternion::rotation_between(&Vector3::z(), rod_direction)
            .unwrap_or_else(UnitQuaternion::identity);
        Self {
            time: 0.0,
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            quat,
            omega: Vector3::zeros(),
        }
    }

    pub fn apply(&self, d: &Deriv, dt: f64) -> RigidState {
        // q_new = normalize(q + dq * dt)
        let q_raw = self.quat.quaternion() + d.dquat * dt;
        RigidState {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            quat: UnitQuaternion::new_normalize(q_raw),
            omega: self.omega + d.domega * dt,
        }
    }

    /// Classic RK4 combination of four slopes.
    pub fn combine(&self, k: [&Deriv; 4], dt: f64) -> RigidState {
        let [k1, k2, k3, k4] = k;
        let h = dt / 6.0;
        let dquat = k1.dquat + k2.dquat * 2.0 + k3.dquat * 2.0 + k4.dquat;
        let q_raw = self.quat.quaternion() + dquat * h;
        RigidState {
            time: self.time + dt,
            pos: self.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * h,
            vel: self.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * h,
            quat: UnitQuaternion::new_normalize(q_raw),
            omega: self.omega + (k1.domega + 2.0 * k2.domega + 2.0 * k3.domega + k4.domega) * h,
        }
    }

    /// Rocket axis (nose direction) in the launch-site frame.
    pub fn body_z(&self) -> Vector3<f64> {
        self.quat * Vector3::z()
    }

    /// Angle between the rocket axis and vertical (rad).
    pub fn zenith(&self) -> f64 {
        self.body_z().z.clamp(-1.0, 1.0).acos()
    }

    /// Compass direction of the rocket axis, clockwise from north (rad).
    pub fn azimuth(&self) -> f64 {
        let z = self.body_z();
        z.x.atan2(z.y)
    }

    /// First non-finite quantity, if any.
    pub fn non_finite(&self) -> Option<&'static str> {
        if !self.pos.iter().all(|v| v.is_finite()) {
            Some("position")
        } else if !self.vel.iter().all(|v| v.is_finite()) {
            Some("velocity")
        } else if !self.quat.coords.iter().all(|v| v.is_finite()) {
            Some("orientation")
        } else if !self.omega.iter().all(|v| v.is_finite()) {
            Some("angular rate")
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dquat: Quaternion<f64>, // raw quaternion derivative, not unit
    pub domega: Vector3<f64>,   // angular acceleration, body frame
}

impl Deriv {
    pub fn zero() -> Self {
        Self {
            dpos: Vector3::zeros(),
            dvel: Vector3::zeros(),
            dquat: Quaternion::new(0.0, 0.0, 0.0, 0.0),
            domega: Vector3::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pad_attitude_follows_rod() {
        let rod = Vector3::new(0.1_f64.sin(), 0.0, 0.1_f64.cos());
        let s = RigidState::on_pad(&rod);
        assert_relative_eq!(s.body_z(), rod, epsilon = 1e-12);
        assert_relative_eq!(s.zenith(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(s.azimuth(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn rk4_with_constant_slope_is_linear() {
        let s = RigidState::on_pad(&Vector3::z());
        let d = Deriv { dvel: Vector3::new(0.0, 0.0, -9.8), ..Deriv::zero() };
        let n = s.combine([&d, &d, &d, &d], 2.0);
        assert_relative_eq!(n.vel.z, -19.6, epsilon = 1e-12);
        assert_relative_eq!(n.time, 2.0);
        assert!(n.non_finite().is_none());
    }

    #[test]
    fn non_finite_state_is_named() {
        let mut s = RigidState::on_pad(&Vector3::z());
        s.vel.x = f64::NAN;
        assert_eq!(s.non_finite(), Some("velocity"));
    }
}
