use nalgebra::{Rotation3, Vector3};

use crate::math::{pow2, safe_acos, sinc};
use crate::physics::AtmosphericConditions;

/// Lower bound of the Prandtl-Glauert factor near Mach 1.
pub const MIN_BETA: f64 = 0.25;

// ---------------------------------------------------------------------------
// Flight conditions snapshot
// ---------------------------------------------------------------------------

/// Flow conditions seen by the rocket during one force evaluation.
///
/// Built fresh from the state vector each time and never mutated in place;
/// the `with_*` methods return modified copies.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightConditions {
    pub ref_length: f64, // m, maximum body diameter
    pub ref_area: f64,   // m^2
    pub velocity: f64,   // m/s, airspeed
    pub mach: f64,
    pub beta: f64,
    pub aoa: f64, // rad
    pub sin_aoa: f64,
    pub sinc_aoa: f64,
    /// Roll angle of the plane containing the airspeed and the rocket axis.
    pub theta: f64, // rad
    pub roll_rate: f64,  // rad/s
    pub pitch_rate: f64, // rad/s
    pub yaw_rate: f64,   // rad/s
    pub atmosphere: AtmosphericConditions,
}

impl FlightConditions {
    /// Still air, zero attitude.
    pub fn new(ref_length: f64, atmosphere: AtmosphericConditions) -> Self {
        Self {
            ref_length,
            ref_area: std::f64::consts::PI * pow2(ref_length / 2.0),
            velocity: 0.0,
            mach: 0.0,
            beta: 1.0,
            aoa: 0.0,
            sin_aoa: 0.0,
            sinc_aoa: 1.0,
            theta: 0.0,
            roll_rate: 0.0,
            pitch_rate: 0.0,
            yaw_rate: 0.0,
            atmosphere,
        }
    }

    /// Conditions for a body-frame airspeed and angular rate. The rocket
    /// axis is body z; rates are rotated into the angle-of-attack plane.
    pub fn from_motion(
        ref_length: f64,
        atmosphere: AtmosphericConditions,
        airspeed: &Vector3<f64>,
        omega: &Vector3<f64>,
    ) -> Self {
        let speed = airspeed.norm();
        let lateral = airspeed.x.hypot(airspeed.y);
        let theta = if lateral > 0.0001 { airspeed.y.atan2(airspeed.x) } else { 0.0 };
        let aoa = if speed > 0.01 { safe_acos(airspeed.z / speed) } else { 0.0 };

        let rates = Rotation3::from_axis_angle(&Vector3::z_axis(), -theta) * omega;

        Self::new(ref_length, atmosphere)
            .with_velocity(speed)
            .with_aoa(aoa)
            .with_theta(theta)
            .with_rates(rates.z, rates.y, rates.x)
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self.mach = velocity / self.atmosphere.sound_speed;
        self.beta = prandtl_glauert(self.mach);
        self
    }

    pub fn with_mach(mut self, mach: f64) -> Self {
        self.mach = mach;
        self.velocity = mach * self.atmosphere.sound_speed;
        self.beta = prandtl_glauert(mach);
        self
    }

    pub fn with_aoa(mut self, aoa: f64) -> Self {
        self.aoa = aoa;
        self.sin_aoa = aoa.sin();
        self.sinc_aoa = sinc(aoa);
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self { self.theta = theta; self }

    pub fn with_rates(mut self, roll: f64, pitch: f64, yaw: f64) -> Self {
        self.roll_rate = roll;
        self.pitch_rate = pitch;
        self.yaw_rate = yaw;
        self
    }

    /// Combined pitch and yaw rate magnitude.
    pub fn lateral_pitch_rate(&self) -> f64 {
        self.pitch_rate.hypot(self.yaw_rate)
    }

    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.atmosphere.density * pow2(self.velocity)
    }

    pub fn kinematic_viscosity(&self) -> f64 {
        self.atmosphere.kinematic_viscosity()
    }
}

fn prandtl_glauert(mach: f64) -> f64 {
    (1.0 - pow2(mach)).abs().sqrt().max(MIN_BETA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::isa;
    use approx::assert_relative_eq;

    #[test]
    fn beta_is_clamped_near_mach_one() {
        let c = FlightConditions::new(0.05, isa(0.0)).with_mach(1.0);
        assert_relative_eq!(c.beta, MIN_BETA);
        let c = c.with_mach(0.6);
        assert_relative_eq!(c.beta, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn axial_flow_has_zero_aoa() {
        let airspeed = Vector3::new(0.0, 0.0, 50.0);
        let c = FlightConditions::from_motion(0.05, isa(0.0), &airspeed, &Vector3::zeros());
        assert_eq!(c.aoa, 0.0);
        assert_eq!(c.theta, 0.0);
        assert_relative_eq!(c.velocity, 50.0);
        assert_relative_eq!(c.ref_area, std::f64::consts::PI * 0.025 * 0.025);
    }

    #[test]
    fn side_flow_sets_aoa_and_theta() {
        let c = FlightConditions::from_motion(
            0.05,
            isa(0.0),
            &Vector3::new(0.0, 10.0, 10.0),
            &Vector3::new(0.0, 0.0, 2.0),
        );
        assert_relative_eq!(c.aoa, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(c.theta, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(c.roll_rate, 2.0, epsilon = 1e-12);
        assert_relative_eq!(c.sin_aoa, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn rates_rotate_into_the_aoa_plane() {
        // airspeed along +y, so theta = 90 deg and body-x rate becomes pitch
        let c = FlightConditions::from_motion(
            0.05,
            isa(0.0),
            &Vector3::new(0.0, 5.0, 20.0),
            &Vector3::new(1.0, 0.0, 0.0),
        );
        assert_relative_eq!(c.pitch_rate.abs(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.yaw_rate, 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.lateral_pitch_rate(), 1.0, epsilon = 1e-12);
    }
}
