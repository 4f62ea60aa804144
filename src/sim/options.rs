use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::physics::{AtmosphereModel, WindModel};

// ---------------------------------------------------------------------------
// Simulation options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Base RK4 step; divided by five on the launch rod.
    pub time_step: f64, // s
    pub min_time_step: f64, // s
    /// Largest attitude change allowed in one step.
    pub max_angle_step: f64, // rad
    /// Flights still airborne at this time end with a warning.
    pub max_time: f64, // s
    pub launch_rod_length: f64, // m
    /// Rod tilt from vertical.
    pub launch_rod_angle: f64, // rad
    /// Compass heading the rod leans toward, clockwise from north.
    pub launch_rod_direction: f64, // rad
    pub launch_altitude: f64, // m above sea level
    pub atmosphere: AtmosphereModel,
    pub wind: WindModel,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            time_step: 0.05,
            min_time_step: 0.001,
            max_angle_step: 3f64.to_radians(),
            max_time: 1200.0,
            launch_rod_length: 1.0,
            launch_rod_angle: 0.0,
            launch_rod_direction: 0.0,
            launch_altitude: 0.0,
            atmosphere: AtmosphereModel::Isa,
            wind: WindModel::Calm,
        }
    }
}

impl SimulationOptions {
    pub fn time_step(mut self, v: f64) -> Self { self.time_step = v; self }
    pub fn max_time(mut self, v: f64) -> Self { self.max_time = v; self }
    pub fn launch_rod(mut self, length: f64, angle: f64, direction: f64) -> Self {
        self.launch_rod_length = length;
        self.launch_rod_angle = angle;
        self.launch_rod_direction = direction;
        self
    }
    pub fn wind(mut self, wind: WindModel) -> Self { self.wind = wind; self }
    pub fn atmosphere(mut self, model: AtmosphereModel) -> Self { self.atmosphere = model; self }

    /// Reject options the stepper cannot work with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("time_step", self.time_step),
            ("min_time_step", self.min_time_step),
            ("max_angle_step", self.max_angle_step),
            ("max_time", self.max_time),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(SimError::InvalidOptions(format!("{name} must be positive, got {v}")));
            }
        }
        if self.min_time_step > self.time_step {
            return Err(SimError::InvalidOptions(format!(
                "min_time_step {} exceeds time_step {}",
                self.min_time_step, self.time_step
            )));
        }
        if !(self.launch_rod_length.is_finite() && self.launch_rod_length >= 0.0) {
            return Err(SimError::InvalidOptions(format!(
                "launch_rod_length must be non-negative, got {}",
                self.launch_rod_length
            )));
        }
        if !(0.0..std::f64::consts::FRAC_PI_2).contains(&self.launch_rod_angle) {
            return Err(SimError::InvalidOptions(format!(
                "launch_rod_angle must lie in [0, 90) degrees, got {:.1}",
                self.launch_rod_angle.to_degrees()
            )));
        }
        Ok(())
    }

    /// Unit vector along the launch rod in the launch-site frame.
    pub fn rod_direction(&self) -> Vector3<f64> {
        let (a, d) = (self.launch_rod_angle, self.launch_rod_direction);
        Vector3::new(a.sin() * d.sin(), a.sin() * d.cos(), a.cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        SimulationOptions::default().validate().unwrap();
    }

    #[test]
    fn bad_steps_are_rejected() {
        let opts = SimulationOptions::default().time_step(0.0);
        assert!(matches!(opts.validate(), Err(SimError::InvalidOptions(_))));
        let opts = SimulationOptions { min_time_step: 0.1, ..SimulationOptions::default() };
        assert!(opts.validate().is_err());
        let opts = SimulationOptions::default().launch_rod(1.0, 1.6, 0.0);
        assert!(opts.validate().is_err());
    }

    #[test]
    fn rod_leans_toward_heading() {
        let opts = SimulationOptions::default().launch_rod(1.0, 0.1, std::f64::consts::FRAC_PI_2);
        let rod = opts.rod_direction();
        assert_relative_eq!(rod.norm(), 1.0, epsilon = 1e-12);
        assert!(rod.x > 0.0);
        assert_relative_eq!(rod.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let opts: SimulationOptions = serde_json::from_str(r#"{ "max_time": 60.0 }"#).unwrap();
        assert_eq!(opts.max_time, 60.0);
        assert_eq!(opts.time_step, 0.05);
    }
}
