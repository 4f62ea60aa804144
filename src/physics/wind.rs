use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::math::LinearInterpolator;

// ---------------------------------------------------------------------------
// Wind models (air velocity in the launch-site frame)
// ---------------------------------------------------------------------------

/// Horizontal wind. Direction is the compass heading the wind blows
/// *from*, in radians (0 = north = +y, pi/2 = east = +x).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum WindModel {
    #[default]
    Calm,
    Constant {
        speed: f64,     // m/s
        direction: f64, // rad
    },
    /// Speed and direction given at altitude levels, interpolated linearly
    /// and held constant outside the given range.
    MultiLevel { levels: Vec<WindLevel> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindLevel {
    pub altitude: f64,  // m
    pub speed: f64,     // m/s
    pub direction: f64, // rad
}

impl WindModel {
    /// Air velocity at `altitude` above the launch site.
    pub fn velocity(&self, altitude: f64) -> Vector3<f64> {
        match self {
            WindModel::Calm => Vector3::zeros(),
            WindModel::Constant { speed, direction } => blowing_from(*speed, *direction),
            WindModel::MultiLevel { levels } => {
                if levels.is_empty() {
                    return Vector3::zeros();
                }
                // interpolate the vector components so direction wraps cleanly
                let east = LinearInterpolator::new(
                    levels
                        .iter()
                        .map(|l| (l.altitude, blowing_from(l.speed, l.direction).x))
                        .collect(),
                );
                let north = LinearInterpolator::new(
                    levels
                        .iter()
                        .map(|l| (l.altitude, blowing_from(l.speed, l.direction).y))
                        .collect(),
                );
                Vector3::new(east.value(altitude), north.value(altitude), 0.0)
            }
        }
    }
}

fn blowing_from(speed: f64, direction: f64) -> Vector3<f64> {
    Vector3::new(-speed * direction.sin(), -speed * direction.cos(), 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calm_has_no_wind() {
        assert_eq!(WindModel::Calm.velocity(100.0), Vector3::zeros());
    }

    #[test]
    fn north_wind_blows_south() {
        let w = WindModel::Constant { speed: 5.0, direction: 0.0 }.velocity(0.0);
        assert!((w.y + 5.0).abs() < 1e-12);
        assert!(w.x.abs() < 1e-12);
    }

    #[test]
    fn multi_level_interpolates_between_levels() {
        let model = WindModel::MultiLevel {
            levels: vec![
                WindLevel { altitude: 0.0, speed: 2.0, direction: std::f64::consts::FRAC_PI_2 },
                WindLevel { altitude: 100.0, speed: 6.0, direction: std::f64::consts::FRAC_PI_2 },
            ],
        };
        let w = model.velocity(50.0);
        assert!((w.x + 4.0).abs() < 1e-9);
        assert!((model.velocity(500.0).x + 6.0).abs() < 1e-9);
    }
}
