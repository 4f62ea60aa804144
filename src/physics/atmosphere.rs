use serde::{Deserialize, Serialize};

use super::G0;

// ---------------------------------------------------------------------------
// ISA 1976 Standard Atmosphere (sea level to 86 km)
// ---------------------------------------------------------------------------

const R_AIR: f64 = 287.052_87; // specific gas constant for dry air, J/(kg·K)
const GAMMA: f64 = 1.4;        // ratio of specific heats

pub const ISA_TEMPERATURE: f64 = 288.15; // sea-level temperature, K
pub const ISA_PRESSURE: f64 = 101_325.0; // sea-level pressure, Pa

/// Layer base altitudes (m) and temperature lapse rates (K/m).
const LAYERS: [(f64, f64); 7] = [
    (0.0, -0.0065),     // troposphere
    (11_000.0, 0.0),    // tropopause
    (20_000.0, 0.001),  // stratosphere I
    (32_000.0, 0.0028), // stratosphere II
    (47_000.0, 0.0),    // stratopause
    (51_000.0, -0.0028), // mesosphere I
    (71_000.0, -0.002), // mesosphere II
];
const TOP_OF_MODEL: f64 = 86_000.0;

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericConditions {
    pub density: f64,      // kg/m^3
    pub pressure: f64,     // Pa
    pub temperature: f64,  // K
    pub sound_speed: f64,  // m/s
}

impl AtmosphericConditions {
    fn from_temperature_pressure(temperature: f64, pressure: f64) -> Self {
        let density = if temperature > 0.0 {
            pressure / (R_AIR * temperature)
        } else {
            0.0
        };
        Self {
            density,
            pressure,
            temperature,
            sound_speed: (GAMMA * R_AIR * temperature).sqrt(),
        }
    }

    /// Kinematic viscosity (m^2/s) from a linear fit of dynamic viscosity
    /// against temperature.
    pub fn kinematic_viscosity(&self) -> f64 {
        let dynamic = 3.7291e-6 + 4.9944e-8 * self.temperature;
        if self.density > 0.0 {
            dynamic / self.density
        } else {
            f64::INFINITY
        }
    }
}

/// Atmosphere model selected in the simulation options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AtmosphereModel {
    /// Standard ISA 1976 sea-level conditions.
    #[default]
    Isa,
    /// ISA lapse rates applied to user-supplied sea-level conditions.
    ExtendedIsa {
        base_temperature: f64, // K
        base_pressure: f64,    // Pa
    },
}

impl AtmosphereModel {
    pub fn conditions(&self, altitude_m: f64) -> AtmosphericConditions {
        match *self {
            AtmosphereModel::Isa => layered(altitude_m, ISA_TEMPERATURE, ISA_PRESSURE),
            AtmosphereModel::ExtendedIsa { base_temperature, base_pressure } => {
                layered(altitude_m, base_temperature, base_pressure)
            }
        }
    }
}

/// ISA 1976 standard atmosphere model.
///
/// Clamps negative altitudes to sea level; returns near-vacuum above 86 km.
pub fn isa(altitude_m: f64) -> AtmosphericConditions {
    layered(altitude_m, ISA_TEMPERATURE, ISA_PRESSURE)
}

/// Piecewise temperature profile starting from the given sea-level state.
fn layered(altitude_m: f64, t0: f64, p0: f64) -> AtmosphericConditions {
    let h = altitude_m.max(0.0);

    let mut t_base = t0;
    let mut p_base = p0;
    for (i, &(h_base, lapse)) in LAYERS.iter().enumerate() {
        let h_top = LAYERS.get(i + 1).map_or(TOP_OF_MODEL, |l| l.0);
        let h_eval = h.min(h_top);
        let (t, p) = if lapse == 0.0 {
            isothermal_layer(h_eval, h_base, t_base, p_base)
        } else {
            gradient_layer(h_eval, h_base, t_base, lapse, p_base)
        };
        if h <= h_top {
            return AtmosphericConditions::from_temperature_pressure(t, p);
        }
        t_base = t;
        p_base = p;
    }

    // Above 86 km: exponential decay approximation
    let p = p_base * (-0.000_15 * (h - TOP_OF_MODEL)).exp();
    AtmosphericConditions::from_temperature_pressure(t_base, p.max(0.0))
}

// ---------------------------------------------------------------------------
// Layer helpers
// ---------------------------------------------------------------------------

/// Gradient layer: T = T_base + lapse * (h - h_base)
fn gradient_layer(h: f64, h_base: f64, t_base: f64, lapse: f64, p_base: f64) -> (f64, f64) {
    let t = t_base + lapse * (h - h_base);
    let p = p_base * (t / t_base).powf(-G0 / (lapse * R_AIR));
    (t, p)
}

/// Isothermal layer: T = const, pressure decays exponentially
fn isothermal_layer(h: f64, h_base: f64, t: f64, p_base: f64) -> (f64, f64) {
    let p = p_base * ((-G0 / (R_AIR * t)) * (h - h_base)).exp();
    (t, p)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
