use std::f64::consts::PI;

use super::conditions::FlightConditions;
use crate::math::{pow2, EPSILON};

// ---------------------------------------------------------------------------
// Flow through hollow tubes (launch lugs, tube fins, open airframes)
// ---------------------------------------------------------------------------

/// Geometry of a hollow tube open at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TubeFlow {
    pub length: f64,       // m
    pub inner_radius: f64, // m
    pub outer_radius: f64, // m
    pub roughness: f64,    // m
}

impl TubeFlow {
    pub fn inner_area(&self) -> f64 {
        PI * pow2(self.inner_radius)
    }

    /// Annulus facing the flow.
    pub fn frontal_area(&self) -> f64 {
        PI * (pow2(self.outer_radius) - pow2(self.inner_radius))
    }
}

/// Pressure drag of the air flowing through the tube, as a coefficient over
/// the reference area. Darcy-Weisbach with a Swamee-Jain friction factor.
pub fn interior_flow_cd(tube: &TubeFlow, conditions: &FlightConditions) -> f64 {
    let v = conditions.velocity;
    let inner_area = tube.inner_area();
    if v < EPSILON || inner_area < EPSILON || tube.length < EPSILON {
        return 0.0;
    }
    let d = 2.0 * tube.inner_radius;
    let rho = conditions.atmosphere.density;
    let re = v * d / conditions.kinematic_viscosity();

    let mut f = 0.25 / pow2((tube.roughness / (3.7 * d) + 5.74 / re.powf(0.9)).log10());
    if conditions.mach > 1.0 {
        f /= conditions.beta;
    }
    let delta_p = f * tube.length * rho * pow2(v) / (2.0 * d);

    let q = 0.5 * rho * pow2(v);
    if q < EPSILON {
        return 0.0;
    }
    delta_p * inner_area / (q * conditions.ref_area)
}

/// Interior flow drag plus stagnation and base drag on the tube's annulus.
pub fn interior_pressure_cd(
    tube: &TubeFlow,
    conditions: &FlightConditions,
    stagnation_cd: f64,
    base_cd: f64,
) -> f64 {
    let exterior = (stagnation_cd + base_cd) * tube.frontal_area() / conditions.ref_area;
    exterior + interior_flow_cd(tube, conditions)
}
