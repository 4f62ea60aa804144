use serde::Serialize;

use crate::math::EPSILON;

// ---------------------------------------------------------------------------
// Centre of pressure
// ---------------------------------------------------------------------------

/// Centre-of-pressure position carrying CNa as its averaging weight.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CenterOfPressure {
    pub x: f64, // m aft of the nose tip
    pub y: f64,
    pub z: f64,
    pub weight: f64,
}

impl CenterOfPressure {
    pub fn new(x: f64, y: f64, z: f64, weight: f64) -> Self {
        Self { x, y, z, weight }
    }

    pub fn axial(x: f64, weight: f64) -> Self {
        Self { x, y: 0.0, z: 0.0, weight }
    }

    /// Weighted mean of two positions. When the weights cancel the midpoint
    /// is returned with zero weight.
    pub fn average(&self, other: &CenterOfPressure) -> CenterOfPressure {
        let w = self.weight + other.weight;
        if w.abs() < EPSILON {
            return CenterOfPressure::new(
                (self.x + other.x) / 2.0,
                (self.y + other.y) / 2.0,
                (self.z + other.z) / 2.0,
                0.0,
            );
        }
        CenterOfPressure::new(
            (self.x * self.weight + other.x * other.weight) / w,
            (self.y * self.weight + other.y * other.weight) / w,
            (self.z * self.weight + other.z * other.weight) / w,
            w,
        )
    }
}

// ---------------------------------------------------------------------------
// Aerodynamic force coefficients
// ---------------------------------------------------------------------------

/// Force and moment coefficients of one component or of the whole rocket.
/// All coefficients are normalised by the reference area and length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AerodynamicForces {
    pub cp: CenterOfPressure,
    pub cna: f64,
    pub cn: f64,
    pub cm: f64,
    pub cside: f64,
    pub cyaw: f64,
    pub croll: f64,
    pub croll_force: f64,
    pub croll_damp: f64,

    pub friction_cd: f64,
    pub pressure_cd: f64,
    pub base_cd: f64,
    pub cd: f64,
    pub cd_axial: f64,

    pub pitch_damping_moment: f64,
    pub yaw_damping_moment: f64,
}

impl AerodynamicForces {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Add another contribution. CP is combined by CNa weight; every other
    /// coefficient is summed.
    pub fn merge(&mut self, other: &AerodynamicForces) {
        self.cp = self.cp.average(&other.cp);
        self.cna += other.cna;
        self.cn += other.cn;
        self.cm += other.cm;
        self.cside += other.cside;
        self.cyaw += other.cyaw;
        self.croll += other.croll;
        self.croll_force += other.croll_force;
        self.croll_damp += other.croll_damp;
        self.friction_cd += other.friction_cd;
        self.pressure_cd += other.pressure_cd;
        self.base_cd += other.base_cd;
        self.cd += other.cd;
        self.cd_axial += other.cd_axial;
        self.pitch_damping_moment += other.pitch_damping_moment;
        self.yaw_damping_moment += other.yaw_damping_moment;
    }

    pub fn is_finite(&self) -> bool {
        [self.cp.x, self.cna, self.cn, self.cm, self.croll, self.cd, self.cd_axial]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cp_is_cna_weighted() {
        let mut total = AerodynamicForces::zero();
        total.merge(&AerodynamicForces {
            cna: 2.0,
            cp: CenterOfPressure::axial(0.1, 2.0),
            ..Default::default()
        });
        total.merge(&AerodynamicForces {
            cna: 6.0,
            cp: CenterOfPressure::axial(0.5, 6.0),
            ..Default::default()
        });
        assert_relative_eq!(total.cp.x, 0.4, epsilon = 1e-12);
        assert_relative_eq!(total.cp.weight, 8.0);
        assert_relative_eq!(total.cna, 8.0);
    }

    #[test]
    fn cancelling_weights_fall_back_to_midpoint() {
        let a = CenterOfPressure::axial(0.2, 1.0);
        let b = CenterOfPressure::axial(0.6, -1.0);
        let c = a.average(&b);
        assert_relative_eq!(c.x, 0.4, epsilon = 1e-12);
        assert_eq!(c.weight, 0.0);
    }

    #[test]
    fn merging_zero_keeps_values() {
        let f = AerodynamicForces {
            cn: 1.5,
            cm: -0.2,
            cd: 0.4,
            cp: CenterOfPressure::axial(0.3, 1.0),
            ..Default::default()
        };
        let mut total = f;
        total.merge(&AerodynamicForces::zero());
        assert_eq!(total.cn, 1.5);
        assert_eq!(total.cp.x, 0.3);
    }
}
