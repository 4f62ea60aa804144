use std::sync::LazyLock;

use crate::math::{pow2, safe_sqrt, PolyInterpolator};

/// Angle of attack where the axial drag multiplier peaks.
const AXIAL_PEAK: f64 = 17.0 * std::f64::consts::PI / 180.0;

// ---------------------------------------------------------------------------
// Mach-dependent drag building blocks
// ---------------------------------------------------------------------------

/// Pressure drag coefficient of a blunt forward-facing surface.
pub fn stagnation_cd(mach: f64) -> f64 {
    let pressure = if mach <= 1.0 {
        1.0 + pow2(mach) / 4.0 + pow2(pow2(mach)) / 40.0
    } else {
        1.84 - 0.76 / pow2(mach) + 0.166 / pow2(pow2(mach)) + 0.035 / pow2(mach * mach * mach)
    };
    0.85 * pressure
}

/// Base drag coefficient of an aft-facing surface.
pub fn base_cd(mach: f64) -> f64 {
    if mach <= 1.0 {
        0.12 + 0.13 * mach * mach
    } else {
        0.25 / mach
    }
}

/// Skin-friction coefficient for the whole airframe at Reynolds number `re`.
pub fn friction_coefficient(mach: f64, re: f64, perfect_finish: bool) -> f64 {
    let mut c1 = 1.0;
    let mut c2 = 1.0;

    let cf = if perfect_finish {
        let cf = if re < 1.0e4 {
            1.33e-2
        } else if re < 5.39e5 {
            1.328 / safe_sqrt(re)
        } else {
            1.0 / pow2(1.50 * re.ln() - 5.6) - 1700.0 / re
        };

        if mach < 1.1 && re > 1.0e6 {
            c1 = if re < 3.0e6 {
                1.0 - 0.1 * pow2(mach) * (re - 1.0e6) / 2.0e6
            } else {
                1.0 - 0.1 * pow2(mach)
            };
        }
        if mach > 0.9 && re > 1.0e6 {
            let full = 1.0 / (1.0 + 0.045 * pow2(mach)).powf(0.25);
            c2 = if re < 3.0e6 { 1.0 + (full - 1.0) * (re - 1.0e6) / 2.0e6 } else { full };
        }
        cf
    } else {
        if mach < 1.1 {
            c1 = 1.0 - 0.1 * pow2(mach);
        }
        if mach > 0.9 {
            c2 = 1.0 / (1.0 + 0.15 * pow2(mach)).powf(0.58);
        }
        if re < 1.0e4 {
            1.48e-2
        } else {
            1.0 / pow2(1.50 * re.ln() - 5.6)
        }
    };

    if mach < 0.9 {
        cf * c1
    } else if mach < 1.1 {
        cf * (c2 * (mach - 0.9) / 0.2 + c1 * (1.1 - mach) / 0.2)
    } else {
        cf * c2
    }
}

/// Compressibility correction applied to the roughness-limited Cf.
pub fn roughness_correction(mach: f64) -> f64 {
    if mach < 0.9 {
        1.0 - 0.1 * pow2(mach)
    } else if mach > 1.1 {
        1.0 / (1.0 + 0.18 * pow2(mach))
    } else {
        let c1 = 1.0 - 0.1 * pow2(0.9);
        let c2 = 1.0 / (1.0 + 0.18 * pow2(1.1));
        c2 * (mach - 0.9) / 0.2 + c1 * (1.1 - mach) / 0.2
    }
}

/// Cf used for every component: the smooth-surface value limited by the
/// surface roughness.
pub fn component_cf(mach: f64, re: f64, roughness: f64, length: f64, perfect_finish: bool) -> f64 {
    let cf = friction_coefficient(mach, re, perfect_finish);
    let limited = if length > 0.0 {
        0.032 * (roughness / length).powf(0.2) * roughness_correction(mach)
    } else {
        0.0
    };
    if perfect_finish {
        if re > 1.0e6 && limited > cf {
            limited
        } else {
            cf
        }
    } else {
        cf.max(limited)
    }
}

// ---------------------------------------------------------------------------
// Axial drag as a function of angle of attack
// ---------------------------------------------------------------------------

static AXIAL_POLYS: LazyLock<Option<(Vec<f64>, Vec<f64>)>> = LazyLock::new(|| {
    let low = PolyInterpolator::new(&[&[0.0, AXIAL_PEAK], &[0.0, AXIAL_PEAK]])?;
    let high = PolyInterpolator::new(&[
        &[AXIAL_PEAK, std::f64::consts::FRAC_PI_2],
        &[AXIAL_PEAK, std::f64::consts::FRAC_PI_2],
        &[std::f64::consts::FRAC_PI_2],
    ])?;
    Some((low.interpolate(&[1.0, 1.3, 0.0, 0.0]), high.interpolate(&[1.3, 0.0, 0.0, 0.0, 0.0])))
});

/// Axial drag coefficient from the total CD. Rises to 1.3 times CD at 17°,
/// falls to zero side-on and changes sign when flying backwards.
pub fn axial_cd(aoa: f64, cd: f64) -> f64 {
    let Some((low, high)) = AXIAL_POLYS.as_ref() else {
        return if aoa < std::f64::consts::FRAC_PI_2 { cd } else { -cd };
    };
    let mut a = aoa.clamp(0.0, std::f64::consts::PI);
    if a > std::f64::consts::FRAC_PI_2 {
        a = std::f64::consts::PI - a;
    }
    let mul = if a < AXIAL_PEAK {
        PolyInterpolator::eval(a, low)
    } else {
        PolyInterpolator::eval(a, high)
    };
    if aoa < std::f64::consts::FRAC_PI_2 {
        mul * cd
    } else {
        -mul * cd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stagnation_and_base_are_continuous_at_mach_one() {
        let eps = 1e-9;
        assert_relative_eq!(base_cd(1.0 - eps), base_cd(1.0 + eps), epsilon = 1e-6);
        assert_relative_eq!(stagnation_cd(0.0), 0.85);
        assert!((stagnation_cd(1.0 - eps) - stagnation_cd(1.0 + eps)).abs() < 0.01);
    }

    #[test]
    fn laminar_friction_below_transition() {
        let cf = friction_coefficient(0.0, 1.0e5, true);
        assert_relative_eq!(cf, 1.328 / 1.0e5_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(friction_coefficient(0.0, 100.0, false), 1.48e-2);
    }

    #[test]
    fn rough_surface_limits_cf() {
        let smooth = friction_coefficient(0.3, 5.0e6, false);
        let rough = component_cf(0.3, 5.0e6, 500e-6, 0.5, false);
        assert!(rough >= smooth);
        assert!(rough > 0.0);
    }

    #[test]
    fn axial_multiplier_shape() {
        assert_relative_eq!(axial_cd(0.0, 0.5), 0.5, epsilon = 1e-9);
        assert_relative_eq!(axial_cd(AXIAL_PEAK, 0.5), 0.65, epsilon = 1e-9);
        assert!(axial_cd(std::f64::consts::FRAC_PI_2, 0.5).abs() < 1e-9);
        assert_relative_eq!(axial_cd(std::f64::consts::PI, 0.5), -0.5, epsilon = 1e-9);
    }
}
