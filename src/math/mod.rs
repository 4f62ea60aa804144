pub mod interp;

pub use interp::{LinearInterpolator, PolyInterpolator};

// ---------------------------------------------------------------------------
// Numeric helpers shared by the aerodynamic and flight models
// ---------------------------------------------------------------------------

/// Threshold below which areas, lengths and spans are treated as zero.
pub const EPSILON: f64 = 1e-8;

#[inline]
pub fn pow2(x: f64) -> f64 {
    x * x
}

#[inline]
pub fn pow3(x: f64) -> f64 {
    x * x * x
}

#[inline]
pub fn pow4(x: f64) -> f64 {
    pow2(pow2(x))
}

/// Square root that returns 0 for negative arguments instead of NaN.
pub fn safe_sqrt(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x.sqrt()
    }
}

/// Arc cosine with the argument clamped to [-1, 1].
pub fn safe_acos(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).acos()
}

/// Sign of `x` as -1, 0 or 1.
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// sin(x)/x with the removable singularity handled.
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-4 {
        1.0 - x * x / 6.0
    } else {
        x.sin() / x
    }
}

/// `x` mapped to 0 when it is NaN or infinite.
pub fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
