use std::f64::consts::PI;
use std::sync::LazyLock;

use nalgebra::Isometry3;

use super::conditions::FlightConditions;
use super::forces::{AerodynamicForces, CenterOfPressure};
use crate::error::{Result, SimError};
use crate::math::{pow2, safe_sqrt, sign, LinearInterpolator, PolyInterpolator, EPSILON};
use crate::vehicle::component::{ComponentKind, FinCrossSection, FinSet};
use crate::vehicle::{ComponentId, RocketLayout};
use crate::warning::{Warning, WarningSet};

pub const STALL_ANGLE: f64 = 20.0 * PI / 180.0;
/// Spanwise strips used to integrate the fin planform.
pub const DIVISIONS: usize = 48;

const CNA_SUBSONIC: f64 = 0.9;
const CNA_SUPERSONIC: f64 = 1.5;
const GAMMA: f64 = 1.4;
/// Local angle limit for fin strips at high roll rates.
const ROLL_STRIP_LIMIT: f64 = 15.0 * PI / 180.0;

// ---------------------------------------------------------------------------
// Supersonic lift coefficients (Busemann second-order theory)
// ---------------------------------------------------------------------------

struct KTables {
    k1: LinearInterpolator,
    k2: LinearInterpolator,
    k3: LinearInterpolator,
}

impl KTables {
    fn values(&self, mach: f64) -> (f64, f64, f64) {
        (self.k1.value(mach), self.k2.value(mach), self.k3.value(mach))
    }

    fn slopes(&self, mach: f64) -> (f64, f64, f64) {
        (self.k1.slope(mach), self.k2.slope(mach), self.k3.slope(mach))
    }
}

/// Tabulated from Mach 1.5 in steps of 0.1, 35 points.
static K_TABLES: LazyLock<KTables> = LazyLock::new(|| {
    let n = ((5.0 - CNA_SUPERSONIC) * 10.0).round() as usize;
    let mut k1 = Vec::with_capacity(n);
    let mut k2 = Vec::with_capacity(n);
    let mut k3 = Vec::with_capacity(n);
    for i in 0..n {
        let m = CNA_SUPERSONIC + i as f64 * 0.1;
        let beta = safe_sqrt(m * m - 1.0);
        k1.push((m, 2.0 / beta));
        k2.push((m, ((GAMMA + 1.0) * m.powi(4) - 4.0 * pow2(beta)) / (4.0 * beta.powi(4))));
        k3.push((
            m,
            ((GAMMA + 1.0) * m.powi(8)
                + (2.0 * pow2(GAMMA) - 7.0 * GAMMA - 5.0) * m.powi(6)
                + 10.0 * (GAMMA + 1.0) * m.powi(4)
                + 8.0)
                / (6.0 * beta.powi(7)),
        ));
    }
    KTables {
        k1: LinearInterpolator::new(k1),
        k2: LinearInterpolator::new(k2),
        k3: LinearInterpolator::new(k3),
    }
});

/// Value and slope at both ends of the transonic gap, plus a zero second
/// derivative at the subsonic end.
static CNA_TRANSONIC: LazyLock<Option<PolyInterpolator>> = LazyLock::new(|| {
    PolyInterpolator::new(&[
        &[CNA_SUBSONIC, CNA_SUPERSONIC],
        &[CNA_SUBSONIC, CNA_SUPERSONIC],
        &[CNA_SUBSONIC],
    ])
});

// ---------------------------------------------------------------------------
// Fin geometry
// ---------------------------------------------------------------------------

/// Planform properties of one fin, derived once from its outline.
#[derive(Debug, Clone)]
pub struct FinGeometry {
    pub name: String,
    pub fin_count: usize,
    pub span: f64,        // m
    pub thickness: f64,   // m
    pub cant_angle: f64,  // rad
    pub body_radius: f64, // m
    pub cross_section: FinCrossSection,
    pub area: f64, // m^2, single fin
    pub aspect_ratio: f64,
    pub mac_length: f64, // m
    pub mac_lead: f64,   // m from the root leading edge
    pub mac_span: f64,   // m from the root
    pub cos_gamma: f64,
    pub cos_gamma_lead: f64,
    pub roll_sum: f64,
    pub chord_lead: [f64; DIVISIONS],
    pub chord_trail: [f64; DIVISIONS],
    pub chord_length: [f64; DIVISIONS],
    pub interference_count: usize,
    pub cp_poly: [f64; 6],
    pub warnings: Vec<Warning>,
}

/// Strip-integrate a fin outline. `body_radius` is the parent body radius
/// at the fin root and `interference_count` the number of fins sharing the
/// same axial station (see [`interference_count`]).
pub fn derive_geometry(
    name: &str,
    fins: &FinSet,
    body_radius: f64,
    interference_count: usize,
) -> FinGeometry {
    let span = fins.span();
    let area = planform_area(&fins.outline);
    let mut warnings = vec![];

    let aspect_ratio = if area < EPSILON {
        warnings.push(Warning::ZeroAreaFin { component: name.to_string() });
        0.0
    } else {
        2.0 * pow2(span) / area
    };

    // the root chord is excluded from the jaggedness check
    let mut down = false;
    for w in fins.outline.windows(2) {
        let (y0, y1) = (w[0].1, w[1].1);
        if y1 > y0 + 0.001 && down {
            warnings.push(Warning::JaggedEdgedFin { component: name.to_string() });
            break;
        }
        if y1 < y0 - 0.001 {
            down = true;
        }
    }

    if body_radius > 0.0 && fins.thickness > body_radius / 2.0 {
        warnings.push(Warning::ThickFin { component: name.to_string() });
    }

    let (chord_lead, chord_trail, chord_length) = chord_strips(&fins.outline, span);

    let dy = span / (DIVISIONS - 1) as f64;
    let (mut mac_length, mut mac_lead, mut mac_span) = (0.0, 0.0, 0.0);
    let (mut cos_gamma, mut cos_gamma_lead) = (0.0, 0.0);
    let (mut strip_area, mut roll_sum) = (0.0, 0.0);
    for i in 0..DIVISIONS {
        let length = chord_trail[i] - chord_lead[i];
        let y = i as f64 * dy;

        mac_length += length * length;
        mac_span += y * length;
        mac_lead += chord_lead[i] * length;
        strip_area += length;
        roll_sum += chord_length[i] * pow2(body_radius + y);

        if i > 0 {
            let mid = (chord_trail[i] + chord_lead[i]) / 2.0;
            let dx = mid - (chord_trail[i - 1] + chord_lead[i - 1]) / 2.0;
            let h = dx.hypot(dy);
            if h != 0.0 {
                cos_gamma += dy / h;
            }
            let dx = chord_lead[i] - chord_lead[i - 1];
            let h = dx.hypot(dy);
            if h != 0.0 {
                cos_gamma_lead += dy / h;
            }
        }
    }
    strip_area *= dy;
    roll_sum *= dy;
    if strip_area > EPSILON {
        mac_length *= dy / strip_area;
        mac_span *= dy / strip_area;
        mac_lead *= dy / strip_area;
    } else {
        mac_length = 0.0;
        mac_span = 0.0;
        mac_lead = 0.0;
    }
    cos_gamma /= (DIVISIONS - 1) as f64;
    cos_gamma_lead /= (DIVISIONS - 1) as f64;

    FinGeometry {
        name: name.to_string(),
        fin_count: fins.fin_count,
        span,
        thickness: fins.thickness,
        cant_angle: fins.cant_angle,
        body_radius,
        cross_section: fins.cross_section,
        area,
        aspect_ratio,
        mac_length,
        mac_lead,
        mac_span,
        cos_gamma,
        cos_gamma_lead,
        roll_sum,
        chord_lead,
        chord_trail,
        chord_length,
        interference_count,
        cp_poly: cp_polynomial(aspect_ratio),
        warnings,
    }
}

type Strips = ([f64; DIVISIONS], [f64; DIVISIONS], [f64; DIVISIONS]);

/// Leading edge, trailing edge and chord length of each spanwise strip.
fn chord_strips(outline: &[(f64, f64)], span: f64) -> Strips {
    let mut lead = [f64::INFINITY; DIVISIONS];
    let mut trail = [f64::NEG_INFINITY; DIVISIONS];
    let mut length = [0.0; DIVISIONS];
    let last = DIVISIONS - 1;

    if span >= EPSILON {
        // close the outline along the root chord
        let closing = outline.last().copied().into_iter().chain(outline.first().copied());
        let points: Vec<(f64, f64)> = outline.iter().copied().chain(closing.skip(1)).collect();
        for w in points.windows(2) {
            let ((x1, y1), (x2, y2)) = (w[0], w[1]);
            if (y1 - y2).abs() < 0.001 {
                continue;
            }
            let strip = |y: f64| {
                ((y * 1.0001 / span * last as f64) as isize).clamp(0, last as isize) as usize
            };
            let (mut i1, mut i2) = (strip(y1), strip(y2));
            if i1 > i2 {
                std::mem::swap(&mut i1, &mut i2);
            }
            for i in i1..=i2 {
                let y = i as f64 * span / last as f64;
                let x = (y - y2) / (y1 - y2) * x1 + (y1 - y) / (y1 - y2) * x2;
                let x = x.clamp(x1.min(x2), x1.max(x2));
                lead[i] = lead[i].min(x);
                trail[i] = trail[i].max(x);
                if y1 < y2 {
                    length[i] -= x;
                } else {
                    length[i] += x;
                }
            }
        }
    }

    for i in 0..DIVISIONS {
        if !lead[i].is_finite() || !trail[i].is_finite() {
            lead[i] = 0.0;
            trail[i] = 0.0;
        }
        if length[i] < 0.0 || length[i].is_nan() {
            length[i] = 0.0;
        }
        if length[i] > trail[i] - lead[i] {
            length[i] = trail[i] - lead[i];
        }
    }
    (lead, trail, length)
}

/// Area enclosed by the outline and the root chord.
fn planform_area(outline: &[(f64, f64)]) -> f64 {
    let n = outline.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (x0, y0) = outline[i];
            let (x1, y1) = outline[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum();
    twice.abs() / 2.0
}

/// Coefficients, lowest power first, of the quintic that carries the CP
/// from the quarter chord at Mach 0.5 to the supersonic estimate at Mach 2.
pub fn cp_polynomial(ar: f64) -> [f64; 6] {
    let denom = pow2(1.0 - 3.4641 * ar);
    let poly = [
        9.16049 * (-0.588838 + ar) * (-0.20624 + ar) / denom,
        -31.6049 * (-0.705375 + ar) * (-0.198476 + ar) / denom,
        55.3086 * (-0.711482 + ar) * (-0.196772 + ar) / denom,
        -39.5062 * (-0.72074 + ar) * (-0.194245 + ar) / denom,
        12.8395 * (-0.725688 + ar) * (-0.19292 + ar) / denom,
        -1.58025 * (-0.728769 + ar) * (-0.192105 + ar) / denom,
    ];
    if poly.iter().all(|c| c.is_finite()) {
        poly
    } else {
        // degenerate aspect ratio: hold the quarter chord
        [0.25, 0.0, 0.0, 0.0, 0.0, 0.0]
    }
}

/// Relative CP position along the MAC.
pub fn cp_position(ar: f64, poly: &[f64; 6], conditions: &FlightConditions) -> f64 {
    let m = conditions.mach;
    if m <= 0.5 {
        return 0.25;
    }
    if m >= 2.0 {
        let beta = conditions.beta;
        return (ar * beta - 0.67) / (2.0 * ar * beta - 1.0);
    }
    PolyInterpolator::eval(m, poly)
}

/// CNa reduction for fins sharing an axial station.
pub fn interference_factor(count: usize) -> f64 {
    match count {
        0..=4 => 1.0,
        5 => 0.948,
        6 => 0.913,
        7 => 0.854,
        8 => 0.81,
        _ => 0.75,
    }
}

/// Number of fins, this set's own included, whose root chords overlap this
/// set's root chord on the same parent body.
pub fn interference_count(layout: &RocketLayout, id: ComponentId) -> Result<usize> {
    let fins = layout.get(id);
    let ComponentKind::FinSet(spec) = &fins.kind else {
        return Ok(0);
    };
    if fins.parent.is_none() {
        return Err(SimError::FinSetWithoutParent { component: fins.name.clone() });
    }

    let lead = fins.x;
    let trail = fins.x + fins.length;
    let counted = if trail - lead < 0.007 {
        spec.fin_count
    } else {
        layout
            .siblings(id)
            .filter_map(|c| match &c.kind {
                ComponentKind::FinSet(other) => Some((c, other)),
                _ => None,
            })
            .filter(|(c, _)| c.x < trail - 0.005 && c.x + c.length > lead + 0.005)
            .map(|(_, other)| other.fin_count)
            .sum()
    };

    if counted < spec.fin_count {
        return Err(SimError::InterferenceCount {
            component: fins.name.clone(),
            counted,
            own: spec.fin_count,
        });
    }
    Ok(counted)
}

// ---------------------------------------------------------------------------
// Fin set forces
// ---------------------------------------------------------------------------

impl FinGeometry {
    /// Normal force, CP and roll coefficients of the single fin placed by
    /// `transform`; its x-rotation is the fin's roll angle.
    pub fn nonaxial_forces(
        &self,
        conditions: &FlightConditions,
        transform: &Isometry3<f64>,
        warnings: &mut WarningSet,
    ) -> AerodynamicForces {
        for w in &self.warnings {
            warnings.add(w.clone());
        }
        if self.area < EPSILON || self.mac_span < EPSILON {
            return AerodynamicForces::zero();
        }

        let cna1 = self.cna1(conditions);
        let fin_angle = transform.rotation.euler_angles().0;
        let mut cna = cna1 * pow2((conditions.theta - fin_angle).sin());

        if self.interference_count > 8 {
            warnings.add(Warning::ParallelFins { component: self.name.clone() });
        }
        cna *= interference_factor(self.interference_count);

        let r = self.body_radius;
        let mut tau = r / (self.span + r);
        if !tau.is_finite() {
            tau = 0.0;
        }
        cna *= 1.0 + tau;

        let x = self.mac_lead
            + cp_position(self.aspect_ratio, &self.cp_poly, conditions) * self.mac_length;

        let mut croll_force =
            (self.mac_span + r) * cna1 * (1.0 + tau) * self.cant_angle / conditions.ref_length;
        if conditions.aoa > STALL_ANGLE {
            let stall = (conditions.aoa - STALL_ANGLE) / (STALL_ANGLE / 2.0);
            croll_force *= (1.0 - stall).clamp(0.0, 1.0);
        }
        let croll_damp = self.roll_damping(conditions);

        let cn = cna * conditions.aoa.min(STALL_ANGLE);
        AerodynamicForces {
            cp: CenterOfPressure::axial(x, cna),
            cna,
            cn,
            cm: cn * x / conditions.ref_length,
            croll_force,
            croll_damp,
            croll: croll_force - croll_damp,
            ..AerodynamicForces::zero()
        }
    }

    /// Normal force slope of a single fin without interference effects.
    pub fn cna1(&self, conditions: &FlightConditions) -> f64 {
        if self.area < EPSILON || self.span < EPSILON || self.cos_gamma < EPSILON {
            return 0.0;
        }
        let mach = conditions.mach;
        let ref_area = conditions.ref_area;
        let alpha = conditions.aoa.min(PI - conditions.aoa).min(STALL_ANGLE);

        if mach <= CNA_SUBSONIC {
            return self.subsonic_cna1(mach, ref_area);
        }
        if mach >= CNA_SUPERSONIC {
            return self.supersonic_cna1(mach, alpha, ref_area);
        }

        let sub_v = self.subsonic_cna1(CNA_SUBSONIC, ref_area);
        let super_v = self.supersonic_cna1(CNA_SUPERSONIC, alpha, ref_area);
        let Some(poly) = CNA_TRANSONIC.as_ref() else {
            let t = (mach - CNA_SUBSONIC) / (CNA_SUPERSONIC - CNA_SUBSONIC);
            return sub_v + (super_v - sub_v) * t;
        };

        let k = pow2(self.span) / (self.area * self.cos_gamma);
        let sq = safe_sqrt(1.0 + (1.0 - pow2(CNA_SUBSONIC)) * pow2(k));
        let sub_d =
            2.0 * CNA_SUBSONIC * PI * pow2(self.span) * pow2(k) / (ref_area * sq * pow2(1.0 + sq));
        let (s1, s2, s3) = K_TABLES.slopes(CNA_SUPERSONIC);
        let super_d = self.area * (s1 + s2 * alpha + s3 * pow2(alpha)) / ref_area;

        let coefficients = poly.interpolate(&[sub_v, super_v, sub_d, super_d, 0.0]);
        PolyInterpolator::eval(mach, &coefficients)
    }

    fn subsonic_cna1(&self, mach: f64, ref_area: f64) -> f64 {
        let k = pow2(self.span) / (self.area * self.cos_gamma);
        let denom = 1.0 + safe_sqrt(1.0 + (1.0 - pow2(mach)) * pow2(k));
        2.0 * PI * pow2(self.span) / denom / ref_area
    }

    fn supersonic_cna1(&self, mach: f64, alpha: f64, ref_area: f64) -> f64 {
        let (k1, k2, k3) = K_TABLES.values(mach);
        self.area * (k1 + k2 * alpha + k3 * pow2(alpha)) / ref_area
    }

    /// Roll damping coefficient from the fin strips.
    pub fn roll_damping(&self, conditions: &FlightConditions) -> f64 {
        let rate = conditions.roll_rate;
        if rate.abs() < 0.1 {
            return 0.0;
        }
        let mach = conditions.mach;
        let v = conditions.velocity;
        let r = self.body_radius;
        let ref_moment = conditions.ref_area * conditions.ref_length;

        // fin tips beyond stall: sum the strips with a clamped local angle
        if rate.abs() * (r + self.span) / v > ROLL_STRIP_LIMIT {
            let sum: f64 = (0..DIVISIONS)
                .map(|i| {
                    let dist = r + self.span * i as f64 / DIVISIONS as f64;
                    let aoa = (rate.abs() * dist / v).min(ROLL_STRIP_LIMIT);
                    self.chord_length[i] * dist * aoa
                })
                .sum();
            let strip = self.span / DIVISIONS as f64;
            return sign(rate) * sum * strip * 2.0 * PI / conditions.beta / ref_moment;
        }

        if mach <= CNA_SUBSONIC {
            return 2.0 * PI * rate * self.roll_sum / (ref_moment * v * conditions.beta);
        }
        if mach >= CNA_SUPERSONIC {
            let (k1, k2, k3) = K_TABLES.values(mach);
            let sum: f64 = (0..DIVISIONS)
                .map(|i| {
                    let y = i as f64 * self.span / (DIVISIONS - 1) as f64;
                    let angle = rate * (r + y) / v;
                    let poly = k1 * angle + k2 * angle * angle + k3 * angle * angle * angle;
                    poly * self.chord_length[i] * (r + y)
                })
                .sum();
            return sum * self.span / (DIVISIONS - 1) as f64 / ref_moment;
        }

        let subsonic = self.roll_damping(&conditions.clone().with_mach(CNA_SUBSONIC - 0.01));
        let supersonic = self.roll_damping(&conditions.clone().with_mach(CNA_SUPERSONIC + 0.01));
        let width = CNA_SUPERSONIC - CNA_SUBSONIC;
        subsonic * (CNA_SUPERSONIC - mach) / width + supersonic * (mach - CNA_SUBSONIC) / width
    }

    /// Mid-chord position of the MAC from the root leading edge.
    pub fn midchord_position(&self) -> f64 {
        self.mac_lead + 0.5 * self.mac_length
    }

    /// Skin-friction drag of one fin, both faces.
    pub fn friction_cd(&self, conditions: &FlightConditions, component_cf: f64) -> f64 {
        if self.area < EPSILON || self.mac_length < EPSILON {
            return 0.0;
        }
        let thickness = 1.0 + 2.0 * self.thickness / self.mac_length;
        component_cf * thickness * 2.0 * self.area / conditions.ref_area
    }

    /// Leading- and trailing-edge pressure drag of one fin.
    pub fn pressure_cd(
        &self,
        conditions: &FlightConditions,
        stagnation_cd: f64,
        base_cd: f64,
    ) -> f64 {
        if self.area < EPSILON {
            return 0.0;
        }
        let mach = conditions.mach;
        let mut cd = match self.cross_section {
            FinCrossSection::Square => stagnation_cd,
            FinCrossSection::Rounded | FinCrossSection::Airfoil => {
                if mach < 0.9 {
                    (1.0 - pow2(mach)).powf(-0.417) - 1.0
                } else if mach < 1.0 {
                    1.0 - 1.785 * (mach - 0.9)
                } else {
                    1.214 - 0.502 / pow2(mach) + 0.1095 / pow2(pow2(mach))
                }
            }
        };
        cd *= pow2(self.cos_gamma_lead);
        cd += match self.cross_section {
            FinCrossSection::Square => base_cd,
            FinCrossSection::Rounded => base_cd / 2.0,
            FinCrossSection::Airfoil => 0.0,
        };
        cd * self.span * self.thickness / conditions.ref_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::isa;
    use approx::assert_relative_eq;

    fn fins() -> FinGeometry {
        let spec = FinSet::trapezoidal(3, 0.05, 0.025, 0.025, 0.045, 0.0024);
        derive_geometry("Fins", &spec, 0.0124, 3)
    }

    fn at_mach(mach: f64) -> FlightConditions {
        FlightConditions::new(0.0248, isa(0.0)).with_mach(mach).with_aoa(0.05).with_theta(PI / 2.0)
    }

    fn fin_transform() -> Isometry3<f64> {
        Isometry3::identity()
    }

    #[test]
    fn trapezoid_geometry() {
        let g = fins();
        // (root + tip) / 2 * span
        assert_relative_eq!(g.area, 0.0375 * 0.045, epsilon = 1e-12);
        assert_relative_eq!(g.aspect_ratio, 2.0 * 0.045 * 0.045 / g.area, epsilon = 1e-12);
        // MAC of a trapezoid: 2/3 (cr + ct - cr ct / (cr + ct))
        let mac = 2.0 / 3.0 * (0.05 + 0.025 - 0.05 * 0.025 / 0.075);
        assert_relative_eq!(g.mac_length, mac, max_relative = 0.02);
        assert!(g.mac_span > 0.0 && g.mac_span < 0.045 / 2.0);
        assert!(g.cos_gamma > 0.0 && g.cos_gamma <= 1.0);
        assert!(g.warnings.is_empty());
    }

    #[test]
    fn zero_area_fin_produces_no_force() {
        let spec = FinSet::trapezoidal(3, 0.05, 0.05, 0.0, 0.0, 0.002);
        let g = derive_geometry("Flat", &spec, 0.0124, 3);
        assert!(g.warnings.contains(&Warning::ZeroAreaFin { component: "Flat".into() }));
        let mut warnings = WarningSet::new();
        let cond = at_mach(0.3).with_rates(5.0, 0.0, 0.0);
        let f = g.nonaxial_forces(&cond, &fin_transform(), &mut warnings);
        assert_eq!(f.cn, 0.0);
        assert_eq!(f.cp.x, 0.0);
        assert_eq!(f.croll, 0.0);
        assert_eq!(f.croll_damp, 0.0);
    }

    #[test]
    fn thick_and_jagged_fins_warn() {
        let mut spec = FinSet::trapezoidal(3, 0.05, 0.025, 0.025, 0.045, 0.01);
        spec.outline = vec![(0.0, 0.0), (0.01, 0.04), (0.02, 0.02), (0.03, 0.04), (0.05, 0.0)];
        let g = derive_geometry("Odd", &spec, 0.0124, 3);
        assert!(g.warnings.contains(&Warning::ThickFin { component: "Odd".into() }));
        assert!(g.warnings.contains(&Warning::JaggedEdgedFin { component: "Odd".into() }));
    }

    #[test]
    fn cna1_continuous_across_regimes() {
        let g = fins();
        for &m in &[CNA_SUBSONIC, CNA_SUPERSONIC] {
            let h = 1e-9;
            let below = g.cna1(&at_mach(m - h));
            let above = g.cna1(&at_mach(m + h));
            assert_relative_eq!(below, above, max_relative = 1e-6);
        }
    }

    #[test]
    fn cna1_slope_continuous_across_regimes() {
        let g = fins();
        let h = 1e-5;
        for &m in &[CNA_SUBSONIC, CNA_SUPERSONIC] {
            let left = (g.cna1(&at_mach(m)) - g.cna1(&at_mach(m - h))) / h;
            let right = (g.cna1(&at_mach(m + h)) - g.cna1(&at_mach(m))) / h;
            assert!(
                (left - right).abs() <= 1e-2 * left.abs().max(right.abs()) + 1e-6,
                "slope jump at M={}: {} vs {}",
                m,
                left,
                right
            );
        }
    }

    #[test]
    fn cp_position_continuous() {
        let g = fins();
        let cp = |m: f64| cp_position(g.aspect_ratio, &g.cp_poly, &at_mach(m));
        assert_relative_eq!(cp(0.5 - 1e-9), cp(0.5 + 1e-9), epsilon = 1e-6);
        assert_relative_eq!(cp(2.0 - 1e-9), cp(2.0 + 1e-9), epsilon = 1e-4);
    }

    #[test]
    fn interference_is_monotone() {
        let mut prev = interference_factor(1);
        for n in 2..=8 {
            let f = interference_factor(n);
            assert!(f <= prev, "factor rose at {} fins", n);
            prev = f;
        }
        assert_eq!(interference_factor(9), 0.75);
        assert_eq!(interference_factor(12), 0.75);
    }

    #[test]
    fn many_parallel_fins_warn_once() {
        let spec = FinSet::trapezoidal(12, 0.05, 0.025, 0.025, 0.045, 0.0024);
        let g = derive_geometry("Many", &spec, 0.0124, 12);
        let mut warnings = WarningSet::new();
        let cond = at_mach(0.3);
        g.nonaxial_forces(&cond, &fin_transform(), &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert!(warnings.contains(&Warning::ParallelFins { component: "Many".into() }));
    }

    #[test]
    fn no_cant_no_roll() {
        let g = fins();
        let mut warnings = WarningSet::new();
        let f = g.nonaxial_forces(&at_mach(0.3), &fin_transform(), &mut warnings);
        assert_eq!(f.croll_force, 0.0);
        assert_eq!(f.croll_damp, 0.0);
        assert_eq!(f.croll, 0.0);
    }

    #[test]
    fn roll_damping_opposes_rate() {
        let g = fins();
        let cond = at_mach(0.3).with_rates(2.0, 0.0, 0.0);
        assert!(g.roll_damping(&cond) > 0.0);
        let cond = cond.with_rates(-2.0, 0.0, 0.0);
        assert!(g.roll_damping(&cond) < 0.0);
    }

    #[test]
    fn canted_fins_produce_roll_forcing() {
        let spec = FinSet::trapezoidal(3, 0.05, 0.025, 0.025, 0.045, 0.0024).cant(0.02);
        let g = derive_geometry("Canted", &spec, 0.0124, 3);
        let mut warnings = WarningSet::new();
        let f = g.nonaxial_forces(&at_mach(0.3), &fin_transform(), &mut warnings);
        assert!(f.croll_force > 0.0);
    }

    #[test]
    fn square_edges_use_stagnation_and_base() {
        let g = fins();
        let cond = at_mach(0.3);
        let cd = g.pressure_cd(&cond, 1.0, 0.5);
        let expected = (pow2(g.cos_gamma_lead) + 0.5) * g.span * g.thickness / cond.ref_area;
        assert_relative_eq!(cd, expected, epsilon = 1e-12);
    }
}
