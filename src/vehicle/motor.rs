use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::LinearInterpolator;

// ---------------------------------------------------------------------------
// Motor definition (thrust and mass curves)
// ---------------------------------------------------------------------------

/// A solid rocket motor described by its thrust curve.
///
/// Propellant mass is consumed in proportion to delivered impulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    pub designation: String,
    pub diameter: f64,         // m
    pub length: f64,           // m
    pub total_mass: f64,       // kg, at ignition
    pub propellant_mass: f64,  // kg
    /// (time since ignition s, thrust N); the last point marks burnout.
    pub thrust_curve: Vec<(f64, f64)>,
}

impl Motor {
    /// Time of the last thrust curve sample.
    pub fn burn_time(&self) -> f64 {
        self.thrust_curve.iter().map(|p| p.0).fold(0.0, f64::max)
    }

    /// The thrust curve prepared for lookups during a flight.
    pub fn curve(&self) -> ThrustCurve {
        ThrustCurve::new(&self.thrust_curve)
    }

    pub fn total_impulse(&self) -> f64 {
        self.curve().total_impulse()
    }

    /// Motor mass (kg) once the given fraction of propellant has burnt.
    pub fn mass_after(&self, burnt: f64) -> f64 {
        self.total_mass - self.propellant_mass * burnt.clamp(0.0, 1.0)
    }

    /// Thrust curve sample times, used as step boundaries.
    pub fn curve_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.thrust_curve.iter().map(|p| p.0)
    }
}

/// Time-sorted thrust curve with the impulse delivered up to each sample.
#[derive(Debug, Clone, Default)]
pub struct ThrustCurve {
    table: LinearInterpolator,
    cumulative: Vec<f64>, // N·s
}

impl ThrustCurve {
    pub fn new(points: &[(f64, f64)]) -> Self {
        let table = LinearInterpolator::new(points.to_vec());
        let mut cumulative = Vec::with_capacity(table.points().len());
        let mut total = 0.0;
        let mut prev: Option<(f64, f64)> = None;
        for &(t, f) in table.points() {
            if let Some((t0, f0)) = prev {
                total += 0.5 * (f0 + f) * (t - t0);
            }
            cumulative.push(total);
            prev = Some((t, f));
        }
        Self { table, cumulative }
    }

    pub fn burn_time(&self) -> f64 {
        self.table.x_max().unwrap_or(0.0)
    }

    /// Thrust (N) at `t` seconds after ignition.
    pub fn thrust(&self, t: f64) -> f64 {
        if t < 0.0 || t > self.burn_time() {
            return 0.0;
        }
        self.table.value(t)
    }

    /// Impulse delivered between ignition and `t` (N·s).
    pub fn impulse(&self, t: f64) -> f64 {
        let points = self.table.points();
        let i = points.partition_point(|p| p.0 <= t);
        if i == 0 {
            return 0.0;
        }
        let (t0, f0) = points[i - 1];
        let end = t.min(self.burn_time());
        self.cumulative[i - 1] + 0.5 * (f0 + self.table.value(end)) * (end - t0)
    }

    pub fn total_impulse(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Share of the total impulse delivered by `t`.
    pub fn burnt_fraction(&self, t: f64) -> f64 {
        let total = self.total_impulse();
        if t <= 0.0 || total <= 0.0 {
            return 0.0;
        }
        (self.impulse(t) / total).clamp(0.0, 1.0)
    }
}

/// Motors available to a simulation, keyed by motor id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MotorLibrary {
    motors: BTreeMap<String, Motor>,
}

impl MotorLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, motor: Motor) -> Self {
        self.motors.insert(id.into(), motor);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, motor: Motor) {
        self.motors.insert(id.into(), motor);
    }

    pub fn get(&self, id: &str) -> Option<&Motor> {
        self.motors.get(id)
    }
}

// ---------------------------------------------------------------------------
// Motor mount configuration
// ---------------------------------------------------------------------------

/// Motor placement inside a body tube and its ignition/ejection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorMount {
    pub motor: String,
    #[serde(default)]
    pub ignition: IgnitionEvent,
    #[serde(default)]
    pub ignition_delay: f64, // s
    /// Delay from burnout to the ejection charge; `None` for plugged motors.
    #[serde(default)]
    pub ejection_delay: Option<f64>,
    #[serde(default)]
    pub overhang: f64, // m past the aft end of the mount
    #[serde(default = "default_cluster")]
    pub cluster_count: usize,
}

fn default_cluster() -> usize {
    1
}

impl MotorMount {
    pub fn new(motor: impl Into<String>) -> Self {
        Self {
            motor: motor.into(),
            ignition: IgnitionEvent::Automatic,
            ignition_delay: 0.0,
            ejection_delay: Some(0.0),
            overhang: 0.0,
            cluster_count: 1,
        }
    }

    pub fn ignition(mut self, event: IgnitionEvent, delay: f64) -> Self {
        self.ignition = event;
        self.ignition_delay = delay;
        self
    }
    pub fn ejection_delay(mut self, v: Option<f64>) -> Self { self.ejection_delay = v; self }
    pub fn overhang(mut self, v: f64) -> Self { self.overhang = v; self }
    pub fn cluster(mut self, n: usize) -> Self { self.cluster_count = n; self }
}

/// Event that lights a motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IgnitionEvent {
    /// At launch for the bottom active stage, otherwise at the ejection
    /// charge of the stage below.
    #[default]
    Automatic,
    Launch,
    /// Ejection charge of the stage below.
    EjectionCharge,
    /// Burnout of the stage below.
    Burnout,
    Never,
}
