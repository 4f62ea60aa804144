use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Non-fatal simulation warnings
// ---------------------------------------------------------------------------

/// Conditions worth reporting that do not stop the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Warning {
    ZeroAreaFin { component: String },
    ThickFin { component: String },
    JaggedEdgedFin { component: String },
    /// More than eight fins share an axial station.
    ParallelFins { component: String },
    TubeFinSeparation { component: String },
    TubeFinOverlap { component: String },
    OpenAirframeForward { component: String },
    /// Transitions use subsonic pressure-drag data above Mach 1.1.
    Supersonic,
    /// Recovery device opened faster than 20 m/s; keeps the highest speed.
    HighSpeedDeployment { speed: f64 },
    NoRecoveryDevice,
    RecoveryLaunchRod,
    EarlySeparation,
    SeparationOrder,
    EventAfterLanding { event: String },
    MissingMotor { motor: String },
    MaxTimeReached { time: f64 },
}

impl Warning {
    /// Two warnings are duplicates when they describe the same condition.
    fn same_kind(&self, other: &Warning) -> bool {
        use Warning::*;
        match (self, other) {
            (HighSpeedDeployment { .. }, HighSpeedDeployment { .. }) => true,
            (MaxTimeReached { .. }, MaxTimeReached { .. }) => true,
            _ => self == other,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ZeroAreaFin { component } => write!(f, "Fins with zero area in {component}"),
            Warning::ThickFin { component } => {
                write!(f, "Thick fins may not be modeled accurately ({component})")
            }
            Warning::JaggedEdgedFin { component } => {
                write!(f, "Jagged-edged fin predictions may be inaccurate ({component})")
            }
            Warning::ParallelFins { component } => {
                write!(f, "Too many parallel fins in {component}")
            }
            Warning::TubeFinSeparation { component } => {
                write!(f, "Space between tube fins in {component}")
            }
            Warning::TubeFinOverlap { component } => write!(f, "Tube fins overlap in {component}"),
            Warning::OpenAirframeForward { component } => {
                write!(f, "Forward end of airframe is open ({component})")
            }
            Warning::Supersonic => {
                write!(f, "Body calculations may not be entirely accurate at supersonic speeds")
            }
            Warning::HighSpeedDeployment { speed } => {
                write!(f, "Recovery device deployment at high speed ({speed:.1} m/s)")
            }
            Warning::NoRecoveryDevice => write!(f, "No recovery device for simulation"),
            Warning::RecoveryLaunchRod => {
                write!(f, "Recovery device deployed while on the launch guide")
            }
            Warning::EarlySeparation => {
                write!(f, "Stage separation occurred before the rocket cleared the launch guide")
            }
            Warning::SeparationOrder => write!(f, "Stages separated in an unreasonable order"),
            Warning::EventAfterLanding { event } => {
                write!(f, "Flight event {event} occurred after landing")
            }
            Warning::MissingMotor { motor } => {
                write!(f, "Motor '{motor}' is not in the motor library")
            }
            Warning::MaxTimeReached { time } => {
                write!(f, "Simulation stopped at the {time:.0} s time limit")
            }
        }
    }
}

/// Insertion-ordered, deduplicated collection of warnings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarningSet {
    warnings: Vec<Warning>,
}

impl WarningSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning unless an equivalent one is already present. For
    /// high-speed deployment the stored speed is raised to the new maximum.
    pub fn add(&mut self, warning: Warning) {
        match self.warnings.iter_mut().find(|w| w.same_kind(&warning)) {
            Some(Warning::HighSpeedDeployment { speed }) => {
                if let Warning::HighSpeedDeployment { speed: new } = warning {
                    *speed = speed.max(new);
                }
            }
            Some(_) => {}
            None => self.warnings.push(warning),
        }
    }

    pub fn extend(&mut self, other: &WarningSet) {
        for w in &other.warnings {
            self.add(w.clone());
        }
    }

    pub fn contains(&self, warning: &Warning) -> bool {
        self.warnings.iter().any(|w| w.same_kind(warning))
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_dropped() {
        let mut set = WarningSet::new();
        set.add(Warning::ThickFin { component: "Fins".into() });
        set.add(Warning::ThickFin { component: "Fins".into() });
        set.add(Warning::ThickFin { component: "Canards".into() });
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn high_speed_deployment_keeps_maximum() {
        let mut set = WarningSet::new();
        set.add(Warning::HighSpeedDeployment { speed: 25.0 });
        set.add(Warning::HighSpeedDeployment { speed: 40.0 });
        set.add(Warning::HighSpeedDeployment { speed: 30.0 });
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next(), Some(&Warning::HighSpeedDeployment { speed: 40.0 }));
    }
}
