use serde::{Deserialize, Serialize};

use super::stage::Stage;

// ---------------------------------------------------------------------------
// Rocket: ordered sequence of stages, nose first
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rocket {
    pub name: String,
    pub stages: Vec<Stage>,
    /// Surface roughness height of the finish (m).
    #[serde(default = "default_roughness")]
    pub roughness: f64,
    #[serde(default)]
    pub perfect_finish: bool,
}

fn default_roughness() -> f64 {
    60e-6 // regular paint
}

impl Rocket {
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn structural_mass(&self) -> f64 {
        self.stages.iter().map(|s| s.structural_mass()).sum()
    }
}

// ---------------------------------------------------------------------------
// Rocket builder
// ---------------------------------------------------------------------------

pub struct RocketBuilder {
    name: String,
    stages: Vec<Stage>,
    roughness: f64,
    perfect_finish: bool,
}

impl RocketBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: vec![],
            roughness: default_roughness(),
            perfect_finish: false,
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn roughness(mut self, v: f64) -> Self { self.roughness = v; self }
    pub fn perfect_finish(mut self, v: bool) -> Self { self.perfect_finish = v; self }

    pub fn build(self) -> Rocket {
        Rocket {
            name: self.name,
            stages: self.stages,
            roughness: self.roughness,
            perfect_finish: self.perfect_finish,
        }
    }
}

// ---------------------------------------------------------------------------
// Flight configuration: which stages take part in a flight
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightConfiguration {
    active: Vec<bool>,
}

impl FlightConfiguration {
    /// All stages of the rocket active.
    pub fn new(rocket: &Rocket) -> Self {
        Self { active: vec![true; rocket.stage_count()] }
    }

    pub fn stage_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_stage_active(&self, stage: usize) -> bool {
        self.active.get(stage).copied().unwrap_or(false)
    }

    pub fn set_stage_active(&mut self, stage: usize, active: bool) {
        if let Some(a) = self.active.get_mut(stage) {
            *a = active;
        }
    }

    pub fn set_all_stages(&mut self) {
        self.active.iter_mut().for_each(|a| *a = true);
    }

    pub fn has_active_stages(&self) -> bool {
        self.active.iter().any(|&a| a)
    }

    pub fn active_stages(&self) -> impl Iterator<Item = usize> + '_ {
        self.active.iter().enumerate().filter(|(_, &a)| a).map(|(i, _)| i)
    }

    /// The aft-most active stage, which flies first.
    pub fn bottom_stage(&self) -> Option<usize> {
        self.active.iter().rposition(|&a| a)
    }

    /// Deactivate `stage` and every stage below it.
    pub fn clear_stages_from(&mut self, stage: usize) {
        self.active.iter_mut().skip(stage).for_each(|a| *a = false);
    }

    /// Deactivate every stage above `stage`.
    pub fn clear_stages_above(&mut self, stage: usize) {
        self.active.iter_mut().take(stage).for_each(|a| *a = false);
    }
}
