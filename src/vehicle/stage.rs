use serde::{Deserialize, Serialize};

use super::component::Component;

// ---------------------------------------------------------------------------
// Stage definition (one stage of a multi-stage rocket)
// ---------------------------------------------------------------------------

/// A separable stage. Stage 0 is the sustainer at the nose; higher numbers
/// sit further aft and separate first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub components: Vec<Component>,
    #[serde(default)]
    pub separation: StageSeparation,
}

impl Stage {
    /// Stacked length of the stage's body components.
    pub fn length(&self) -> f64 {
        self.components.iter().filter(|c| c.is_body()).map(|c| c.length()).sum()
    }

    pub fn structural_mass(&self) -> f64 {
        fn sum(c: &Component) -> f64 {
            c.mass + c.children.iter().map(sum).sum::<f64>()
        }
        self.components.iter().map(sum).sum()
    }
}

/// When a stage drops away from the stages above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageSeparation {
    pub event: SeparationEvent,
    #[serde(default)]
    pub delay: f64, // s
}

impl Default for StageSeparation {
    fn default() -> Self {
        Self { event: SeparationEvent::UpperIgnition, delay: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparationEvent {
    /// Ignition of a motor in the stage directly above.
    UpperIgnition,
    /// Ejection charge of this stage's motor.
    Ejection,
    /// Burnout of this stage's motor.
    Burnout,
    Launch,
    Never,
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    name: String,
    components: Vec<Component>,
    separation: StageSeparation,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: vec![],
            separation: StageSeparation::default(),
        }
    }

    pub fn component(mut self, c: Component) -> Self { self.components.push(c); self }
    pub fn separation(mut self, event: SeparationEvent, delay: f64) -> Self {
        self.separation = StageSeparation { event, delay };
        self
    }

    pub fn build(self) -> Stage {
        Stage {
            name: self.name,
            components: self.components,
            separation: self.separation,
        }
    }
}
