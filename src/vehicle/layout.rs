use serde::Serialize;

use super::component::{Component, ComponentKind, Parachute};
use super::motor::MotorMount;
use super::rocket::{FlightConfiguration, Rocket};
use super::stage::StageSeparation;

/// Reference length used when no body component is active.
const DEFAULT_REFERENCE_LENGTH: f64 = 0.1; // m

// ---------------------------------------------------------------------------
// Flattened component tree with absolute positions
// ---------------------------------------------------------------------------

/// Index of a component in a [`RocketLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentId(pub usize);

/// A component placed on the rocket axis. Positions are measured aft from
/// the nose tip of stage 0.
#[derive(Debug, Clone)]
pub struct PlacedComponent {
    pub id: ComponentId,
    pub name: String,
    pub stage: usize,
    pub kind: ComponentKind,
    pub x: f64,      // fore end, m
    pub length: f64, // m
    pub mass: f64,   // kg
    pub parent: Option<ComponentId>,
    /// Outer radius of the parent body at this component's fore end.
    pub body_radius: f64,
    pub prev_body: Option<ComponentId>,
    pub next_body: Option<ComponentId>,
    /// Forward-most airframe tube with a hollow interior.
    pub open_forward: bool,
}

impl PlacedComponent {
    pub fn is_body(&self) -> bool {
        matches!(self.kind, ComponentKind::Transition(_) | ComponentKind::BodyTube(_))
    }

    pub fn fore_radius(&self) -> f64 {
        match &self.kind {
            ComponentKind::Transition(t) => t.fore_radius,
            ComponentKind::BodyTube(t) => t.outer_radius,
            _ => 0.0,
        }
    }

    pub fn aft_radius(&self) -> f64 {
        match &self.kind {
            ComponentKind::Transition(t) => t.aft_radius,
            ComponentKind::BodyTube(t) => t.outer_radius,
            _ => 0.0,
        }
    }

    pub fn max_radius(&self) -> f64 {
        self.fore_radius().max(self.aft_radius())
    }
}

/// A motor mount placed on the rocket.
#[derive(Debug, Clone)]
pub struct PlacedMotor {
    pub mount: ComponentId,
    pub stage: usize,
    pub spec: MotorMount,
    pub x_aft: f64, // aft end of the motor, m
}

/// Immutable geometry of a rocket, shared by every branch of a run.
#[derive(Debug, Clone)]
pub struct RocketLayout {
    pub name: String,
    pub components: Vec<PlacedComponent>,
    pub motors: Vec<PlacedMotor>,
    pub stage_count: usize,
    pub stage_names: Vec<String>,
    pub separations: Vec<StageSeparation>,
    pub roughness: f64,
    pub perfect_finish: bool,
}

impl RocketLayout {
    pub fn new(rocket: &Rocket) -> Self {
        let mut layout = RocketLayout {
            name: rocket.name.clone(),
            components: vec![],
            motors: vec![],
            stage_count: rocket.stage_count(),
            stage_names: rocket.stages.iter().map(|s| s.name.clone()).collect(),
            separations: rocket.stages.iter().map(|s| s.separation).collect(),
            roughness: rocket.roughness,
            perfect_finish: rocket.perfect_finish,
        };

        let mut stage_x = 0.0;
        for (stage_idx, stage) in rocket.stages.iter().enumerate() {
            let mut cursor = stage_x;
            for comp in &stage.components {
                let x = if comp.is_body() {
                    let x = cursor;
                    cursor += comp.length();
                    x
                } else {
                    stage_x + comp.offset
                };
                layout.place(comp, x, None, stage_idx);
            }
            stage_x = cursor;
        }

        layout.link_bodies();
        layout
    }

    fn place(&mut self, comp: &Component, x: f64, parent: Option<ComponentId>, stage: usize) {
        let id = ComponentId(self.components.len());
        let body_radius = parent
            .map(|p| &self.components[p.0])
            .and_then(|p| body_radius_at(p, x - p.x))
            .unwrap_or(0.0);

        if let ComponentKind::BodyTube(tube) = &comp.kind {
            if let Some(mount) = &tube.motor_mount {
                self.motors.push(PlacedMotor {
                    mount: id,
                    stage,
                    spec: mount.clone(),
                    x_aft: x + tube.length + mount.overhang,
                });
            }
        }

        self.components.push(PlacedComponent {
            id,
            name: comp.name.clone(),
            stage,
            kind: comp.kind.clone(),
            x,
            length: comp.length(),
            mass: comp.mass,
            parent,
            body_radius,
            prev_body: None,
            next_body: None,
            open_forward: false,
        });

        for child in &comp.children {
            self.place(child, x + child.offset, Some(id), stage);
        }
    }

    fn link_bodies(&mut self) {
        let chain: Vec<ComponentId> = self
            .components
            .iter()
            .filter(|c| c.parent.is_none() && c.is_body())
            .map(|c| c.id)
            .collect();
        for (i, id) in chain.iter().enumerate() {
            let c = &mut self.components[id.0];
            c.prev_body = if i > 0 { Some(chain[i - 1]) } else { None };
            c.next_body = chain.get(i + 1).copied();
        }
        if let Some(first) = chain.first() {
            let c = &mut self.components[first.0];
            if let ComponentKind::BodyTube(tube) = &c.kind {
                c.open_forward = tube.inner_radius > 0.0;
            }
        }
    }

    pub fn get(&self, id: ComponentId) -> &PlacedComponent {
        &self.components[id.0]
    }

    /// Components belonging to active stages.
    pub fn active<'a>(
        &'a self,
        config: &'a FlightConfiguration,
    ) -> impl Iterator<Item = &'a PlacedComponent> + 'a {
        self.components.iter().filter(move |c| config.is_stage_active(c.stage))
    }

    pub fn is_active(&self, id: ComponentId, config: &FlightConfiguration) -> bool {
        config.is_stage_active(self.get(id).stage)
    }

    /// Components sharing the same parent, the component itself included.
    pub fn siblings(&self, id: ComponentId) -> impl Iterator<Item = &PlacedComponent> + '_ {
        let parent = self.get(id).parent;
        self.components.iter().filter(move |c| c.parent == parent)
    }

    pub fn recovery_devices(&self) -> impl Iterator<Item = (&PlacedComponent, &Parachute)> + '_ {
        self.components.iter().filter_map(|c| match &c.kind {
            ComponentKind::Parachute(p) => Some((c, p)),
            _ => None,
        })
    }

    /// Maximum body diameter among active components.
    pub fn reference_length(&self, config: &FlightConfiguration) -> f64 {
        let r = self
            .active(config)
            .filter(|c| c.is_body())
            .map(|c| c.max_radius())
            .fold(0.0, f64::max);
        if r > 0.0 {
            2.0 * r
        } else {
            DEFAULT_REFERENCE_LENGTH
        }
    }

    /// Axial extent (fore, aft) of the active airframe.
    pub fn active_extent(&self, config: &FlightConfiguration) -> Option<(f64, f64)> {
        self.active(config)
            .filter(|c| c.is_body())
            .fold(None, |acc, c| match acc {
                None => Some((c.x, c.x + c.length)),
                Some((lo, hi)) => Some((lo.min(c.x), hi.max(c.x + c.length))),
            })
    }

    /// Length of the active airframe, the basis of the Reynolds number.
    pub fn aerodynamic_length(&self, config: &FlightConfiguration) -> f64 {
        self.active_extent(config).map_or(0.0, |(lo, hi)| hi - lo)
    }
}

fn body_radius_at(parent: &PlacedComponent, x: f64) -> Option<f64> {
    match &parent.kind {
        ComponentKind::BodyTube(t) => Some(t.outer_radius),
        ComponentKind::Transition(t) => Some(t.radius_at(x)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::component::{FinSet, TransitionShape};
    use crate::vehicle::{MotorMount, RocketBuilder, StageBuilder};

    fn two_stage() -> Rocket {
        RocketBuilder::new("Layout")
            .stage(
                StageBuilder::new("Sustainer")
                    .component(Component::nose_cone("Nose", TransitionShape::Conical, 0.1, 0.02))
                    .component(Component::body_tube("Upper", 0.3, 0.02, 0.019))
                    .build(),
            )
            .stage(
                StageBuilder::new("Booster")
                    .component(
                        Component::body_tube("Lower", 0.2, 0.02, 0.019)
                            .with_motor_mount(MotorMount::new("M"))
                            .with_child(
                                Component::fin_set(
                                    "Fins",
                                    FinSet::trapezoidal(3, 0.08, 0.04, 0.04, 0.05, 0.002),
                                )
                                    .at(0.12),
                            ),
                    )
                    .build(),
            )
            .build()
    }

    #[test]
    fn bodies_stack_across_stages() {
        let layout = RocketLayout::new(&two_stage());
        let xs: Vec<f64> = layout.components.iter().map(|c| c.x).collect();
        assert_eq!(xs.len(), 4);
        assert!((xs[1] - 0.1).abs() < 1e-12);
        assert!((xs[2] - 0.4).abs() < 1e-12);
        assert!((xs[3] - 0.52).abs() < 1e-12);
        assert!((layout.motors[0].x_aft - 0.6).abs() < 1e-12);
    }

    #[test]
    fn fins_see_parent_radius() {
        let layout = RocketLayout::new(&two_stage());
        let fins = &layout.components[3];
        assert_eq!(fins.parent, Some(ComponentId(2)));
        assert!((fins.body_radius - 0.02).abs() < 1e-12);
    }

    #[test]
    fn reference_and_extent_follow_active_stages() {
        let rocket = two_stage();
        let layout = RocketLayout::new(&rocket);
        let mut config = FlightConfiguration::new(&rocket);
        assert!((layout.aerodynamic_length(&config) - 0.6).abs() < 1e-12);
        config.set_stage_active(1, false);
        assert!((layout.aerodynamic_length(&config) - 0.4).abs() < 1e-12);
        assert!((layout.reference_length(&config) - 0.04).abs() < 1e-12);
        assert_eq!(layout.get(ComponentId(1)).next_body, Some(ComponentId(2)));
    }
}
