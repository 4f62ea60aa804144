use serde::{Deserialize, Serialize};

use super::motor::MotorMount;

// ---------------------------------------------------------------------------
// Component tree
// ---------------------------------------------------------------------------

/// One rigid part of the rocket.
///
/// Body components (nose cones, transitions, body tubes) placed directly in a
/// stage are stacked nose to tail in declaration order. Every other component
/// sits at `offset` metres behind the fore end of its parent (or of the stage
/// for top-level parts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub kind: ComponentKind,
    #[serde(default)]
    pub offset: f64,      // m, from parent fore end
    #[serde(default)]
    pub mass: f64,        // kg, structural
    #[serde(default)]
    pub children: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    /// Nose cone (fore radius zero), shoulder or boattail.
    Transition(Transition),
    BodyTube(BodyTube),
    FinSet(FinSet),
    TubeFinSet(TubeFinSet),
    LaunchLug(LaunchLug),
    Parachute(Parachute),
    /// Point mass such as a payload or ballast.
    MassObject { length: f64 },
    /// Pure container; its children are placed relative to it.
    Assembly,
}

impl Component {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self { name: name.into(), kind, offset: 0.0, mass: 0.0, children: vec![] }
    }

    pub fn nose_cone(
        name: impl Into<String>,
        shape: TransitionShape,
        length: f64,
        radius: f64,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::Transition(Transition {
                fore_radius: 0.0,
                aft_radius: radius,
                length,
                shape,
                shape_parameter: 1.0,
            }),
        )
    }

    pub fn transition(
        name: impl Into<String>,
        fore_radius: f64,
        aft_radius: f64,
        length: f64,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::Transition(Transition {
                fore_radius,
                aft_radius,
                length,
                shape: TransitionShape::Conical,
                shape_parameter: 0.0,
            }),
        )
    }

    pub fn body_tube(
        name: impl Into<String>,
        length: f64,
        outer_radius: f64,
        inner_radius: f64,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::BodyTube(BodyTube {
                outer_radius,
                inner_radius,
                length,
                motor_mount: None,
            }),
        )
    }

    pub fn fin_set(name: impl Into<String>, fins: FinSet) -> Self {
        Self::new(name, ComponentKind::FinSet(fins))
    }

    pub fn tube_fin_set(name: impl Into<String>, fins: TubeFinSet) -> Self {
        Self::new(name, ComponentKind::TubeFinSet(fins))
    }

    pub fn launch_lug(
        name: impl Into<String>,
        length: f64,
        outer_radius: f64,
        inner_radius: f64,
    ) -> Self {
        Self::new(name, ComponentKind::LaunchLug(LaunchLug { outer_radius, inner_radius, length }))
    }

    pub fn parachute(
        name: impl Into<String>,
        diameter: f64,
        cd: f64,
        deployment: Deployment,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::Parachute(Parachute { diameter, cd, packed_length: 0.05, deployment }),
        )
    }

    pub fn mass_object(name: impl Into<String>, length: f64) -> Self {
        Self::new(name, ComponentKind::MassObject { length })
    }

    pub fn assembly(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Assembly)
    }

    pub fn at(mut self, offset: f64) -> Self { self.offset = offset; self }
    pub fn with_mass(mut self, mass: f64) -> Self { self.mass = mass; self }
    pub fn with_child(mut self, child: Component) -> Self { self.children.push(child); self }

    /// Attach a motor mount. Only meaningful for body tubes; ignored otherwise.
    pub fn with_motor_mount(mut self, mount: MotorMount) -> Self {
        if let ComponentKind::BodyTube(tube) = &mut self.kind {
            tube.motor_mount = Some(mount);
        }
        self
    }

    /// Axial extent of the component.
    pub fn length(&self) -> f64 {
        match &self.kind {
            ComponentKind::Transition(t) => t.length,
            ComponentKind::BodyTube(t) => t.length,
            ComponentKind::FinSet(f) => f.root_chord(),
            ComponentKind::TubeFinSet(t) => t.length,
            ComponentKind::LaunchLug(l) => l.length,
            ComponentKind::Parachute(p) => p.packed_length,
            ComponentKind::MassObject { length } => *length,
            ComponentKind::Assembly => 0.0,
        }
    }

    /// Whether the component is part of the axisymmetric airframe.
    pub fn is_body(&self) -> bool {
        matches!(self.kind, ComponentKind::Transition(_) | ComponentKind::BodyTube(_))
    }

    /// Outer radius at an axial position measured from the component's fore
    /// end, for body components.
    pub fn radius_at(&self, x: f64) -> Option<f64> {
        match &self.kind {
            ComponentKind::BodyTube(t) => Some(t.outer_radius),
            ComponentKind::Transition(t) => Some(t.radius_at(x)),
            _ => None,
        }
    }

    pub fn fore_radius(&self) -> f64 {
        match &self.kind {
            ComponentKind::BodyTube(t) => t.outer_radius,
            ComponentKind::Transition(t) => t.fore_radius,
            _ => 0.0,
        }
    }

    pub fn aft_radius(&self) -> f64 {
        match &self.kind {
            ComponentKind::BodyTube(t) => t.outer_radius,
            ComponentKind::Transition(t) => t.aft_radius,
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Body components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionShape {
    Conical,
    /// Tangent ogive for a shape parameter of 1, secant ogives below.
    Ogive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub fore_radius: f64, // m
    pub aft_radius: f64,  // m
    pub length: f64,      // m
    pub shape: TransitionShape,
    #[serde(default)]
    pub shape_parameter: f64,
}

impl Transition {
    /// Outer radius at `x` metres behind the fore end.
    pub fn radius_at(&self, x: f64) -> f64 {
        if self.length <= 0.0 {
            return self.fore_radius.max(self.aft_radius);
        }
        let x = x.clamp(0.0, self.length);
        match self.shape {
            TransitionShape::Conical => {
                self.fore_radius + (self.aft_radius - self.fore_radius) * x / self.length
            }
            TransitionShape::Ogive => {
                // tangent ogive through the two end radii, tangent at the wide end
                let r0 = self.fore_radius.min(self.aft_radius);
                let r1 = self.fore_radius.max(self.aft_radius);
                let dr = r1 - r0;
                if dr <= 0.0 {
                    return r1;
                }
                let rho = (dr * dr + self.length * self.length) / (2.0 * dr);
                // distance from the wide end
                let s = if self.aft_radius >= self.fore_radius { self.length - x } else { x };
                r1 - rho + (rho * rho - s * s).max(0.0).sqrt()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyTube {
    pub outer_radius: f64, // m
    pub inner_radius: f64, // m
    pub length: f64,       // m
    #[serde(default)]
    pub motor_mount: Option<MotorMount>,
}

// ---------------------------------------------------------------------------
// Fins and external attachments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinCrossSection {
    #[default]
    Square,
    Rounded,
    Airfoil,
}

/// A set of identical fins equally spaced around the body.
///
/// `outline` traces the fin from the leading root point (0, 0) over the tip
/// to the trailing root point (root chord, 0); x runs aft and y outward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinSet {
    pub fin_count: usize,
    pub outline: Vec<(f64, f64)>,
    pub thickness: f64,  // m
    #[serde(default)]
    pub cant_angle: f64, // rad
    #[serde(default)]
    pub cross_section: FinCrossSection,
    #[serde(default)]
    pub base_rotation: f64, // rad, angle of the first fin
}

impl FinSet {
    /// Trapezoidal fin outline from root chord, tip chord, leading-edge sweep
    /// length and span.
    pub fn trapezoidal(
        fin_count: usize,
        root_chord: f64,
        tip_chord: f64,
        sweep: f64,
        span: f64,
        thickness: f64,
    ) -> Self {
        Self {
            fin_count,
            outline: vec![(0.0, 0.0), (sweep, span), (sweep + tip_chord, span), (root_chord, 0.0)],
            thickness,
            cant_angle: 0.0,
            cross_section: FinCrossSection::Square,
            base_rotation: 0.0,
        }
    }

    pub fn cant(mut self, angle: f64) -> Self { self.cant_angle = angle; self }
    pub fn cross_section(mut self, section: FinCrossSection) -> Self {
        self.cross_section = section;
        self
    }

    pub fn root_chord(&self) -> f64 {
        self.outline.last().map_or(0.0, |p| p.0)
    }

    pub fn span(&self) -> f64 {
        self.outline.iter().map(|p| p.1).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeFinSet {
    pub fin_count: usize,
    pub outer_radius: f64, // m
    pub inner_radius: f64, // m
    pub length: f64,       // m
    #[serde(default)]
    pub base_rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchLug {
    pub outer_radius: f64, // m
    pub inner_radius: f64, // m
    pub length: f64,       // m
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parachute {
    pub diameter: f64, // m
    pub cd: f64,
    #[serde(default = "default_packed_length")]
    pub packed_length: f64, // m
    #[serde(default)]
    pub deployment: Deployment,
}

fn default_packed_length() -> f64 {
    0.05
}

impl Parachute {
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.diameter * self.diameter / 4.0
    }
}

/// When a recovery device opens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub event: DeployEvent,
    #[serde(default)]
    pub delay: f64, // s
}

impl Default for Deployment {
    fn default() -> Self {
        Self { event: DeployEvent::Ejection, delay: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployEvent {
    Launch,
    /// Ejection charge of a motor in the same stage.
    Ejection,
    Apogee,
    /// Below the given altitude after apogee.
    Altitude(f64),
    /// Separation of the stage directly below.
    LowerStageSeparation,
    Never,
}
