pub mod component;
pub mod layout;
pub mod mass;
pub mod motor;
pub mod presets;
pub mod rocket;
pub mod stage;

pub use component::{
    BodyTube, Component, ComponentKind, DeployEvent, Deployment, FinCrossSection, FinSet, LaunchLug,
    Parachute, Transition, TransitionShape, TubeFinSet,
};
pub use layout::{ComponentId, PlacedComponent, PlacedMotor, RocketLayout};
pub use mass::RigidBody;
pub use motor::{IgnitionEvent, Motor, MotorLibrary, MotorMount, ThrustCurve};
pub use rocket::{FlightConfiguration, Rocket, RocketBuilder};
pub use stage::{SeparationEvent, Stage, StageBuilder, StageSeparation};
