use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nalgebra::Vector3;

use super::data::FlightDataBranch;
use super::event::{EventQueue, EventSource};
use super::options::SimulationOptions;
use crate::aero::BarrowmanCalculator;
use crate::dynamics::RigidState;
use crate::vehicle::mass::{motor_body, structure_mass};
use crate::vehicle::{
    ComponentId, FlightConfiguration, IgnitionEvent, Motor, PlacedMotor, RigidBody, RocketLayout,
    ThrustCurve,
};
use crate::warning::WarningSet;

// ---------------------------------------------------------------------------
// Read-only data shared by every branch of a run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub layout: Arc<RocketLayout>,
    pub aero: Arc<BarrowmanCalculator>,
    pub options: Arc<SimulationOptions>,
    pub cancel: Arc<AtomicBool>,
}

impl SimulationContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Motor cluster state
// ---------------------------------------------------------------------------

/// One motor mount's cluster during a flight.
#[derive(Debug, Clone)]
pub struct MotorClusterState {
    /// Index into the layout's motor list.
    pub index: usize,
    pub mount: ComponentId,
    pub stage: usize,
    pub motor: Arc<Motor>,
    pub ignition: IgnitionEvent,
    pub ignition_delay: f64, // s
    pub ejection_delay: Option<f64>, // s
    pub count: usize,
    pub x_aft: f64, // m
    pub curve: ThrustCurve,
    pub ignition_time: Option<f64>,
    pub burnout_time: Option<f64>,
}

impl MotorClusterState {
    pub fn new(index: usize, placed: &PlacedMotor, motor: Arc<Motor>) -> Self {
        let curve = motor.curve();
        Self {
            index,
            mount: placed.mount,
            stage: placed.stage,
            motor,
            ignition: placed.spec.ignition,
            ignition_delay: placed.spec.ignition_delay,
            ejection_delay: placed.spec.ejection_delay,
            count: placed.spec.cluster_count,
            x_aft: placed.x_aft,
            curve,
            ignition_time: None,
            burnout_time: None,
        }
    }

    pub fn source(&self) -> EventSource {
        EventSource::Motor { index: self.index, stage: self.stage }
    }

    pub fn is_ignited(&self) -> bool {
        self.ignition_time.is_some()
    }

    /// Lit and not yet burnt out.
    pub fn is_burning(&self) -> bool {
        self.ignition_time.is_some() && self.burnout_time.is_none()
    }

    pub fn burn_time(&self) -> f64 {
        self.curve.burn_time()
    }

    pub fn ignite(&mut self, time: f64) {
        self.ignition_time = Some(time);
    }

    pub fn burn_out(&mut self, time: f64) {
        self.burnout_time = Some(time);
    }

    /// Thrust (N) of the whole cluster.
    pub fn thrust(&self, time: f64) -> f64 {
        match self.ignition_time {
            Some(t0) => self.count as f64 * self.curve.thrust(time - t0),
            None => 0.0,
        }
    }

    /// Mass properties of the whole cluster.
    pub fn body(&self, time: f64) -> RigidBody {
        let elapsed = self.ignition_time.map_or(0.0, |t0| time - t0);
        let mass = self.count as f64 * self.motor.mass_after(self.curve.burnt_fraction(elapsed));
        motor_body(&self.motor, mass, self.x_aft)
    }
}

// ---------------------------------------------------------------------------
// Simulation status of one branch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimulationStatus {
    pub state: RigidState,
    pub config: FlightConfiguration,
    pub motors: Vec<MotorClusterState>,
    pub queue: EventQueue,
    pub data: FlightDataBranch,
    pub warnings: WarningSet,
    /// Where this branch started; liftoff is measured from here.
    pub origin: Vector3<f64>,
    pub origin_velocity: Vector3<f64>,
    pub liftoff: bool,
    pub rod_cleared: bool,
    pub apogee_reached: bool,
    pub motor_ignited: bool,
    pub tumbling: bool,
    pub landed: bool,
    pub deployed: Vec<ComponentId>,
    pub max_altitude: f64, // m
    pub max_altitude_time: f64, // s
    /// Length of the last RK4 step.
    pub previous_time_step: f64, // s
    /// CP of the last evaluation that had one.
    pub last_cp: Option<f64>, // m
}

impl SimulationStatus {
    pub fn new(
        name: impl Into<String>,
        config: FlightConfiguration,
        motors: Vec<MotorClusterState>,
        options: &SimulationOptions,
    ) -> Self {
        let state = RigidState::on_pad(&options.rod_direction());
        Self {
            origin: state.pos,
            origin_velocity: state.vel,
            state,
            config,
            motors,
            queue: EventQueue::new(),
            data: FlightDataBranch::new(name),
            warnings: WarningSet::new(),
            liftoff: false,
            rod_cleared: false,
            apogee_reached: false,
            motor_ignited: false,
            tumbling: false,
            landed: false,
            deployed: vec![],
            max_altitude: 0.0,
            max_altitude_time: 0.0,
            previous_time_step: options.time_step,
            last_cp: None,
        }
    }

    pub fn time(&self) -> f64 {
        self.state.time
    }

    /// Copy for a separated stage; history and queue come along.
    pub fn fork(&self, name: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.data = self.data.fork(name);
        child.warnings = WarningSet::new();
        child.origin = self.state.pos;
        child.origin_velocity = self.state.vel;
        child
    }

    pub fn active_motors(&self) -> impl Iterator<Item = &MotorClusterState> + '_ {
        self.motors.iter().filter(move |m| self.config.is_stage_active(m.stage))
    }

    pub fn thrust(&self, time: f64) -> f64 {
        self.active_motors().map(|m| m.thrust(time)).sum()
    }

    /// Structure plus motors of the active stages.
    pub fn mass(&self, layout: &RocketLayout, time: f64) -> RigidBody {
        self.active_motors()
            .map(|m| m.body(time))
            .fold(structure_mass(layout, &self.config), |acc, b| acc.add(&b))
    }

    /// Recovery devices that are open and still attached.
    pub fn active_deployed<'a>(
        &'a self,
        layout: &'a RocketLayout,
    ) -> impl Iterator<Item = ComponentId> + 'a {
        self.deployed.iter().copied().filter(move |&id| layout.is_active(id, &self.config))
    }
}
