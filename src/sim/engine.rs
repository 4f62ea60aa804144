use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::data::{FlightData, FlightDataBranch, FlightDataType};
use super::event::{AbortCause, EventPayload, EventSource, FlightEvent, FlightEventKind};
use super::options::SimulationOptions;
use super::status::{MotorClusterState, SimulationContext, SimulationStatus};
use super::stepper::{
    descent_drag_area, evaluate, flight_record, point_mass_loads, point_mass_record,
    step_point_mass, step_rk4,
};
use crate::aero::{BarrowmanCalculator, FlightConditions};
use crate::error::{Result, SimError};
use crate::math::EPSILON;
use crate::vehicle::{
    DeployEvent, Deployment, FlightConfiguration, IgnitionEvent, MotorLibrary, Rocket,
    RocketLayout, SeparationEvent,
};
use crate::warning::{Warning, WarningSet};

/// Liftoff is declared once the rocket has risen this far off the pad.
const LIFTOFF_HEIGHT: f64 = 0.02; // m
/// Descent below the peak that confirms apogee.
const APOGEE_MARGIN: f64 = 0.01; // m
const TUMBLE_AOA: f64 = 20.0; // deg
const TUMBLE_THRUST: f64 = 0.01; // N
const HIGH_SPEED_DEPLOYMENT: f64 = 20.0; // m/s
const MIN_DEPLOYMENT_DELAY: f64 = 0.001; // s
/// Step end times this close to an event are moved onto it.
const EVENT_SNAP: f64 = 1e-9; // s

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Result of one pass through the branch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Continue,
    BranchComplete(FlightEvent),
    Aborted(FlightEvent),
}

/// Simulate a flight from the pad until every branch lands or aborts.
pub fn simulate(
    rocket: &Rocket,
    config: &FlightConfiguration,
    motors: &MotorLibrary,
    options: &SimulationOptions,
) -> Result<FlightData> {
    simulate_with_cancel(rocket, config, motors, options, Arc::new(AtomicBool::new(false)))
}

/// Like [`simulate`], stopping early once `cancel` is set. Branches stopped
/// this way are sealed without a terminal event.
pub fn simulate_with_cancel(
    rocket: &Rocket,
    config: &FlightConfiguration,
    motors: &MotorLibrary,
    options: &SimulationOptions,
    cancel: Arc<AtomicBool>,
) -> Result<FlightData> {
    options.validate()?;
    if config.stage_count() != rocket.stage_count() {
        return Err(SimError::InvalidRocket(format!(
            "configuration has {} stages, rocket '{}' has {}",
            config.stage_count(),
            rocket.name,
            rocket.stage_count()
        )));
    }

    let layout = RocketLayout::new(rocket);
    let aero = BarrowmanCalculator::new(&layout)?;
    let ctx = SimulationContext {
        layout: Arc::new(layout),
        aero: Arc::new(aero),
        options: Arc::new(options.clone()),
        cancel,
    };

    let mut warnings = WarningSet::new();
    let mut clusters = Vec::new();
    for (index, placed) in ctx.layout.motors.iter().enumerate() {
        match motors.get(&placed.spec.motor) {
            Some(motor) => {
                clusters.push(MotorClusterState::new(index, placed, Arc::new(motor.clone())))
            }
            None => warnings.add(Warning::MissingMotor { motor: placed.spec.motor.clone() }),
        }
    }

    let name = config
        .active_stages()
        .next()
        .map_or_else(|| rocket.name.clone(), |s| ctx.layout.stage_names[s].clone());
    let mut status = SimulationStatus::new(name, config.clone(), clusters, options);
    status.warnings.extend(&warnings);

    if !config.has_active_stages() {
        status.queue.push(FlightEvent::abort(AbortCause::NoActiveStages, 0.0));
    }
    if status.active_motors().next().is_none() {
        status.queue.push(FlightEvent::abort(AbortCause::NoMotorsDefined, 0.0));
    }
    let has_recovery = ctx
        .layout
        .recovery_devices()
        .any(|(c, _)| ctx.layout.is_active(c.id, config));
    if !has_recovery {
        status.warnings.add(Warning::NoRecoveryDevice);
    }
    check_geometry(&ctx, &mut status);
    status.queue.push(FlightEvent::new(FlightEventKind::Launch, 0.0));

    info!(rocket = %rocket.name, stages = rocket.stage_count(), "simulation start");
    let output = run_branch(&ctx, status)?;
    for w in output.warnings.iter() {
        debug!(warning = %w, "simulation warning");
    }
    info!(branches = output.branches.len(), cancelled = output.cancelled, "simulation end");

    Ok(FlightData {
        branches: output.branches,
        warnings: output.warnings,
        cancelled: output.cancelled,
    })
}

// ---------------------------------------------------------------------------
// Branch loop
// ---------------------------------------------------------------------------

struct BranchOutput {
    branches: Vec<FlightDataBranch>,
    warnings: WarningSet,
    cancelled: bool,
}

/// Run one branch to completion, then its children in parallel.
fn run_branch(ctx: &SimulationContext, mut status: SimulationStatus) -> Result<BranchOutput> {
    info!(branch = status.data.name(), time = status.time(), "branch start");
    let mut children = Vec::new();
    let mut cancelled = false;

    loop {
        if ctx.is_cancelled() {
            info!(branch = status.data.name(), time = status.time(), "branch cancelled");
            finish(ctx, &mut status, None)?;
            cancelled = true;
            break;
        }
        match step_branch(ctx, &mut status, &mut children)? {
            StepOutcome::Continue => {}
            StepOutcome::BranchComplete(event) => {
                finish(ctx, &mut status, Some(event))?;
                break;
            }
            StepOutcome::Aborted(event) => {
                warn!(branch = status.data.name(), event = %event, "branch aborted");
                finish(ctx, &mut status, Some(event))?;
                break;
            }
        }
    }
    info!(
        branch = status.data.name(),
        time = status.time(),
        records = status.data.len(),
        "branch end"
    );

    let mut output = BranchOutput {
        branches: vec![status.data],
        warnings: status.warnings,
        cancelled,
    };
    let subtrees = children
        .into_par_iter()
        .map(|child| run_branch(ctx, child))
        .collect::<Result<Vec<_>>>()?;
    for sub in subtrees {
        output.branches.extend(sub.branches);
        output.warnings.extend(&sub.warnings);
        output.cancelled |= sub.cancelled;
    }
    Ok(output)
}

/// Handle due events, advance one step and look for new events.
fn step_branch(
    ctx: &SimulationContext,
    status: &mut SimulationStatus,
    children: &mut Vec<SimulationStatus>,
) -> Result<StepOutcome> {
    match handle_events(ctx, status, children)? {
        StepOutcome::Continue => {}
        outcome => return Ok(outcome),
    }

    let prev_time = status.time();
    let prev_altitude = status.state.pos.z;
    let max_step = status
        .queue
        .next_time()
        .map_or(f64::INFINITY, |t| (t - prev_time).max(ctx.options.min_time_step));

    let abort = if status.landed {
        if let Some(t) = status.queue.next_time() {
            status.state.time = t.max(prev_time);
        }
        None
    } else if status.tumbling || status.active_deployed(&ctx.layout).next().is_some() {
        let area = descent_drag_area(ctx, status);
        step_point_mass(ctx, status, max_step, area)?
    } else {
        step_rk4(ctx, status, max_step)?
    };
    if let Some(cause) = abort {
        return Ok(StepOutcome::Aborted(FlightEvent::abort(cause, status.time())));
    }

    if let Some(t) = status.queue.next_time() {
        if (t - status.time()).abs() < EVENT_SNAP {
            status.state.time = t;
        }
    }
    detect_events(ctx, status, prev_time, prev_altitude);
    Ok(StepOutcome::Continue)
}

/// Seal the branch after a last record of the current state.
fn finish(
    ctx: &SimulationContext,
    status: &mut SimulationStatus,
    terminal: Option<FlightEvent>,
) -> Result<()> {
    let mass = status.mass(&ctx.layout, status.time());
    let six_dof = !status.landed
        && !status.tumbling
        && status.active_deployed(&ctx.layout).next().is_none()
        && mass.mass > EPSILON
        && ctx.layout.reference_length(&status.config) > EPSILON;
    let record = if six_dof {
        let mut scratch = WarningSet::new();
        let eval = evaluate(ctx, status, &status.state, &mut scratch);
        flight_record(status, &eval, f64::NAN)
    } else {
        let loads = point_mass_loads(ctx, status, descent_drag_area(ctx, status));
        point_mass_record(status, &loads, f64::NAN)
    };
    status.data.push_record(record)?;
    match terminal {
        Some(mut event) => {
            event.time = event.time.max(status.time());
            status.data.add_event(event)
        }
        None => {
            status.data.seal();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Event handling
// ---------------------------------------------------------------------------

/// Next due event. While no motor has fired, time skips ahead to it.
fn next_event(status: &mut SimulationStatus) -> Option<FlightEvent> {
    let next = status.queue.next_time()?;
    if !status.motor_ignited && next > status.time() {
        status.state.time = next;
    }
    status.queue.pop_due(status.time())
}

/// Record a warning both in the branch's set and as a SIM_WARN event.
fn raise(status: &mut SimulationStatus, warning: Warning, time: f64) -> Result<()> {
    warn!(branch = status.data.name(), time, "{warning}");
    status.warnings.add(warning.clone());
    status.data.add_event(FlightEvent::warning(warning, time))
}

fn handle_events(
    ctx: &SimulationContext,
    status: &mut SimulationStatus,
    children: &mut Vec<SimulationStatus>,
) -> Result<StepOutcome> {
    while let Some(event) = next_event(status) {
        debug!(branch = status.data.name(), event = %event, "handling event");

        let bottom = status.config.bottom_stage();
        let ignitions: Vec<FlightEvent> = status
            .active_motors()
            .filter(|m| !m.is_ignited() && ignition_triggered(m.ignition, m.stage, bottom, &event))
            .map(|m| {
                FlightEvent::new(FlightEventKind::Ignition, status.time() + m.ignition_delay)
                    .with_source(m.source())
            })
            .collect();
        for e in ignitions {
            status.queue.push(e);
        }

        if let Some(stage) = event.stage() {
            if !status.config.is_stage_active(stage) {
                debug!(event = %event, "source stage inactive; ignored");
                continue;
            }
        }

        let bookkeeping =
            matches!(event.kind, FlightEventKind::Altitude | FlightEventKind::SimulationEnd);
        if status.landed && !bookkeeping {
            let warning = Warning::EventAfterLanding { event: event.kind.to_string() };
            raise(status, warning, event.time)?;
        }

        for stage in status.config.active_stages().filter(|&s| s > 0) {
            let separation = ctx.layout.separations[stage];
            if separation_triggered(separation.event, stage, &event) {
                let time = event.time + separation.delay;
                let e = FlightEvent::new(FlightEventKind::StageSeparation, time)
                    .with_source(EventSource::Stage(stage));
                status.queue.push(e);
            }
        }

        let deployments: Vec<FlightEvent> = ctx
            .layout
            .recovery_devices()
            .filter(|(c, _)| {
                ctx.layout.is_active(c.id, &status.config) && !status.deployed.contains(&c.id)
            })
            .filter(|(c, p)| {
                deployment_triggered(&p.deployment, c.stage, &event, status.apogee_reached)
            })
            .map(|(c, p)| {
                FlightEvent::new(
                    FlightEventKind::RecoveryDeviceDeployment,
                    event.time + p.deployment.delay.max(MIN_DEPLOYMENT_DELAY),
                )
                .with_source(EventSource::Component { id: c.id, stage: c.stage })
            })
            .collect();
        for e in deployments {
            status.queue.push(e);
        }

        match event.kind {
            FlightEventKind::Launch | FlightEventKind::EjectionCharge => {
                status.data.add_event(event)?;
            }

            FlightEventKind::Ignition => {
                let Some(EventSource::Motor { index, .. }) = event.source else { continue };
                let Some(motor) = status.motors.iter_mut().find(|m| m.index == index) else {
                    continue;
                };
                if motor.is_ignited() {
                    continue;
                }
                motor.ignite(event.time);
                let source = motor.source();
                let burnout = event.time + motor.burn_time();
                // thrust curve corners become step boundaries
                let corners: Vec<f64> = motor
                    .motor
                    .curve_times()
                    .filter(|&t| t > 0.0)
                    .map(|t| event.time + t)
                    .collect();
                status.motor_ignited = true;
                status.data.add_event(event)?;
                for t in corners {
                    status.queue.push(FlightEvent::new(FlightEventKind::Altitude, t));
                }
                let e = FlightEvent::new(FlightEventKind::Burnout, burnout).with_source(source);
                status.queue.push(e);
            }

            FlightEventKind::Liftoff => {
                status.liftoff = true;
                status.data.add_event(event)?;
            }

            FlightEventKind::LaunchRod => {
                status.rod_cleared = true;
                status.data.add_event(event)?;
            }

            FlightEventKind::Burnout => {
                if !status.liftoff {
                    status.data.add_event(event.clone())?;
                    let abort = FlightEvent::abort(AbortCause::NoLiftoff, event.time);
                    return Ok(StepOutcome::Aborted(abort));
                }
                let Some(EventSource::Motor { index, .. }) = event.source else { continue };
                if let Some(motor) = status.motors.iter_mut().find(|m| m.index == index) {
                    motor.burn_out(event.time);
                    if let Some(delay) = motor.ejection_delay {
                        let time = event.time + delay;
                        let e = FlightEvent::new(FlightEventKind::EjectionCharge, time)
                            .with_source(motor.source());
                        status.queue.push(e);
                    }
                }
                status.data.add_event(event)?;
            }

            FlightEventKind::StageSeparation => {
                let Some(stage) = event.stage() else { continue };
                if stage == 0 || !status.config.is_stage_active(stage - 1) {
                    continue;
                }
                let time = event.time;
                status.data.add_event(event)?;

                let config = &status.config;
                let lower_active = (stage..config.stage_count())
                    .filter(|&s| config.is_stage_active(s))
                    .count();
                if lower_active != 1 {
                    raise(status, Warning::SeparationOrder, time)?;
                }
                if !status.rod_cleared {
                    raise(status, Warning::EarlySeparation, time)?;
                }

                let mut child = status.fork(ctx.layout.stage_names[stage].clone());
                status.config.clear_stages_from(stage);
                child.config.clear_stages_above(stage);
                check_geometry(ctx, status);
                check_geometry(ctx, &mut child);
                info!(
                    parent = status.data.name(),
                    child = child.data.name(),
                    time = status.time(),
                    "stage separated"
                );
                children.push(child);
            }

            FlightEventKind::Apogee => {
                status.apogee_reached = true;
                status.data.add_event(event)?;
            }

            FlightEventKind::RecoveryDeviceDeployment => {
                let Some(EventSource::Component { id, .. }) = event.source else { continue };
                if !ctx.layout.is_active(id, &status.config) || status.deployed.contains(&id) {
                    continue;
                }
                let time = event.time;
                status.data.add_event(event)?;
                if status.active_motors().any(|m| m.is_burning()) {
                    let abort = FlightEvent::abort(AbortCause::DeployUnderThrust, time);
                    return Ok(StepOutcome::Aborted(abort));
                }
                if !status.rod_cleared {
                    raise(status, Warning::RecoveryLaunchRod, time)?;
                }
                let speed = status.state.vel.norm();
                if speed > HIGH_SPEED_DEPLOYMENT {
                    raise(status, Warning::HighSpeedDeployment { speed }, time)?;
                }
                status.liftoff = true;
                status.deployed.push(id);
            }

            FlightEventKind::GroundHit => {
                status.landed = true;
                status.data.add_event(event)?;
            }

            FlightEventKind::Tumble => {
                if status.landed || status.active_deployed(&ctx.layout).next().is_some() {
                    continue;
                }
                let thrust = status.data.last(FlightDataType::Thrust).unwrap_or(0.0);
                if thrust > TUMBLE_THRUST {
                    let abort = FlightEvent::abort(AbortCause::TumbleUnderThrust, event.time);
                    return Ok(StepOutcome::Aborted(abort));
                }
                status.tumbling = true;
                status.data.add_event(event)?;
            }

            FlightEventKind::SimulationEnd => return Ok(StepOutcome::BranchComplete(event)),
            FlightEventKind::SimAbort => return Ok(StepOutcome::Aborted(event)),

            FlightEventKind::SimWarn => {
                status.data.add_event(event)?;
            }

            FlightEventKind::Altitude => {}
        }
    }

    let time = status.time();
    if time > ctx.options.max_time {
        raise(status, Warning::MaxTimeReached { time: ctx.options.max_time }, time)?;
        let end = FlightEvent::new(FlightEventKind::SimulationEnd, time);
        return Ok(StepOutcome::BranchComplete(end));
    }
    if !status.motor_ignited {
        return Ok(StepOutcome::Aborted(FlightEvent::abort(AbortCause::NoMotorsFired, time)));
    }
    Ok(StepOutcome::Continue)
}

/// Whether `event` lights a motor of `stage` with the given ignition setting.
fn ignition_triggered(
    ignition: IgnitionEvent,
    stage: usize,
    bottom: Option<usize>,
    event: &FlightEvent,
) -> bool {
    let from_below = |kind| event.kind == kind && event.stage() == Some(stage + 1);
    match ignition {
        IgnitionEvent::Automatic if bottom == Some(stage) => event.kind == FlightEventKind::Launch,
        IgnitionEvent::Automatic => from_below(FlightEventKind::EjectionCharge),
        IgnitionEvent::Launch => event.kind == FlightEventKind::Launch,
        IgnitionEvent::EjectionCharge => from_below(FlightEventKind::EjectionCharge),
        IgnitionEvent::Burnout => from_below(FlightEventKind::Burnout),
        IgnitionEvent::Never => false,
    }
}

/// Whether `event` separates `stage` from the stages above.
fn separation_triggered(separation: SeparationEvent, stage: usize, event: &FlightEvent) -> bool {
    match separation {
        SeparationEvent::UpperIgnition => {
            event.kind == FlightEventKind::Ignition && event.stage() == Some(stage - 1)
        }
        SeparationEvent::Ejection => {
            event.kind == FlightEventKind::EjectionCharge && event.stage() == Some(stage)
        }
        SeparationEvent::Burnout => {
            event.kind == FlightEventKind::Burnout && event.stage() == Some(stage)
        }
        SeparationEvent::Launch => event.kind == FlightEventKind::Launch,
        SeparationEvent::Never => false,
    }
}

/// Whether `event` opens a recovery device of `stage`.
fn deployment_triggered(
    deployment: &Deployment,
    stage: usize,
    event: &FlightEvent,
    apogee_reached: bool,
) -> bool {
    match deployment.event {
        DeployEvent::Launch => event.kind == FlightEventKind::Launch,
        DeployEvent::Ejection => {
            event.kind == FlightEventKind::EjectionCharge && event.stage() == Some(stage)
        }
        DeployEvent::Apogee => event.kind == FlightEventKind::Apogee,
        DeployEvent::Altitude(h) => match event.payload {
            Some(EventPayload::Altitude { from, to }) => apogee_reached && from > h && to <= h,
            _ => false,
        },
        DeployEvent::LowerStageSeparation => {
            event.kind == FlightEventKind::StageSeparation && event.stage() == Some(stage + 1)
        }
        DeployEvent::Never => false,
    }
}

// ---------------------------------------------------------------------------
// Event detection
// ---------------------------------------------------------------------------

/// Queue the events implied by the step that just ended.
fn detect_events(
    ctx: &SimulationContext,
    status: &mut SimulationStatus,
    prev_time: f64,
    prev_altitude: f64,
) {
    let time = status.time();
    let z = status.state.pos.z;

    if !status.landed {
        status.queue.push(FlightEvent::altitude(prev_altitude, z, time));
    }
    if z > status.max_altitude {
        status.max_altitude = z;
        status.max_altitude_time = time;
    }

    let mut relative = status.state.pos - status.origin;
    if !status.liftoff {
        if relative.z < 0.0 {
            status.state.pos = status.origin;
            status.state.vel = status.origin_velocity;
            relative = Vector3::zeros();
        }
        if relative.z > LIFTOFF_HEIGHT {
            status.queue.push(FlightEvent::new(FlightEventKind::Liftoff, time));
        }
    } else if z < EPSILON && !status.landed {
        status.queue.push(FlightEvent::new(FlightEventKind::GroundHit, time));
    }

    if status.liftoff && !status.rod_cleared && relative.norm() > ctx.options.launch_rod_length {
        status.queue.push(FlightEvent::new(FlightEventKind::LaunchRod, time));
    }

    if !status.apogee_reached && z < status.max_altitude - APOGEE_MARGIN {
        status.queue.push(FlightEvent::new(FlightEventKind::Apogee, prev_time));
    }

    // only the six-degree-of-freedom phase can start tumbling
    let free_flight =
        !status.tumbling && !status.landed && status.active_deployed(&ctx.layout).next().is_none();
    if free_flight {
        let data = &status.data;
        let cg = data.last(FlightDataType::Cg);
        let cp = data.last(FlightDataType::Cp);
        let aoa = data.last(FlightDataType::AngleOfAttack);
        if let (Some(cg), Some(cp), Some(aoa)) = (cg, cp, aoa) {
            if cg > cp && aoa > TUMBLE_AOA {
                status.queue.push(FlightEvent::new(FlightEventKind::Tumble, time));
            }
        }
    }

    if status.landed && status.queue.is_empty() {
        status.queue.push(FlightEvent::new(FlightEventKind::SimulationEnd, time));
    }
}

/// Abort, or queue a tumble, when the active airframe cannot fly.
fn check_geometry(ctx: &SimulationContext, status: &mut SimulationStatus) {
    let time = status.time();
    if ctx.aero.aerodynamic_length(&status.config) < EPSILON {
        status.queue.push(FlightEvent::abort(AbortCause::ActiveLengthZero, time));
        return;
    }
    let ref_length = ctx.layout.reference_length(&status.config);
    let altitude = ctx.options.launch_altitude + status.state.pos.z;
    let atmosphere = ctx.options.atmosphere.conditions(altitude);
    let cp = ctx.aero.cp(&status.config, &FlightConditions::new(ref_length, atmosphere));
    if cp.weight.abs() < EPSILON {
        if status.config.is_stage_active(0) {
            status.queue.push(FlightEvent::abort(AbortCause::NoCp, time));
        } else {
            status.queue.push(FlightEvent::new(FlightEventKind::Tumble, time));
        }
    }
}
