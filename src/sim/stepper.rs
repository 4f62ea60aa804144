use nalgebra::Vector3;

use super::data::{DataRecord, FlightDataType};
use super::event::AbortCause;
use super::status::{SimulationContext, SimulationStatus};
use crate::aero::{AerodynamicForces, FlightConditions};
use crate::dynamics::{body_airspeed, derivatives, Deriv, Guide, Loads, RigidState};
use crate::error::{Result, SimError};
use crate::math::{pow2, EPSILON};
use crate::physics::gravity::gravity;
use crate::vehicle::RigidBody;
use crate::warning::WarningSet;

/// Largest roll angle change in one step.
const MAX_ROLL_STEP_ANGLE: f64 = 2.0 * 28.32 * std::f64::consts::PI / 180.0; // rad
const MAX_ROLL_RATE_CHANGE: f64 = 2.0 * std::f64::consts::PI / 180.0; // rad/s
const MAX_PITCH_YAW_CHANGE: f64 = 4.0 * std::f64::consts::PI / 180.0; // rad/s
/// Longest step under a parachute or while tumbling.
const RECOVERY_TIME_STEP: f64 = 0.5; // s
/// A shortened landing step closer than this to the ground lands.
const GROUND_SNAP: f64 = 0.001; // m

// ---------------------------------------------------------------------------
// Force evaluation
// ---------------------------------------------------------------------------

/// Everything computed at one evaluation of the equations of motion.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub deriv: Deriv,
    pub conditions: FlightConditions,
    pub forces: AerodynamicForces,
    pub mass: RigidBody,
    pub thrust: f64,  // N
    pub gravity: f64, // m/s^2
}

/// Evaluate forces and derivatives at a trial state.
pub fn evaluate(
    ctx: &SimulationContext,
    status: &SimulationStatus,
    state: &RigidState,
    warnings: &mut WarningSet,
) -> Evaluation {
    let options = &ctx.options;
    let altitude = state.pos.z + options.launch_altitude;
    let atmosphere = options.atmosphere.conditions(altitude);
    let wind = options.wind.velocity(state.pos.z);
    let airspeed = body_airspeed(state, &wind);

    let ref_length = ctx.layout.reference_length(&status.config);
    let conditions = FlightConditions::from_motion(ref_length, atmosphere, &airspeed, &state.omega);
    let mass = status.mass(&ctx.layout, state.time);
    let forces = ctx.aero.forces(&status.config, &conditions, mass.cg, warnings);
    let thrust = status.thrust(state.time);
    let g = gravity(altitude);

    let guide = Guide {
        liftoff: status.liftoff,
        rod_cleared: status.rod_cleared,
        rod_direction: options.rod_direction(),
    };
    let loads = Loads { conditions: &conditions, forces: &forces, mass, thrust, gravity: g };
    let deriv = derivatives(state, &loads, &guide);

    Evaluation { deriv, conditions, forces, mass, thrust, gravity: g }
}

// ---------------------------------------------------------------------------
// RK4 integration
// ---------------------------------------------------------------------------

/// Single RK4 step from a precomputed first slope.
pub fn rk4_step<F>(state: &RigidState, k1: &Deriv, dt: f64, mut f: F) -> RigidState
where
    F: FnMut(&RigidState) -> Deriv,
{
    let k2 = f(&state.apply(k1, dt * 0.5));
    let k3 = f(&state.apply(&k2, dt * 0.5));
    let k4 = f(&state.apply(&k3, dt));
    state.combine([k1, &k2, &k3, &k4], dt)
}

/// Step length for the six-degree-of-freedom phase. `max_step` is the time
/// to the next queued event.
pub fn rk4_time_step(
    ctx: &SimulationContext,
    status: &SimulationStatus,
    eval: &Evaluation,
    max_step: f64,
) -> f64 {
    let options = &ctx.options;
    let cond = &eval.conditions;
    let domega = &eval.deriv.domega;

    let mut dt = options.time_step;
    let mut limit = |v: f64| {
        if v.is_finite() && v > 0.0 {
            dt = dt.min(v);
        }
    };

    if !status.rod_cleared {
        limit(options.time_step / 5.0);
        let speed = status.state.vel.norm();
        if speed > EPSILON {
            limit(options.launch_rod_length / speed / 10.0);
        }
    }
    limit(options.max_angle_step / cond.lateral_pitch_rate());
    limit(MAX_ROLL_STEP_ANGLE / cond.roll_rate.abs());
    limit(MAX_ROLL_RATE_CHANGE / domega.z.abs());
    limit(MAX_PITCH_YAW_CHANGE / domega.x.abs().max(domega.y.abs()));
    limit(1.5 * status.previous_time_step);

    let mut dt = dt.max(options.min_time_step);
    // land exactly on the next event rather than just short of it
    if max_step.is_finite() && (dt > max_step || max_step - dt < dt / 20.0) {
        dt = max_step;
    }
    dt
}

/// Advance the six-degree-of-freedom phase by one step.
pub fn step_rk4(
    ctx: &SimulationContext,
    status: &mut SimulationStatus,
    max_step: f64,
) -> Result<Option<AbortCause>> {
    let mut warnings = WarningSet::new();
    let k1 = evaluate(ctx, status, &status.state, &mut warnings);
    if k1.mass.mass < EPSILON {
        return Ok(Some(AbortCause::ActiveMassZero));
    }

    let mut dt = rk4_time_step(ctx, status, &k1, max_step);
    let start = status.state.clone();
    let mut next = rk4_step(&start, &k1.deriv, dt, |s| {
        evaluate(ctx, status, s, &mut warnings).deriv
    });

    if status.liftoff && start.pos.z > 0.0 && next.pos.z < 0.0 {
        // shorten the step to end on the ground
        dt = (dt * start.pos.z / (start.pos.z - next.pos.z)).max(ctx.options.min_time_step);
        next = rk4_step(&start, &k1.deriv, dt, |s| evaluate(ctx, status, s, &mut warnings).deriv);
        if next.pos.z < GROUND_SNAP {
            next.pos.z = 0.0;
        }
    }

    if let Some(quantity) = next.non_finite() {
        return Err(SimError::NonFinite { time: start.time, quantity });
    }

    let record = flight_record(status, &k1, dt);
    status.data.push_record(record)?;
    if let Some(cp) = evaluated_cp(&k1.forces) {
        status.last_cp = Some(cp);
    }
    status.warnings.extend(&warnings);
    status.previous_time_step = dt;
    status.state = next;
    Ok(None)
}

// ---------------------------------------------------------------------------
// Point-mass descent under a parachute or tumbling
// ---------------------------------------------------------------------------

/// Drag area (m^2) of the open recovery devices still attached.
pub fn parachute_drag_area(ctx: &SimulationContext, status: &SimulationStatus) -> f64 {
    ctx.layout
        .recovery_devices()
        .filter(|(c, _)| status.active_deployed(&ctx.layout).any(|id| id == c.id))
        .map(|(_, p)| p.cd * p.area())
        .sum()
}

/// Drag area of the descending vehicle: its open parachutes, or the
/// tumbling airframe when none are open.
pub fn descent_drag_area(ctx: &SimulationContext, status: &SimulationStatus) -> f64 {
    if status.active_deployed(&ctx.layout).next().is_some() {
        parachute_drag_area(ctx, status)
    } else {
        ctx.aero.tumble_drag_area(&status.config)
    }
}

/// Forces on a point mass at the current state.
#[derive(Debug, Clone)]
pub struct PointMassLoads {
    pub conditions: FlightConditions,
    pub mass: RigidBody,
    pub drag_area: f64,      // m^2
    pub drag: f64,           // N
    pub gravity: f64,        // m/s^2
    pub accel: Vector3<f64>, // m/s^2, launch-site frame
}

pub fn point_mass_loads(
    ctx: &SimulationContext,
    status: &SimulationStatus,
    drag_area: f64,
) -> PointMassLoads {
    let options = &ctx.options;
    let state = &status.state;
    let altitude = state.pos.z + options.launch_altitude;
    let atmosphere = options.atmosphere.conditions(altitude);
    let wind = options.wind.velocity(state.pos.z);
    let airspeed = state.vel - wind;
    let speed = airspeed.norm();

    let ref_length = ctx.layout.reference_length(&status.config);
    let body = body_airspeed(state, &wind);
    let conditions =
        FlightConditions::from_motion(ref_length, atmosphere, &body, &Vector3::zeros());
    let mass = status.mass(&ctx.layout, state.time);

    let drag = 0.5 * conditions.atmosphere.density * pow2(speed) * drag_area;
    let g = gravity(altitude);
    let mut accel = if speed > 0.001 && mass.mass > EPSILON {
        airspeed * (-drag / (speed * mass.mass))
    } else {
        Vector3::zeros()
    };
    accel.z -= g;

    PointMassLoads { conditions, mass, drag_area, drag, gravity: g, accel }
}

/// Advance a descending point mass with the given drag area.
pub fn step_point_mass(
    ctx: &SimulationContext,
    status: &mut SimulationStatus,
    max_step: f64,
    drag_area: f64,
) -> Result<Option<AbortCause>> {
    let loads = point_mass_loads(ctx, status, drag_area);
    if loads.mass.mass < EPSILON {
        return Ok(Some(AbortCause::ActiveMassZero));
    }
    let accel = loads.accel;
    let state = &status.state;

    let min = ctx.options.min_time_step;
    let mut dt = RECOVERY_TIME_STEP;
    let a_abs = accel.norm();
    if a_abs > EPSILON {
        dt = dt.min(1.0 / a_abs);
    }
    if max_step < dt {
        dt = if max_step > min { max_step - min } else { max_step };
    }
    dt = dt.max(min);

    let (z, v, a) = (state.pos.z, state.vel.z, accel.z);
    let euler = |t: f64| (state.pos + state.vel * t + accel * (t * t / 2.0), state.vel + accel * t);
    let (mut pos, mut vel) = euler(dt);

    let mut landing = false;
    let shortened = if pos.z < 0.0 {
        // 1/2 a t^2 + v t + z = 0
        landing = true;
        Some(if a.abs() > EPSILON {
            (-v - (v * v - 2.0 * a * z).max(0.0).sqrt()) / a
        } else {
            -z / v
        })
    } else if v * vel.z < 0.0 && a.abs() > EPSILON {
        // apogee: v + a t = 0
        Some((v / a).abs())
    } else {
        None
    };
    if let Some(t) = shortened {
        let t = t.max(min);
        if (t - dt).abs() > EPSILON {
            dt = t;
            (pos, vel) = euler(dt);
        }
    }
    if landing && pos.z < GROUND_SNAP {
        pos.z = 0.0;
    }

    let record = point_mass_record(status, &loads, dt);
    let next = RigidState {
        time: status.state.time + dt,
        pos,
        vel,
        quat: status.state.quat,
        omega: Vector3::zeros(),
    };
    if let Some(quantity) = next.non_finite() {
        return Err(SimError::NonFinite { time: status.state.time, quantity });
    }
    status.data.push_record(record)?;
    status.previous_time_step = dt;
    status.state = next;
    Ok(None)
}

// ---------------------------------------------------------------------------
// Recorded values
// ---------------------------------------------------------------------------

/// Position, velocity and attitude of the current state.
fn kinematic_record(status: &SimulationStatus, mass: RigidBody, dt: f64) -> DataRecord {
    let s = &status.state;
    DataRecord::from([
        (FlightDataType::Time, s.time),
        (FlightDataType::TimeStep, dt),
        (FlightDataType::Altitude, s.pos.z),
        (FlightDataType::PositionX, s.pos.x),
        (FlightDataType::PositionY, s.pos.y),
        (FlightDataType::LateralDistance, s.pos.x.hypot(s.pos.y)),
        (FlightDataType::VelocityZ, s.vel.z),
        (FlightDataType::TotalVelocity, s.vel.norm()),
        (FlightDataType::Zenith, s.zenith().to_degrees()),
        (FlightDataType::Azimuth, s.azimuth().to_degrees()),
        (FlightDataType::Mass, mass.mass),
        (FlightDataType::Cg, mass.cg),
    ])
}

/// CP position and stability margin in calibers. Without a CP of its own
/// the last known one is kept, or the CG if there never was one.
fn cp_and_stability(
    status: &SimulationStatus,
    cp: Option<f64>,
    cg: f64,
    ref_length: f64) -> (f64, f64,
) {
    let cp = cp.or(status.last_cp).unwrap_or(cg);
    let stability = if ref_length > EPSILON { (cp - cg) / ref_length } else { 0.0 };
    (cp, stability)
}

/// CP of an aerodynamic evaluation, if the rocket produced any normal force
/// slope to place it.
pub fn evaluated_cp(forces: &AerodynamicForces) -> Option<f64> {
    (forces.cp.weight.abs() > EPSILON && forces.cp.x.is_finite()).then_some(forces.cp.x)
}

/// Full record for a six-degree-of-freedom evaluation.
pub fn flight_record(status: &SimulationStatus, eval: &Evaluation, dt: f64) -> DataRecord {
    let cond = &eval.conditions;
    let forces = &eval.forces;
    let mut record = kinematic_record(status, eval.mass, dt);

    let (cp, stability) =
        cp_and_stability(status, evaluated_cp(forces), eval.mass.cg, cond.ref_length);
    let accel = &eval.deriv.dvel;
    record.extend([
        (FlightDataType::AccelerationZ, accel.z),
        (FlightDataType::TotalAcceleration, accel.norm()),
        (FlightDataType::Mach, cond.mach),
        (FlightDataType::AngleOfAttack, cond.aoa.to_degrees()),
        (FlightDataType::RollRate, cond.roll_rate),
        (FlightDataType::PitchRate, cond.pitch_rate),
        (FlightDataType::Thrust, eval.thrust),
        (FlightDataType::Cp, cp),
        (FlightDataType::Stability, stability),
        (FlightDataType::DragCoefficient, forces.cd),
        (FlightDataType::AxialDragCoefficient, forces.cd_axial),
        (FlightDataType::NormalForceCoefficient, forces.cn),
        (FlightDataType::PitchMomentCoefficient, forces.cm),
        (FlightDataType::DragForce, forces.cd * cond.dynamic_pressure() * cond.ref_area),
        (FlightDataType::Gravity, eval.gravity),
        (FlightDataType::AirDensity, cond.atmosphere.density),
        (FlightDataType::ReferenceLength, cond.ref_length),
    ]);
    record
}

/// Full record for a point mass. Drag is purely axial; there is no normal
/// force, pitching moment or rotation.
pub fn point_mass_record(status: &SimulationStatus, loads: &PointMassLoads, dt: f64) -> DataRecord {
    let cond = &loads.conditions;
    let mut record = kinematic_record(status, loads.mass, dt);

    let cd = if cond.ref_area > EPSILON { loads.drag_area / cond.ref_area } else { 0.0 };
    let (cp, stability) = cp_and_stability(status, None, loads.mass.cg, cond.ref_length);
    record.extend([
        (FlightDataType::AccelerationZ, loads.accel.z),
        (FlightDataType::TotalAcceleration, loads.accel.norm()),
        (FlightDataType::Mach, cond.mach),
        (FlightDataType::AngleOfAttack, cond.aoa.to_degrees()),
        (FlightDataType::RollRate, 0.0),
        (FlightDataType::PitchRate, 0.0),
        (FlightDataType::Thrust, status.thrust(status.state.time)),
        (FlightDataType::Cp, cp),
        (FlightDataType::Stability, stability),
        (FlightDataType::DragCoefficient, cd),
        (FlightDataType::AxialDragCoefficient, cd),
        (FlightDataType::NormalForceCoefficient, 0.0),
        (FlightDataType::PitchMomentCoefficient, 0.0),
        (FlightDataType::DragForce, loads.drag),
        (FlightDataType::Gravity, loads.gravity),
        (FlightDataType::AirDensity, cond.atmosphere.density),
        (FlightDataType::ReferenceLength, cond.ref_length),
    ]);
    record
}
