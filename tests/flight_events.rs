use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use rocket_trajectory::io::FlightSummary;
use rocket_trajectory::physics::WindModel;
use rocket_trajectory::sim::{
    simulate, simulate_with_cancel, AbortCause, FlightData, FlightDataBranch, FlightDataType,
    FlightEventKind, SimulationOptions,
};
use rocket_trajectory::vehicle::{
    presets, Component, DeployEvent, Deployment, FinSet, FlightConfiguration, Motor, MotorLibrary,
    MotorMount, Rocket, RocketBuilder, StageBuilder, TransitionShape,
};
use rocket_trajectory::Warning;

fn run(rocket: &Rocket, config: &FlightConfiguration) -> FlightData {
    simulate(rocket, config, &presets::motors(), &SimulationOptions::default()).unwrap()
}

/// Event kinds of a branch, without the warnings interleaved among them.
fn kinds(branch: &FlightDataBranch) -> Vec<FlightEventKind> {
    branch
        .events()
        .iter()
        .map(|e| e.kind)
        .filter(|&k| k != FlightEventKind::SimWarn)
        .collect()
}

fn event_time(branch: &FlightDataBranch, kind: FlightEventKind) -> f64 {
    branch.first_event(kind).map(|e| e.time).unwrap_or(f64::NAN)
}

fn check_invariants(branch: &FlightDataBranch) {
    let events = branch.events();
    for pair in events.windows(2) {
        assert!(pair[0].time <= pair[1].time, "{} listed after {}", pair[1], pair[0]);
    }
    assert!(branch.is_sealed(), "branch {} left open", branch.name());

    if let Some(pos) = events.iter().position(|e| e.kind == FlightEventKind::SimAbort) {
        assert_eq!(pos, events.len() - 1, "SIM_ABORT is not the last event");
        let abort_time = events[pos].time;
        let last_sample = branch.last(FlightDataType::Time).unwrap();
        assert!(
            last_sample <= abort_time + 1e-12,
            "sample at {last_sample} after abort at {abort_time}"
        );
    }

    let steps = branch.get(FlightDataType::TimeStep).unwrap();
    let (last, rest) = steps.split_last().unwrap();
    assert!(last.is_nan());
    assert!(rest.iter().all(|dt| dt.is_finite() && *dt > 0.0));

    for ty in branch.types().filter(|&ty| ty != FlightDataType::TimeStep) {
        let column = branch.get(ty).unwrap();
        let missing = column.iter().filter(|v| !v.is_finite()).count();
        assert_eq!(
            missing,
            0,
            "{ty} has {missing} of {} values missing in {}",
            column.len(),
            branch.name()
        );
    }
}

/// The headline numbers of two runs agree within 5%.
fn assert_same_flight(a: &FlightDataBranch, b: &FlightDataBranch) {
    let (a, b) = (FlightSummary::from_branch(a), FlightSummary::from_branch(b));
    let close = |name: &str, x: f64, y: f64| {
        assert!((x - y).abs() <= 0.05 * x.abs().max(y.abs()), "{name}: {x} vs {y}");
    };
    let close_opt = |name: &str, x: Option<f64>, y: Option<f64>| match (x, y) {
        (Some(x), Some(y)) => close(name, x, y),
        (x, y) => assert_eq!(x.is_some(), y.is_some(), "{name}: {x:?} vs {y:?}"),
    };
    close("max altitude", a.apogee_m, b.apogee_m);
    close("max velocity", a.max_velocity_ms, b.max_velocity_ms);
    close("max Mach", a.max_mach, b.max_mach);
    close("flight time", a.flight_time_s, b.flight_time_s);
    close_opt("time to apogee", a.apogee_time_s, b.apogee_time_s);
    close_opt("launch rod velocity", a.rod_clearance_velocity_ms, b.rod_clearance_velocity_ms);
    close_opt("deployment velocity", a.deployment_velocity_ms, b.deployment_velocity_ms);
}

/// Sparrow airframe with its motor, parachute and ballast chosen by the test.
fn sparrow_variant(mount: MotorMount, deployment: Deployment, ballast: f64, fins: bool) -> Rocket {
    let mut tube = Component::body_tube("Body tube", 0.254, 0.0124, 0.0120)
        .with_mass(0.012)
        .with_motor_mount(mount)
        .with_child(
            Component::parachute("Parachute", 0.3, 0.8, deployment)
                .at(0.02)
                .with_mass(0.01),
        );
    if fins {
        let fins = FinSet::trapezoidal(3, 0.05, 0.025, 0.025, 0.045, 0.0024);
        tube = tube.with_child(Component::fin_set("Fins", fins).at(0.204).with_mass(0.008));
    }
    if ballast > 0.0 {
        tube = tube.with_child(Component::mass_object("Ballast", 0.02).at(0.22).with_mass(ballast));
    }
    let nose =
        Component::nose_cone("Nose cone", TransitionShape::Ogive, 0.07, 0.0124).with_mass(0.006);
    RocketBuilder::new("Sparrow variant")
        .stage(StageBuilder::new("Sustainer").component(nose).component(tube).build())
        .build()
}

fn ejection_deployment() -> Deployment {
    Deployment { event: DeployEvent::Ejection, delay: 0.0 }
}

// ---------------------------------------------------------------------------
// Single stage
// ---------------------------------------------------------------------------

#[test]
fn single_stage_event_order() {
    let rocket = presets::sparrow();
    let data = run(&rocket, &FlightConfiguration::new(&rocket));
    assert!(!data.cancelled);
    assert_eq!(data.branches.len(), 1);
    let branch = data.root().unwrap();

    use FlightEventKind::*;
    assert_eq!(
        kinds(branch),
        vec![
            Launch,
            Ignition,
            Liftoff,
            LaunchRod,
            Burnout,
            EjectionCharge,
            RecoveryDeviceDeployment,
            Apogee,
            GroundHit,
            SimulationEnd
        ]
    );
    assert_eq!(event_time(branch, Launch), 0.0);
    assert_eq!(event_time(branch, Ignition), 0.0);
    assert_relative_eq!(event_time(branch, Burnout), 2.0, epsilon = 1e-9);
    assert_relative_eq!(event_time(branch, EjectionCharge), 2.0, epsilon = 1e-9);
    assert_relative_eq!(event_time(branch, RecoveryDeviceDeployment), 2.001, epsilon = 1e-9);
    assert!(event_time(branch, Liftoff) < event_time(branch, LaunchRod));
    assert!(event_time(branch, Apogee) > 2.001);
    // the Sky-C preset's own times, with the reference tolerances
    assert_abs_diff_eq!(event_time(branch, Liftoff), 0.05, epsilon = 0.01);
    assert_abs_diff_eq!(event_time(branch, LaunchRod), 0.158, epsilon = 0.01);
    assert_abs_diff_eq!(event_time(branch, Apogee), 2.54, epsilon = 0.25);
    assert_abs_diff_eq!(event_time(branch, GroundHit), 40.37, epsilon = 0.25);
    check_invariants(branch);
}

#[test]
fn single_stage_flight_is_plausible() {
    let rocket = presets::sparrow();
    let data = run(&rocket, &FlightConfiguration::new(&rocket));
    let branch = data.root().unwrap();

    let apogee = branch.max(FlightDataType::Altitude).unwrap();
    assert!(apogee > 20.0 && apogee < 1000.0, "apogee {apogee}");
    assert!(branch.max(FlightDataType::Thrust).unwrap() > 10.0);
    // parachute descent ends well below the ballistic impact speed
    let landing = event_time(branch, FlightEventKind::GroundHit);
    let descent = branch.value_at(FlightDataType::TotalVelocity, landing).unwrap();
    assert!(descent < 15.0, "landing speed {descent}");
    assert_eq!(branch.last(FlightDataType::Altitude), Some(0.0));
}

#[test]
fn burnout_precedes_ejection_in_every_branch() {
    let rocket = presets::sparrow_duo();
    let data = run(&rocket, &FlightConfiguration::new(&rocket));
    for branch in &data.branches {
        check_invariants(branch);
        let ejections =
            branch.events().iter().filter(|e| e.kind == FlightEventKind::EjectionCharge);
        for ejection in ejections {
            let stage = ejection.stage();
            let burnout = branch
                .events()
                .iter()
                .find(|e| e.kind == FlightEventKind::Burnout && e.stage() == stage)
                .unwrap_or_else(|| panic!("no burnout before {ejection}"));
            assert!(burnout.time <= ejection.time);
        }
    }
}

// ---------------------------------------------------------------------------
// Aborts and cancellation
// ---------------------------------------------------------------------------

#[test]
fn missing_motor_aborts_at_launch() {
    let rocket = presets::sparrow();
    let config = FlightConfiguration::new(&rocket);
    let data =
        simulate(&rocket, &config, &MotorLibrary::new(), &SimulationOptions::default()).unwrap();
    let branch = data.root().unwrap();

    assert_eq!(data.abort_cause(), Some(AbortCause::NoMotorsDefined));
    assert!(data.warnings.contains(&Warning::MissingMotor { motor: presets::SKY_C.into() }));
    assert_eq!(branch.len(), 1);
    check_invariants(branch);
}

#[test]
fn no_active_stages_aborts() {
    let rocket = presets::sparrow();
    let mut config = FlightConfiguration::new(&rocket);
    config.set_stage_active(0, false);
    let data = run(&rocket, &config);
    assert_eq!(data.abort_cause(), Some(AbortCause::NoActiveStages));
    check_invariants(data.root().unwrap());
}

#[test]
fn cancelled_run_keeps_recorded_data() {
    let rocket = presets::sparrow();
    let config = FlightConfiguration::new(&rocket);
    let cancel = Arc::new(AtomicBool::new(true));
    let options = SimulationOptions::default();
    let data = simulate_with_cancel(&rocket, &config, &presets::motors(), &options, cancel)
        .unwrap();
    let branch = data.root().unwrap();

    assert!(data.cancelled);
    assert!(branch.is_sealed());
    assert!(branch.terminal_event().is_none());
    assert_eq!(branch.len(), 1);
}

#[test]
fn invalid_options_are_rejected() {
    let rocket = presets::sparrow();
    let options = SimulationOptions::default().time_step(-1.0);
    let config = FlightConfiguration::new(&rocket);
    let result = simulate(&rocket, &config, &presets::motors(), &options);
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Multi-stage branches
// ---------------------------------------------------------------------------

#[test]
fn two_stage_flight_forks_booster_branch() {
    let rocket = presets::sparrow_duo();
    let data = run(&rocket, &FlightConfiguration::new(&rocket));

    let names: Vec<&str> = data.branches.iter().map(|b| b.name()).collect();
    assert_eq!(names, vec!["Sustainer", "Booster"]);

    let sustainer = data.branch("Sustainer").unwrap();
    let booster = data.branch("Booster").unwrap();
    let separation = event_time(sustainer, FlightEventKind::StageSeparation);
    assert_relative_eq!(separation, 2.0, epsilon = 1e-9);
    assert_relative_eq!(event_time(booster, FlightEventKind::StageSeparation), separation);

    // the booster carries the shared history up to separation
    assert_eq!(booster.get(FlightDataType::Time).unwrap()[0], 0.0);
    assert!(booster.first_event(FlightEventKind::Liftoff).is_some());

    // two ignitions above, one below
    let ignitions = |b: &FlightDataBranch| {
        b.events().iter().filter(|e| e.kind == FlightEventKind::Ignition).count()
    };
    assert_eq!(ignitions(sustainer), 2);
    assert_eq!(ignitions(booster), 2);

    for branch in &data.branches {
        assert!(branch.terminal_event().is_some(), "{} has no terminal event", branch.name());
        check_invariants(branch);
    }
    let apogee = |b: &FlightDataBranch| b.max(FlightDataType::Altitude).unwrap();
    assert!(apogee(sustainer) > apogee(booster));
}

#[test]
fn re_enabling_stages_reproduces_full_run() {
    let rocket = presets::sparrow_duo();
    let full = run(&rocket, &FlightConfiguration::new(&rocket));

    let mut config = FlightConfiguration::new(&rocket);
    config.set_stage_active(1, false);
    let reduced = run(&rocket, &config);
    assert_eq!(reduced.branches.len(), 1);

    config.set_all_stages();
    let again = run(&rocket, &config);

    assert_eq!(full.branches.len(), again.branches.len());
    for (a, b) in full.branches.iter().zip(&again.branches) {
        assert_eq!(a.name(), b.name());
        assert_same_flight(a, b);
    }
}

#[test]
fn removed_stage_matches_inactive_stage() {
    let rocket = presets::sparrow_duo();
    let mut inactive = FlightConfiguration::new(&rocket);
    inactive.set_stage_active(1, false);
    let with_inactive = run(&rocket, &inactive);

    let mut trimmed = rocket.clone();
    trimmed.stages.truncate(1);
    let with_removed = run(&trimmed, &FlightConfiguration::new(&trimmed));

    assert_eq!(with_inactive.branches.len(), 1);
    assert_eq!(with_removed.branches.len(), 1);
    let a = with_inactive.root().unwrap();
    let b = with_removed.root().unwrap();
    assert_same_flight(a, b);
    assert_relative_eq!(
        event_time(a, FlightEventKind::Apogee),
        event_time(b, FlightEventKind::Apogee),
        max_relative = 0.05
    );
    check_invariants(a);
    check_invariants(b);
}

// ---------------------------------------------------------------------------
// Aborts and warnings during flight
// ---------------------------------------------------------------------------

#[test]
fn deployment_while_burning_aborts() {
    let launch = Deployment { event: DeployEvent::Launch, delay: 0.0 };
    let mount = MotorMount::new(presets::SKY_C).ejection_delay(None);
    let rocket = sparrow_variant(mount, launch, 0.0, true);
    let data = run(&rocket, &FlightConfiguration::new(&rocket));
    let branch = data.root().unwrap();

    assert_eq!(data.abort_cause(), Some(AbortCause::DeployUnderThrust));
    let deployment = event_time(branch, FlightEventKind::RecoveryDeviceDeployment);
    assert_relative_eq!(deployment, 0.001, epsilon = 1e-9);
    assert!(event_time(branch, FlightEventKind::SimAbort) >= deployment);
    check_invariants(branch);
}

#[test]
fn unstable_rocket_tumbling_under_thrust_aborts() {
    // flat thrust from the first instant, no fins and a heavy tail
    let boost = Motor {
        designation: "Boost".into(),
        diameter: 0.018,
        length: 0.07,
        total_mass: 0.03,
        propellant_mass: 0.01,
        thrust_curve: vec![(0.0, 20.0), (1.0, 20.0), (1.01, 0.0)],
    };
    let motors = MotorLibrary::new().with("Boost", boost);
    let mount = MotorMount::new("Boost").ejection_delay(None);
    let rocket = sparrow_variant(mount, ejection_deployment(), 0.1, false);
    let wind = WindModel::Constant { speed: 5.0, direction: 0.0 };
    let options = SimulationOptions::default().wind(wind);
    let data = simulate(&rocket, &FlightConfiguration::new(&rocket), &motors, &options).unwrap();
    let branch = data.root().unwrap();

    assert_eq!(data.abort_cause(), Some(AbortCause::TumbleUnderThrust));
    assert!(branch.first_event(FlightEventKind::Tumble).is_none());
    check_invariants(branch);
}

#[test]
fn motor_too_weak_to_lift_aborts_at_burnout() {
    let rocket = sparrow_variant(MotorMount::new(presets::SKY_C), ejection_deployment(), 2.0, true);
    let data = run(&rocket, &FlightConfiguration::new(&rocket));
    let branch = data.root().unwrap();

    assert_eq!(data.abort_cause(), Some(AbortCause::NoLiftoff));
    assert!(branch.first_event(FlightEventKind::Liftoff).is_none());
    assert_relative_eq!(event_time(branch, FlightEventKind::Burnout), 2.0, epsilon = 1e-9);
    assert_relative_eq!(event_time(branch, FlightEventKind::SimAbort), 2.0, epsilon = 1e-9);
    assert_eq!(branch.max(FlightDataType::Altitude), Some(0.0));
    check_invariants(branch);
}

#[test]
fn time_limit_ends_the_flight() {
    let rocket = presets::sparrow();
    let options = SimulationOptions::default().max_time(5.0);
    let config = FlightConfiguration::new(&rocket);
    let data = simulate(&rocket, &config, &presets::motors(), &options).unwrap();
    let branch = data.root().unwrap();

    let end = branch.terminal_event().unwrap();
    assert_eq!(end.kind, FlightEventKind::SimulationEnd);
    assert!(end.time > 5.0 && end.time < 6.0, "ended at {}", end.time);
    assert!(branch.first_event(FlightEventKind::GroundHit).is_none());
    assert!(data.warnings.contains(&Warning::MaxTimeReached { time: 5.0 }));
    let warned_at_end = branch
        .events()
        .iter()
        .any(|e| e.kind == FlightEventKind::SimWarn && e.time == end.time);
    assert!(warned_at_end);
    check_invariants(branch);
}

#[test]
fn fast_deployment_warns() {
    // ejection disabled; the parachute opens while still climbing fast
    let late = Deployment { event: DeployEvent::Launch, delay: 2.3 };
    let mount = MotorMount::new(presets::SKY_C).ejection_delay(None);
    let rocket = sparrow_variant(mount, late, 0.0, true);
    let data = run(&rocket, &FlightConfiguration::new(&rocket));
    let branch = data.root().unwrap();

    let deployed = event_time(branch, FlightEventKind::RecoveryDeviceDeployment);
    assert_relative_eq!(deployed, 2.3, epsilon = 1e-9);
    let speed = data.warnings.iter().find_map(|w| match w {
        Warning::HighSpeedDeployment { speed } => Some(*speed),
        _ => None,
    });
    assert!(speed.is_some_and(|v| v > 20.0), "speed {speed:?}");
    assert!(branch.events().iter().any(|e| e.kind == FlightEventKind::SimWarn));
    assert!(data.abort_cause().is_none());
    assert_eq!(branch.terminal_event().map(|e| e.kind), Some(FlightEventKind::SimulationEnd));
    check_invariants(branch);
}
