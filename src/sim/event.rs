use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use serde::Serialize;

use crate::vehicle::ComponentId;
use crate::warning::Warning;

// ---------------------------------------------------------------------------
// Flight events
// ---------------------------------------------------------------------------

/// Kinds of flight events, in the order they normally occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightEventKind {
    Launch,
    Ignition,
    Liftoff,
    LaunchRod,
    Burnout,
    EjectionCharge,
    StageSeparation,
    RecoveryDeviceDeployment,
    Apogee,
    /// Descending through a deployment altitude; never recorded.
    Altitude,
    Tumble,
    GroundHit,
    SimulationEnd,
    SimWarn,
    SimAbort,
}

impl fmt::Display for FlightEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightEventKind::Launch => "LAUNCH",
            FlightEventKind::Ignition => "IGNITION",
            FlightEventKind::Liftoff => "LIFTOFF",
            FlightEventKind::LaunchRod => "LAUNCHROD",
            FlightEventKind::Burnout => "BURNOUT",
            FlightEventKind::EjectionCharge => "EJECTION_CHARGE",
            FlightEventKind::StageSeparation => "STAGE_SEPARATION",
            FlightEventKind::RecoveryDeviceDeployment => "RECOVERY_DEVICE_DEPLOYMENT",
            FlightEventKind::Apogee => "APOGEE",
            FlightEventKind::Altitude => "ALTITUDE",
            FlightEventKind::Tumble => "TUMBLE",
            FlightEventKind::GroundHit => "GROUND_HIT",
            FlightEventKind::SimulationEnd => "SIMULATION_END",
            FlightEventKind::SimWarn => "SIM_WARN",
            FlightEventKind::SimAbort => "SIM_ABORT",
        };
        f.write_str(name)
    }
}

/// What raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventSource {
    Stage(usize),
    Component { id: ComponentId, stage: usize },
    /// Index into the layout's motor list.
    Motor { index: usize, stage: usize },
}

impl EventSource {
    pub fn stage(&self) -> usize {
        match *self {
            EventSource::Stage(stage) => stage,
            EventSource::Component { stage, .. } | EventSource::Motor { stage, .. } => stage,
        }
    }
}

/// Why a branch was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbortCause {
    NoActiveStages,
    NoMotorsDefined,
    NoMotorsFired,
    /// A motor burnt out before the rocket left the pad.
    NoLiftoff,
    TumbleUnderThrust,
    DeployUnderThrust,
    ActiveLengthZero,
    NoCp,
    ActiveMassZero,
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AbortCause::NoActiveStages => "No stages are active",
            AbortCause::NoMotorsDefined => "No motors defined in the simulation",
            AbortCause::NoMotorsFired => "No motors fired; check ignition settings",
            AbortCause::NoLiftoff => "Motor burnout without liftoff",
            AbortCause::TumbleUnderThrust => "Stage began to tumble under thrust",
            AbortCause::DeployUnderThrust => "Recovery device deployment while motor still burning",
            AbortCause::ActiveLengthZero => "Active airframe has length 0",
            AbortCause::NoCp => "Total normal force coefficient is zero; no center of pressure",
            AbortCause::ActiveMassZero => "Total mass of active stages is 0",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventPayload {
    Abort(AbortCause),
    Warning(Warning),
    /// Altitude before and after a step (m).
    Altitude { from: f64, to: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightEvent {
    pub kind: FlightEventKind,
    pub time: f64, // s
    pub source: Option<EventSource>,
    pub payload: Option<EventPayload>,
}

impl FlightEvent {
    pub fn new(kind: FlightEventKind, time: f64) -> Self {
        Self { kind, time, source: None, payload: None }
    }

    pub fn with_source(mut self, source: EventSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn abort(cause: AbortCause, time: f64) -> Self {
        Self {
            payload: Some(EventPayload::Abort(cause)),
            ..Self::new(FlightEventKind::SimAbort, time)
        }
    }

    pub fn warning(warning: Warning, time: f64) -> Self {
        Self {
            payload: Some(EventPayload::Warning(warning)),
            ..Self::new(FlightEventKind::SimWarn, time)
        }
    }

    pub fn altitude(from: f64, to: f64, time: f64) -> Self {
        Self {
            payload: Some(EventPayload::Altitude { from, to }),
            ..Self::new(FlightEventKind::Altitude, time)
        }
    }

    /// Stage of the event's source, if it has one.
    pub fn stage(&self) -> Option<usize> {
        self.source.map(|s| s.stage())
    }

    pub fn abort_cause(&self) -> Option<AbortCause> {
        match self.payload {
            Some(EventPayload::Abort(cause)) => Some(cause),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, FlightEventKind::SimAbort | FlightEventKind::SimulationEnd)
    }
}

impl fmt::Display for FlightEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:.3}s", self.kind, self.time)?;
        if let Some(stage) = self.stage() {
            write!(f, " (stage {stage})")?;
        }
        match &self.payload {
            Some(EventPayload::Abort(cause)) => write!(f, ": {cause}"),
            Some(EventPayload::Warning(w)) => write!(f, ": {w}"),
            Some(EventPayload::Altitude { from, to }) => write!(f, ": {from:.2} -> {to:.2} m"),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Event queue: earliest first, FIFO among equal times
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Queued {
    time: f64,
    seq: u64,
    event: FlightEvent,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.total_cmp(&other.time).then(self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Queued>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: FlightEvent) {
        let queued = Queued { time: event.time, seq: self.next_seq, event };
        self.next_seq += 1;
        self.heap.push(Reverse(queued));
    }

    pub fn pop(&mut self) -> Option<FlightEvent> {
        self.heap.pop().map(|Reverse(q)| q.event)
    }

    pub fn peek(&self) -> Option<&FlightEvent> {
        self.heap.peek().map(|Reverse(q)| &q.event)
    }

    /// Pop the earliest event if it is due at or before `time`.
    pub fn pop_due(&mut self, time: f64) -> Option<FlightEvent> {
        match self.peek() {
            Some(e) if e.time <= time => self.pop(),
            _ => None,
        }
    }

    pub fn next_time(&self) -> Option<f64> {
        self.peek().map(|e| e.time)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
