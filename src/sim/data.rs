use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::event::{AbortCause, FlightEvent, FlightEventKind};
use crate::error::{Result, SimError};
use crate::warning::WarningSet;

// ---------------------------------------------------------------------------
// Recorded quantities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FlightDataType {
    Time,
    TimeStep,
    Altitude,
    PositionX,
    PositionY,
    LateralDistance,
    VelocityZ,
    TotalVelocity,
    AccelerationZ,
    TotalAcceleration,
    Mach,
    AngleOfAttack,
    RollRate,
    PitchRate,
    Zenith,
    Azimuth,
    Mass,
    Thrust,
    Cg,
    Cp,
    Stability,
    DragCoefficient,
    AxialDragCoefficient,
    NormalForceCoefficient,
    PitchMomentCoefficient,
    DragForce,
    Gravity,
    AirDensity,
    ReferenceLength,
}

impl FlightDataType {
    /// Column name with unit, as written to CSV.
    pub fn label(&self) -> &'static str {
        match self {
            FlightDataType::Time => "time_s",
            FlightDataType::TimeStep => "time_step_s",
            FlightDataType::Altitude => "altitude_m",
            FlightDataType::PositionX => "position_east_m",
            FlightDataType::PositionY => "position_north_m",
            FlightDataType::LateralDistance => "lateral_distance_m",
            FlightDataType::VelocityZ => "vertical_velocity_ms",
            FlightDataType::TotalVelocity => "total_velocity_ms",
            FlightDataType::AccelerationZ => "vertical_acceleration_ms2",
            FlightDataType::TotalAcceleration => "total_acceleration_ms2",
            FlightDataType::Mach => "mach",
            FlightDataType::AngleOfAttack => "aoa_deg",
            FlightDataType::RollRate => "roll_rate_rads",
            FlightDataType::PitchRate => "pitch_rate_rads",
            FlightDataType::Zenith => "zenith_deg",
            FlightDataType::Azimuth => "azimuth_deg",
            FlightDataType::Mass => "mass_kg",
            FlightDataType::Thrust => "thrust_n",
            FlightDataType::Cg => "cg_m",
            FlightDataType::Cp => "cp_m",
            FlightDataType::Stability => "stability_cal",
            FlightDataType::DragCoefficient => "cd",
            FlightDataType::AxialDragCoefficient => "cd_axial",
            FlightDataType::NormalForceCoefficient => "cn",
            FlightDataType::PitchMomentCoefficient => "cm",
            FlightDataType::DragForce => "drag_n",
            FlightDataType::Gravity => "gravity_ms2",
            FlightDataType::AirDensity => "air_density_kgm3",
            FlightDataType::ReferenceLength => "reference_length_m",
        }
    }
}

impl fmt::Display for FlightDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One recorded sample: a value per data type.
pub type DataRecord = BTreeMap<FlightDataType, f64>;

// ---------------------------------------------------------------------------
// Flight data branch
// ---------------------------------------------------------------------------

/// Time series and events of one leg of a flight.
///
/// Every column has a value at every record; types missing from a record
/// are filled with NaN. Once a terminal event is added the branch is sealed.
#[derive(Debug, Clone, Serialize)]
pub struct FlightDataBranch {
    name: String,
    columns: BTreeMap<FlightDataType, Vec<f64>>,
    len: usize,
    events: Vec<FlightEvent>,
    sealed: bool,
}

impl FlightDataBranch {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), columns: BTreeMap::new(), len: 0, events: vec![], sealed: false }
    }

    /// Copy of this branch's history under a new name, open for recording.
    pub fn fork(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), sealed: false, ..self.clone() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn push_record(&mut self, record: DataRecord) -> Result<()> {
        if self.sealed {
            return Err(SimError::SealedBranch(self.name.clone()));
        }
        for ty in record.keys() {
            if !self.columns.contains_key(ty) {
                self.columns.insert(*ty, vec![f64::NAN; self.len]);
            }
        }
        for (ty, column) in self.columns.iter_mut() {
            column.push(record.get(ty).copied().unwrap_or(f64::NAN));
        }
        self.len += 1;
        Ok(())
    }

    pub fn add_event(&mut self, event: FlightEvent) -> Result<()> {
        if self.sealed {
            return Err(SimError::SealedBranch(self.name.clone()));
        }
        if event.is_terminal() {
            self.sealed = true;
        }
        self.events.push(event);
        Ok(())
    }

    /// Close the branch without a terminal event.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn get(&self, ty: FlightDataType) -> Option<&[f64]> {
        self.columns.get(&ty).map(|c| c.as_slice())
    }

    pub fn last(&self, ty: FlightDataType) -> Option<f64> {
        self.get(ty).and_then(|c| c.last().copied())
    }

    /// Largest finite value of a column.
    pub fn max(&self, ty: FlightDataType) -> Option<f64> {
        self.get(ty)?.iter().copied().filter(|v| v.is_finite()).reduce(f64::max)
    }

    /// Value of a column at the latest record not after `time`.
    pub fn value_at(&self, ty: FlightDataType, time: f64) -> Option<f64> {
        let times = self.get(FlightDataType::Time)?;
        let idx = times.iter().rposition(|&t| t <= time)?;
        self.get(ty).map(|c| c[idx])
    }

    pub fn types(&self) -> impl Iterator<Item = FlightDataType> + '_ {
        self.columns.keys().copied()
    }

    pub fn events(&self) -> &[FlightEvent] {
        &self.events
    }

    pub fn first_event(&self, kind: FlightEventKind) -> Option<&FlightEvent> {
        self.events.iter().find(|e| e.kind == kind)
    }

    /// The SIMULATION_END or SIM_ABORT event that closed the branch.
    pub fn terminal_event(&self) -> Option<&FlightEvent> {
        self.events.last().filter(|e| e.is_terminal())
    }

    pub fn abort_cause(&self) -> Option<AbortCause> {
        self.terminal_event().and_then(|e| e.abort_cause())
    }
}

// ---------------------------------------------------------------------------
// Result of a whole run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FlightData {
    /// Root branch first, then each child's subtree in spawn order.
    pub branches: Vec<FlightDataBranch>,
    pub warnings: WarningSet,
    /// Stopped by the caller before every branch finished.
    pub cancelled: bool,
}

impl FlightData {
    pub fn root(&self) -> Option<&FlightDataBranch> {
        self.branches.first()
    }

    pub fn branch(&self, name: &str) -> Option<&FlightDataBranch> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Abort cause of the root branch.
    pub fn abort_cause(&self) -> Option<AbortCause> {
        self.root().and_then(|b| b.abort_cause())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(t: f64, alt: f64) -> DataRecord {
        DataRecord::from([(FlightDataType::Time, t), (FlightDataType::Altitude, alt)])
    }

    #[test]
    fn missing_values_are_nan() {
        let mut b = FlightDataBranch::new("Main");
        b.push_record(record(0.0, 0.0)).unwrap();
        let mut r = record(0.1, 1.0);
        r.insert(FlightDataType::Thrust, 5.0);
        b.push_record(r).unwrap();
        b.push_record(record(0.2, 2.0)).unwrap();
        let thrust = b.get(FlightDataType::Thrust).unwrap();
        assert_eq!(thrust.len(), 3);
        assert!(thrust[0].is_nan() && thrust[2].is_nan());
        assert_eq!(b.max(FlightDataType::Altitude), Some(2.0));
        assert_eq!(b.value_at(FlightDataType::Altitude, 0.15), Some(1.0));
    }

    #[test]
    fn terminal_event_seals_branch() {
        let mut b = FlightDataBranch::new("Main");
        b.push_record(record(0.0, 0.0)).unwrap();
        b.add_event(FlightEvent::abort(AbortCause::NoMotorsDefined, 0.0)).unwrap();
        assert!(b.is_sealed());
        assert!(matches!(b.push_record(record(0.1, 0.0)), Err(SimError::SealedBranch(_))));
        assert!(b.add_event(FlightEvent::new(FlightEventKind::Apogee, 0.1)).is_err());
        assert_eq!(b.abort_cause(), Some(AbortCause::NoMotorsDefined));
    }

    #[test]
    fn fork_keeps_history_and_reopens() {
        let mut b = FlightDataBranch::new("Sustainer");
        b.push_record(record(0.0, 0.0)).unwrap();
        b.add_event(FlightEvent::new(FlightEventKind::Launch, 0.0)).unwrap();
        b.seal();
        let child = b.fork("Booster");
        assert_eq!(child.name(), "Booster");
        assert_eq!(child.len(), 1);
        assert_eq!(child.events().len(), 1);
        assert!(!child.is_sealed());
    }
}
