use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sim::{FlightData, FlightDataBranch, FlightDataType, FlightEventKind, SimulationOptions};
use crate::vehicle::{FlightConfiguration, MotorLibrary, Rocket};

// ---------------------------------------------------------------------------
// Scenario files
// ---------------------------------------------------------------------------

/// A rocket, its motors and the launch options, as loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub rocket: Rocket,
    #[serde(default)]
    pub motors: MotorLibrary,
    #[serde(default)]
    pub options: SimulationOptions,
    /// Stages switched off for this flight.
    #[serde(default)]
    pub inactive_stages: Vec<usize>,
}

impl Scenario {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// All stages active except the ones listed as inactive.
    pub fn configuration(&self) -> FlightConfiguration {
        let mut config = FlightConfiguration::new(&self.rocket);
        for &stage in &self.inactive_stages {
            config.set_stage_active(stage, false);
        }
        config
    }
}

// ---------------------------------------------------------------------------
// Flight summary
// ---------------------------------------------------------------------------

/// Headline numbers of one branch.
#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub branch: String,
    pub apogee_m: f64,
    pub apogee_time_s: Option<f64>,
    pub max_velocity_ms: f64,
    pub max_mach: f64,
    pub flight_time_s: f64,
    pub rod_clearance_velocity_ms: Option<f64>,
    pub deployment_velocity_ms: Option<f64>,
    pub ground_hit_velocity_ms: Option<f64>,
    pub abort: Option<String>,
}

impl FlightSummary {
    pub fn from_branch(branch: &FlightDataBranch) -> Self {
        let velocity_at = |kind| {
            branch
                .first_event(kind)
                .and_then(|e| branch.value_at(FlightDataType::TotalVelocity, e.time))
        };
        FlightSummary {
            branch: branch.name().to_string(),
            apogee_m: branch.max(FlightDataType::Altitude).unwrap_or(0.0),
            apogee_time_s: branch.first_event(FlightEventKind::Apogee).map(|e| e.time),
            max_velocity_ms: branch.max(FlightDataType::TotalVelocity).unwrap_or(0.0),
            max_mach: branch.max(FlightDataType::Mach).unwrap_or(0.0),
            flight_time_s: branch.last(FlightDataType::Time).unwrap_or(0.0),
            rod_clearance_velocity_ms: velocity_at(FlightEventKind::LaunchRod),
            deployment_velocity_ms: velocity_at(FlightEventKind::RecoveryDeviceDeployment),
            ground_hit_velocity_ms: velocity_at(FlightEventKind::GroundHit),
            abort: branch.abort_cause().map(|c| c.to_string()),
        }
    }
}

/// Everything written to the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct FlightReport {
    pub rocket: String,
    pub branches: Vec<FlightSummary>,
    pub warnings: Vec<String>,
    pub cancelled: bool,
}

impl FlightReport {
    pub fn new(rocket: &Rocket, data: &FlightData) -> Self {
        FlightReport {
            rocket: rocket.name.clone(),
            branches: data.branches.iter().map(FlightSummary::from_branch).collect(),
            warnings: data.warnings.iter().map(|w| w.to_string()).collect(),
            cancelled: data.cancelled,
        }
    }
}

/// Write the flight report as pretty-printed JSON.
pub fn write_summary<W: Write>(writer: &mut W, report: &FlightReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_summary_file(path: impl AsRef<Path>, report: &FlightReport) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_summary(&mut file, report)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{DataRecord, FlightEvent};
    use crate::vehicle::presets;

    fn branch() -> FlightDataBranch {
        let mut b = FlightDataBranch::new("Sustainer");
        let samples = [(0.0, 0.0, 0.0), (1.0, 40.0, 60.0), (5.0, 150.0, 0.0), (12.0, 0.0, 8.0)];
        for (t, alt, v) in samples {
            b.push_record(DataRecord::from([
                (FlightDataType::Time, t),
                (FlightDataType::Altitude, alt),
                (FlightDataType::TotalVelocity, v),
            ]))
            .unwrap();
        }
        b.add_event(FlightEvent::new(FlightEventKind::LaunchRod, 0.5)).unwrap();
        b.add_event(FlightEvent::new(FlightEventKind::Apogee, 5.0)).unwrap();
        b.add_event(FlightEvent::new(FlightEventKind::GroundHit, 12.0)).unwrap();
        b
    }

    #[test]
    fn summary_picks_event_values() {
        let s = FlightSummary::from_branch(&branch());
        assert_eq!(s.apogee_m, 150.0);
        assert_eq!(s.apogee_time_s, Some(5.0));
        assert_eq!(s.max_velocity_ms, 60.0);
        assert_eq!(s.flight_time_s, 12.0);
        assert_eq!(s.rod_clearance_velocity_ms, Some(0.0));
        assert_eq!(s.ground_hit_velocity_ms, Some(8.0));
        assert_eq!(s.deployment_velocity_ms, None);
        assert!(s.abort.is_none());
    }

    #[test]
    fn json_output_is_valid() {
        let report = FlightReport {
            rocket: "Test".into(),
            branches: vec![FlightSummary::from_branch(&branch())],
            warnings: vec![],
            cancelled: false,
        };
        let mut buf = Vec::new();
        write_summary(&mut buf, &report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["rocket"], "Test");
        assert_eq!(value["branches"][0]["apogee_m"], 150.0);
    }

    #[test]
    fn scenario_loads_with_defaults() {
        let rocket = serde_json::to_value(presets::sparrow()).unwrap();
        let text = serde_json::json!({ "rocket": rocket, "inactive_stages": [] }).to_string();
        let scenario = Scenario::from_reader(text.as_bytes()).unwrap();
        assert_eq!(scenario.rocket.name, "Sparrow");
        assert_eq!(scenario.options, SimulationOptions::default());
        assert!(scenario.motors.get(presets::SKY_C).is_none());
        assert!(scenario.configuration().is_stage_active(0));
    }
}
