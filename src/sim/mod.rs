pub mod data;
pub mod engine;
pub mod event;
pub mod options;
pub mod status;
pub mod stepper;

pub use data::{DataRecord, FlightData, FlightDataBranch, FlightDataType};
pub use engine::{simulate, simulate_with_cancel, StepOutcome};
pub use event::{AbortCause, EventPayload, EventQueue, EventSource, FlightEvent, FlightEventKind};
pub use options::SimulationOptions;
pub use status::{MotorClusterState, SimulationContext, SimulationStatus};
