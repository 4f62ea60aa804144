pub mod aero;
pub mod dynamics;
pub mod error;
pub mod io;
pub mod math;
pub mod physics;
pub mod sim;
pub mod vehicle;
pub mod warning;

pub use error::{Result, SimError};
pub use sim::{simulate, simulate_with_cancel, FlightData, SimulationOptions};
pub use warning::{Warning, WarningSet};
