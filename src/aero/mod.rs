pub mod barrowman;
pub mod calc;
pub mod conditions;
pub mod drag;
pub mod fins;
pub mod forces;
pub mod symmetric;
pub mod tube;
pub mod tube_fins;

pub use barrowman::BarrowmanCalculator;
pub use calc::ComponentCalc;
pub use conditions::FlightConditions;
pub use forces::{AerodynamicForces, CenterOfPressure};
