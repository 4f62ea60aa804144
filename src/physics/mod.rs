pub mod atmosphere;
pub mod gravity;
pub mod wind;

pub use atmosphere::{AtmosphereModel, AtmosphericConditions};
pub use wind::WindModel;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;
pub const EARTH_RADIUS: f64 = 6_371_000.0;
