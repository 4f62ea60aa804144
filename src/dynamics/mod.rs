pub mod eom;
pub mod state;

pub use eom::{body_airspeed, derivatives, Guide, Loads};
pub use state::{Deriv, RigidState};
