use thiserror::Error;

/// Fatal failures that abort a whole simulation run.
///
/// Recoverable flight conditions are reported as a `SIM_ABORT` event on the
/// affected branch instead; anything that reaches this type means the input
/// violated an invariant the model relies on.
#[derive(Error, Debug)]
pub enum SimError {
    /// A fin set was attached directly to a stage or the rocket root.
    #[error("Fin set '{component}' has no parent body component")]
    FinSetWithoutParent { component: String },

    /// Counted overlapping fins came out below the fin set's own count.
    #[error("Fin set '{component}' counted {counted} interfering fins, fewer than its own {own}")]
    InterferenceCount {
        component: String,
        counted: usize,
        own: usize,
    },

    /// The flight state contained a non-finite value after a step.
    #[error("Numerical failure at t={time:.4}s: {quantity} is not finite")]
    NonFinite { time: f64, quantity: &'static str },

    #[error("Invalid simulation options: {0}")]
    InvalidOptions(String),

    #[error("Invalid rocket definition: {0}")]
    InvalidRocket(String),

    /// Data was pushed to a branch after its terminal event.
    #[error("Branch '{0}' is sealed")]
    SealedBranch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scenario parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
