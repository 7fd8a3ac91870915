use thiserror::Error;

/// Errors raised while building a vehicle or controller from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Vehicle has no motors")]
    NoMotors,

    #[error("Invalid motor {index}: {reason}")]
    InvalidMotor { index: usize, reason: String },

    #[error("Damping diagonal must have 6 finite, non-negative entries (got {0:?})")]
    InvalidDamping(Vec<f64>),

    #[error("Invalid {stage} gains for axis {axis}")]
    InvalidGains { stage: &'static str, axis: usize },

    #[error("Mixer has {mixer} rows but the vehicle has {motors} motors")]
    MixerMismatch { mixer: usize, motors: usize },

    #[error("Invalid mixer: {0}")]
    InvalidMixer(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("Failed to parse vehicle config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read vehicle config: {0}")]
    Io(#[from] std::io::Error),
}
