use thiserror::Error;
use uuv_core::ConfigError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("Missing value for {0}")]
    MissingValue(&'static str),

    #[error("Invalid value for {flag}: {value}")]
    InvalidValue { flag: &'static str, value: String },

    #[error("Vehicle configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry recording failed: {0}")]
    Telemetry(#[from] std::io::Error),

    #[error("Telemetry serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
