//! Error types
//!
//! Only configuration and session-state misuse are errors. Operations on
//! entities that are already gone are silent no-ops and never show up here.

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// World created with a non-positive size
    #[error("invalid world dimensions {width}x{height}: both must be positive")]
    InvalidDimensions { width: f32, height: f32 },

    /// A tuning value outside its allowed range
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Game state errors
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// The session reached game-over; only a reset is accepted
    #[error("session is over; reset the game first")]
    SessionOver,
}
