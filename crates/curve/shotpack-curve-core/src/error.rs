//! Error type for curve parsing and shot evaluation.

/// Errors raised while reading curve data or interpreting shot channels.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CurveError {
    /// Persisted key data is not a whole number of keys
    #[error("key data has {len} floats, expected a multiple of 8")]
    KeyDataLength { len: usize },

    #[error("invalid tangent mode ordinal {value}")]
    InvalidTangentMode { value: f64 },

    #[error("key time must be finite, got {time}")]
    InvalidKeyTime { time: f64 },

    #[error("two keys share time {time}")]
    DuplicateKeyTime { time: f64 },

    #[error("invalid key float '{token}'")]
    InvalidKeyText { token: String },

    /// Channel names are `name` or `name.x|y|z|w`
    #[error("malformed channel name '{name}'")]
    MalformedChannel { name: String },

    #[error("uniform '{uniform}' has inconsistent channels: {reason}")]
    InconsistentDimensions { uniform: String, reason: String },

    #[error("shot speed must be positive, got {speed}")]
    InvalidSpeed { speed: f64 },
}

pub type Result<T> = std::result::Result<T, CurveError>;
