//! Error types for the onboarding flow.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse flow definition: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building a flow or resolving ids against it.
///
/// Navigation itself never fails: out-of-range moves are no-ops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("A flow needs at least one slide")]
    EmptyFlow,

    #[error("Duplicate slide id: {id}")]
    DuplicateSlideId { id: String },

    #[error("Option {option_id} not found on slide {slide_id}")]
    OptionNotFound { slide_id: String, option_id: String },

    #[error("Slide {slide_id} has no selectable options")]
    NotSelectable { slide_id: String },

    #[error("Slide {slide_id} does not accept {expected} input")]
    UnexpectedInput { slide_id: String, expected: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
