use thiserror::Error;

/// Hard failures of a call. Anything that goes wrong *inside* an evaluation
/// (bad syntax, division by zero, timeouts) is reported in-band as a
/// diagnostic instead.
#[derive(Debug, Error)]
pub enum CalcError {
    /// The timeout passed to `calculate` was zero or negative.
    #[error("timeout must be a positive number of milliseconds, got {0}")]
    InvalidTimeout(i64),

    /// The engine has no definitions loaded yet.
    #[error("expression engine is not initialized")]
    EngineUnavailable,

    /// The engine gave up because the expression nests too deeply or exhausted
    /// some other resource.
    #[error("engine resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A textual option command was not understood.
    #[error("invalid option: {0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, CalcError>;
