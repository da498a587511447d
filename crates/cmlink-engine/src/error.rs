//! Error type for native engine calls.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Failures reported by a color engine backend.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// The backend probed as unusable at startup; every call fails with
    /// this same error afterwards.
    #[error("color engine unavailable")]
    Unavailable,

    /// The engine refused a profile byte stream.
    #[error("profile open failed: {0}")]
    OpenFailed(String),

    /// Transform construction was refused, e.g. incompatible channel
    /// counts between adjacent chain profiles.
    #[error("transform build failed: {0}")]
    BuildFailed(String),

    /// Profile or device-link export failed.
    #[error("profile export failed: {0}")]
    ExportFailed(String),

    /// A pixel conversion call failed.
    #[error("transform run failed: {0}")]
    RunFailed(String),
}
