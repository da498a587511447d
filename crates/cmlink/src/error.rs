//! Error types for cache, chain building, and pixel execution.
//!
//! Three enums mirror the three phases a caller goes through: opening
//! profiles ([`OpenError`]), compiling a chain ([`BuildError`]), and
//! running pixels ([`RunError`]). Nothing is retried internally; open
//! failures are not cached, so a caller may retry `acquire` after fixing
//! the cause.

use cmlink_engine::EngineError;
use thiserror::Error;

/// Failures while resolving a profile to a native handle.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The engine probed as unusable; every acquire fails identically.
    #[error("color engine unavailable")]
    EngineUnavailable,

    /// Profile bytes failed validation before reaching the engine.
    #[error("invalid profile data: {0}")]
    InvalidProfile(#[from] cmlink_core::Error),

    /// The engine refused the profile or a synthesis step.
    #[error(transparent)]
    Engine(EngineError),
}

impl From<EngineError> for OpenError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable => Self::EngineUnavailable,
            other => Self::Engine(other),
        }
    }
}

/// Failures while compiling a transform chain.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A chain slot could not be resolved; `index` is the position in the
    /// ordered profile list, input first.
    #[error("profile {index} could not be resolved: {source}")]
    Profile {
        /// Zero-based chain position.
        index: usize,
        /// Underlying open failure.
        source: OpenError,
    },

    /// The spec contained no profiles.
    #[error("transform spec contains no profiles")]
    EmptyChain,

    /// An abstract proofing profile could not be synthesized. The chain
    /// fails rather than silently dropping proofing.
    #[error("proofing synthesis failed: {0}")]
    Synthesis(OpenError),

    /// A pixel layout in the spec is malformed.
    #[error("pixel layout rejected: {0}")]
    Layout(#[from] cmlink_core::Error),

    /// The engine refused transform construction or export.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Failures while executing a compiled transform over pixel buffers.
#[derive(Debug, Error)]
pub enum RunError {
    /// Buffer layout differs from what the transform was built for.
    #[error("pixel layout mismatch: transform expects {expected}, buffer is {got}")]
    LayoutMismatch {
        /// Layout the transform was compiled for.
        expected: String,
        /// Layout of the offending buffer.
        got: String,
    },

    /// The sample data type cannot be executed, e.g. half floats where a
    /// numeric rescale is required.
    #[error("unsupported sample data type for layout {layout}")]
    UnsupportedDataType {
        /// The offending layout.
        layout: String,
    },

    /// A buffer failed geometry validation.
    #[error("pixel buffer rejected: {0}")]
    Buffer(#[from] cmlink_core::Error),

    /// The engine failed on a row; rows before it are valid in the
    /// destination, nothing past it was written.
    #[error("row {row} conversion failed: {source}")]
    Engine {
        /// Zero-based row index.
        row: usize,
        /// Underlying engine failure.
        source: EngineError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_mapping() {
        let err: OpenError = EngineError::Unavailable.into();
        assert!(matches!(err, OpenError::EngineUnavailable));

        let err: OpenError = EngineError::OpenFailed("bad".into()).into();
        assert!(matches!(err, OpenError::Engine(_)));
    }

    #[test]
    fn test_build_error_names_stage() {
        let err = BuildError::Profile {
            index: 2,
            source: OpenError::EngineUnavailable,
        };
        assert!(err.to_string().contains("profile 2"));
    }

    #[test]
    fn test_run_error_names_row() {
        let err = RunError::Engine {
            row: 7,
            source: EngineError::RunFailed("boom".into()),
        };
        assert!(err.to_string().contains("row 7"));
        assert!(err.to_string().contains("boom"));
    }
}
