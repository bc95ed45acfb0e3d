//! # Particle Error Types
//!
//! All errors that can occur in the particle engine.

use cinder_xfer::XferError;
use thiserror::Error;

/// Errors that can occur in the particle engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParticleError {
    /// The effect definition document could not be parsed.
    #[error("invalid effect definitions: {0}")]
    Definitions(String),

    /// Two definitions in one document share a name.
    #[error("duplicate effect definition '{0}'")]
    DuplicateDefinition(String),

    /// The manager configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A priority name did not match any bucket.
    #[error("unknown particle priority '{0}'")]
    UnknownPriority(String),

    /// A snapshot failed to save or load.
    #[error("snapshot failed: {0}")]
    Xfer(#[from] XferError),
}

impl ParticleError {
    /// Numeric failure code. Snapshot errors keep their protocol code.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::Xfer(err) => err.code(),
            Self::Definitions(_) => 100,
            Self::DuplicateDefinition(_) => 101,
            Self::InvalidConfig(_) => 102,
            Self::UnknownPriority(_) => 103,
        }
    }
}

/// Result type for particle engine operations.
pub type ParticleResult<T> = Result<T, ParticleError>;
