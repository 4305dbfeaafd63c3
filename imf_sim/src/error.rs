//! Error types for imf_sim.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;

/// Shorthand used by the various `validate` methods.
pub(crate) fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(PhysicsError::InvalidConfiguration(msg.into()))
}
