use thiserror::Error;

/// Errors raised by the fingerprint machinery itself. Collaborator and I/O
/// failures travel as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum DriftError {
    #[error("aspect not found: {0}")]
    AspectNotFound(String),

    #[error("duplicate aspect name: {0}")]
    DuplicateAspect(String),

    #[error("aspect '{0}' does not support apply")]
    ApplyUnsupported(String),

    #[error("invalid fingerprint '{name}': {reason}")]
    InvalidFingerprint { name: String, reason: String },

    #[error("path escapes project root: {0}")]
    PathOutsideProject(String),
}
