//! Error types for the detection-adapter boundary

use thiserror::Error;

/// Failures a detection backend can report.
///
/// The only error class in the system. [`crate::DetectionSession`] swallows
/// every variant at the renderer boundary (zero marks, a `warn` log, no
/// propagation); direct callers of a backend see the full taxonomy.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to load detection backend: {0}")]
    BackendLoad(String),

    #[error("detection failed: {0}")]
    Detection(String),

    #[error("invalid input image: {0}")]
    InvalidImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
