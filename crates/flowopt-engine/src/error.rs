//! Engine-level errors
//!
//! Only engine-fatal conditions surface here: an unreachable Proposer, an
//! invalid seed, and persistence failures. Per-candidate failures (malformed
//! proposals, scorer errors, scorer timeouts) are caught at the batch
//! boundary, recorded as feedback and never escape as `Err`.

use flowopt_model::ModelError;

/// Fatal engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The Proposer is unreachable; the run cannot continue
    #[error("proposer unreachable: {0}")]
    ProposerUnreachable(String),

    /// The caller-supplied seed violates a model invariant
    #[error("invalid seed: {0}")]
    InvalidSeed(#[from] ModelError),

    /// Persisting or loading a run artifact failed
    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),
}

/// Run-artifact persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Filesystem error while reading or writing the artifact
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),

    /// The artifact on disk is not a valid run record
    #[error("corrupt artifact: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = EngineError::ProposerUnreachable("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));

        let err = EngineError::InvalidSeed(ModelError::CycleDetected);
        assert!(err.to_string().contains("cycle"));
    }
}
