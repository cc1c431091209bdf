use crate::store::StoreError;
use crate::validation::{InvalidTransition, ValidationErrors};

// ============================================================================
// Core Error Taxonomy
// ============================================================================
//
// Every orchestrated operation fails with exactly one of these categories so
// that both front-ends (RPC and HTTP) can map outcomes uniformly:
//
//   Validation        -> invalid-argument, all field violations listed
//   NotFound          -> not-found
//   Conflict          -> aborted, caller must reload and retry
//   InvalidTransition -> failed-precondition
//   Internal          -> opaque internal failure, details stay in the logs
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("record not found")]
    NotFound,

    #[error("record was modified by another process; reload and retry")]
    Conflict,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Opaque to callers; the cause is logged at the service boundary and
    /// kept on the source chain, never rendered outward.
    #[error("internal failure")]
    Internal(#[source] StoreError),
}

impl CoreError {
    /// True for the deterministic, caller-fixable categories that never
    /// indicate a fault in this process.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CoreError::Internal(_))
    }
}
