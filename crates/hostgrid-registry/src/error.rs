//! Error types for registry operations.

use thiserror::Error;

use hostgrid_state::StateError;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Per-request failure of a registry operation.
///
/// `NotFound` covers both "absent" and "owned by someone else" so callers
/// cannot probe which subdomains or domains exist.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("DNS is not pointing at {expected} yet. Add a CNAME record targeting {expected} and try again.")]
    DnsUnresolved { expected: String },

    #[error("store error: {0}")]
    Store(#[from] StateError),
}

impl RegistryError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// True when the same request may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DnsUnresolved { .. })
    }

    /// Short machine-readable kind, used in API payloads and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::DnsUnresolved { .. } => "dns_unresolved",
            Self::Store(_) => "store",
        }
    }
}
