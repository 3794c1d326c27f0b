//! Error types shared between the engine and backend adapters.

use thiserror::Error;

/// A request was malformed or incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the empty field.
        field: &'static str,
    },
}

/// Errors reported by a [`MembershipResolver`](crate::MembershipResolver).
///
/// Adapters must keep "no such identity" apart from transient failures so the
/// log makes clear which one denied the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    /// The directory does not know this identity.
    #[error("unknown identity in directory: {identity}")]
    UnknownIdentity {
        /// The identity that was looked up.
        identity: String,
    },

    /// The directory could not be reached or returned a server error.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by the IAM backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The policy document changed since it was read (HTTP 409).
    ///
    /// This is the only error the grant loop retries.
    #[error("policy conflict: {0}")]
    Conflict(String),

    /// The resource reference has an unsupported `<type>/` prefix.
    #[error("unsupported resource reference '{resource}', expected projects/<id> or organizations/<id>")]
    InvalidResource {
        /// The offending reference.
        resource: String,
    },

    /// The backend refused the request.
    #[error("backend rejected request ({status}): {message}")]
    Rejected {
        /// Backend status code.
        status: u16,
        /// Backend error message.
        message: String,
    },

    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Whether this is an optimistic-concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
