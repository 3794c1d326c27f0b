use elevate_core::{BackendError, ResolverError, ValidationError};

/// Errors from the conditional grant manager.
#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    /// The resource reference cannot be addressed. Never retried.
    #[error("invalid resource: {0}")]
    InvalidResource(#[source] BackendError),

    /// `now + grant duration` does not fit in a timestamp.
    #[error("grant expiry is out of range")]
    ExpiryOutOfRange,

    /// The resource has no policy document to append to.
    #[error("no existing iam policy was found for {resource}")]
    NoExistingPolicy {
        /// The resource that was read.
        resource: String,
    },

    /// Reading the policy failed with a non-conflict error.
    #[error("failed to retrieve iam policy for {resource}: {source}")]
    Fetch {
        /// The resource that was read.
        resource: String,
        /// The backend error.
        #[source]
        source: BackendError,
    },

    /// Writing the policy failed with a non-conflict error.
    #[error("failed to set iam policy for {resource}: {source}")]
    Write {
        /// The resource that was written.
        resource: String,
        /// The backend error.
        #[source]
        source: BackendError,
    },

    /// The caller cancelled the grant before it completed.
    #[error("grant cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Fetch/write cycles started before cancellation.
        attempts: u32,
    },
}

/// Result type for grant operations.
pub type GrantResult<T> = Result<T, GrantError>;

/// Errors that end an authorization or approval.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The request is missing a required field.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// An identity is outside the trusted domain.
    #[error("unauthorized user, not from {domain}: {identity}")]
    Domain {
        /// The rejected identity.
        identity: String,
        /// The trusted domain.
        domain: String,
    },

    /// Group membership could not be resolved.
    #[error("can't get group membership for {identity}: {source}")]
    Resolver {
        /// The identity that was looked up.
        identity: String,
        /// The resolver error.
        #[source]
        source: ResolverError,
    },

    /// The directory returned no groups for the identity.
    #[error("requestor isn't in any groups: {identity}")]
    NoGroups {
        /// The identity that was looked up.
        identity: String,
    },

    /// No policy rule permits the request.
    #[error("unauthorized: no policy rule grants {role} on {resource} to {requestor}")]
    Unauthorized {
        /// Who asked.
        requestor: String,
        /// The requested role.
        role: String,
        /// The requested resource.
        resource: String,
    },

    /// The approver is the requestor.
    #[error("self approval not allowed: {identity}")]
    SelfApproval {
        /// The identity that tried to approve its own request.
        identity: String,
    },

    /// The grant failed after the approval was accepted.
    #[error(transparent)]
    Grant(#[from] GrantError),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
