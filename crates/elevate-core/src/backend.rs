//! Capability traits for the external backends.
//!
//! Each capability is its own narrow trait so tests can fake them one at a
//! time and deployments can wire them to different clients. Nothing here
//! knows about transports or credentials.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{BackendError, ResolverError};
use crate::iam::{GetPolicyOptions, IamPolicy, ResourceRef};
use crate::types::{GroupSet, Identity};

/// Resolves the current directory-group membership of an identity.
#[async_trait]
pub trait MembershipResolver: Send + Sync {
    /// List the groups `identity` belongs to within `domain`.
    ///
    /// `Ok(None)` means the directory returned no membership document at all,
    /// which is different from `Ok(Some(empty))`. The engine denies both.
    async fn list_groups(
        &self,
        identity: &Identity,
        domain: &str,
    ) -> Result<Option<GroupSet>, ResolverError>;
}

/// Reads IAM policy documents.
#[async_trait]
pub trait PolicyReader: Send + Sync {
    /// Fetch the current policy of `resource`.
    ///
    /// `Ok(None)` means the resource has no policy document.
    async fn get_policy(
        &self,
        resource: &ResourceRef,
        options: &GetPolicyOptions,
    ) -> Result<Option<IamPolicy>, BackendError>;
}

/// Writes IAM policy documents.
///
/// Implementations replace the whole document. Callers must always write a
/// document derived from a fresh read, never one built from scratch.
#[async_trait]
pub trait PolicyWriter: Send + Sync {
    /// Replace the policy of `resource` with `policy`.
    async fn set_policy(
        &self,
        resource: &ResourceRef,
        policy: IamPolicy,
    ) -> Result<IamPolicy, BackendError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
