//! Elevate Core - Foundation types and traits for the elevate privilege grant engine.
//!
//! This crate provides:
//! - Identifier newtypes for identities, groups, roles and resources
//! - The declarative [`Policy`] model
//! - Escalation request and approval values
//! - The IAM policy document model and resource references
//! - Narrow capability traits for the directory, IAM and clock backends
//! - Error types shared by backend adapters

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod backend;
pub mod error;
pub mod iam;
pub mod policy;
pub mod request;
pub mod types;

pub use backend::{Clock, MembershipResolver, PolicyReader, PolicyWriter, SystemClock};
pub use error::{BackendError, ResolverError, ValidationError};
pub use iam::{
    Binding, CONDITIONAL_POLICY_VERSION, Expr, GetPolicyOptions, IamPolicy, ResourceKind,
    ResourceRef,
};
pub use policy::{Policy, PolicyOptions, PolicyRule};
pub use request::{ApprovalStatus, EscalationApproval, EscalationRequest};
pub use types::{GroupId, GroupSet, Identity, ResourceId, RoleId};
