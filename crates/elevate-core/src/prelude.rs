//! Commonly used types for convenient importing.
//!
//! # Example
//!
//! ```
//! use elevate_core::prelude::*;
//!
//! let policy = Policy::deny_all();
//! assert!(policy.is_empty());
//! ```

pub use crate::backend::{Clock, MembershipResolver, PolicyReader, PolicyWriter, SystemClock};
pub use crate::error::{BackendError, ResolverError, ValidationError};
pub use crate::iam::{Binding, Expr, GetPolicyOptions, IamPolicy, ResourceRef};
pub use crate::policy::{Policy, PolicyRule};
pub use crate::request::{ApprovalStatus, EscalationApproval, EscalationRequest};
pub use crate::types::{GroupId, GroupSet, Identity, ResourceId, RoleId};
