//! Elevate Approval - Policy-gated, time-bound privilege grants.
//!
//! This crate holds the three stages of an escalation:
//!
//! - **Authorization** ([`Authorizer`]): domain check, fresh group resolution
//!   and single-rule policy matching.
//! - **Approval gate** ([`ApprovalGate`]): re-authorizes the embedded request,
//!   checks the approver, and hands approved requests to the grant manager.
//! - **Conditional grant** ([`GrantManager`]): appends a time-boxed binding to
//!   the resource's IAM policy under optimistic concurrency.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use elevate_approval::{ApprovalGate, Authorizer, EngineConfig, GrantManager};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = EngineConfig::new("example.com");
//! let authorizer = Authorizer::new(Arc::new(policy), directory, &config);
//! let grants = GrantManager::new(iam.clone(), iam, Arc::new(SystemClock), &config);
//! let gate = ApprovalGate::new(authorizer, grants);
//!
//! let outcome = gate.validate_approval(&mut approval, &CancellationToken::new()).await?;
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod authorize;
pub mod config;
/// Error types and results for the approval module.
pub mod error;
pub mod gate;
pub mod grant;

pub use authorize::Authorizer;
pub use config::EngineConfig;
pub use error::{ApprovalError, ApprovalResult, GrantError, GrantResult};
pub use gate::{ApprovalGate, ApprovalOutcome};
pub use grant::{GrantManager, GrantReceipt, conditional_binding};
