//! Commonly used types for convenient importing.

pub use crate::authorize::Authorizer;
pub use crate::config::EngineConfig;
pub use crate::error::{ApprovalError, ApprovalResult, GrantError, GrantResult};
pub use crate::gate::{ApprovalGate, ApprovalOutcome};
pub use crate::grant::{GrantManager, GrantReceipt};
