//! Escalation request and approval values.
//!
//! Both values are request-scoped and never persisted. An approval embeds the
//! request it answers by value, because the request travels through an
//! untrusted intermediary (the chat platform) between the two steps and has
//! to be re-checked in full when the approval comes back.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::types::{GroupSet, Identity, ResourceId, RoleId};

/// A request for a time-boxed role on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRequest {
    /// Who is asking for the role.
    pub requestor: Identity,
    /// The requestor's directory groups.
    ///
    /// Only ever filled in by the membership resolver during authorization.
    /// Never read from an incoming payload.
    #[serde(default, skip_deserializing)]
    pub groups: GroupSet,
    /// The role being requested.
    pub role: RoleId,
    /// The resource the role is requested on.
    pub resource: ResourceId,
    /// Free-form justification.
    #[serde(default)]
    pub reason: String,
    /// When the request was made (RFC 3339).
    #[serde(default)]
    pub timestamp: String,
}

impl EscalationRequest {
    /// Create a request stamped with the current time.
    #[must_use]
    pub fn new(
        requestor: impl Into<Identity>,
        role: impl Into<RoleId>,
        resource: impl Into<ResourceId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            requestor: requestor.into(),
            groups: GroupSet::new(),
            role: role.into(),
            resource: resource.into(),
            reason: reason.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Check that the fields authorization depends on are present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for the first empty field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.requestor.is_empty() {
            return Err(ValidationError::MissingField { field: "requestor" });
        }
        if self.role.is_empty() {
            return Err(ValidationError::MissingField { field: "role" });
        }
        if self.resource.is_empty() {
            return Err(ValidationError::MissingField { field: "resource" });
        }
        Ok(())
    }
}

/// The approver's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Grant the role.
    Approved,
    /// Do not grant the role. Not an error.
    Denied,
}

impl ApprovalStatus {
    /// Whether this status grants the role.
    #[must_use]
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Label for the person who made the decision, used in the audit line.
    #[must_use]
    pub fn actor_label(self) -> &'static str {
        match self {
            Self::Approved => "Approver",
            Self::Denied => "Denier",
        }
    }

    /// User-facing summary of the outcome.
    #[must_use]
    pub fn outcome_text(self, duration_hours: u32) -> String {
        match self {
            Self::Approved => {
                format!("Approved. The role has been granted for {duration_hours} hours.")
            },
            Self::Denied => "The Request has been denied.".to_string(),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => f.write_str("approved"),
            Self::Denied => f.write_str("denied"),
        }
    }
}

/// An approver's answer to an [`EscalationRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationApproval {
    /// The request being answered, carried by value.
    #[serde(flatten)]
    pub request: EscalationRequest,
    /// Who made the decision.
    pub approver: Identity,
    /// The decision.
    pub status: ApprovalStatus,
}

impl EscalationApproval {
    /// Answer `request`.
    #[must_use]
    pub fn new(
        request: EscalationRequest,
        approver: impl Into<Identity>,
        status: ApprovalStatus,
    ) -> Self {
        Self {
            request,
            approver: approver.into(),
            status,
        }
    }

    /// Whether the approver is the requestor (case-sensitive).
    #[must_use]
    pub fn is_self_approval(&self) -> bool {
        self.approver == self.request.requestor
    }
}

impl fmt::Display for EscalationApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[AUDIT], Requestor: {}, Role: {}, Resource: {}, When: {}, Reason: {}, {}: {}",
            self.request.requestor,
            self.request.role,
            self.request.resource,
            self.request.timestamp,
            self.request.reason,
            self.status.actor_label(),
            self.approver
        )
    }
}
