//! IAM policy document model.
//!
//! The engine never owns these documents. It reads one from the backend,
//! appends a single conditional [`Binding`], and writes it back. The `etag`
//! is carried through untouched so the backend can detect concurrent writers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BackendError;
use crate::types::{ResourceId, RoleId};

/// Policy schema version required for conditional bindings.
pub const CONDITIONAL_POLICY_VERSION: i64 = 3;

/// A backend-evaluated condition attached to a binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    /// The boolean expression, e.g. `request.time < timestamp("...")`.
    pub expression: String,
    /// Short human-readable title.
    pub title: String,
    /// Longer human-readable description.
    pub description: String,
}

/// Grants `role` to `members`, optionally only while `condition` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// The granted role.
    pub role: RoleId,
    /// Principals, e.g. `user:alice@example.com`.
    pub members: Vec<String>,
    /// Restricts when the binding is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
}

/// The permission document of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamPolicy {
    /// Schema version of the document.
    #[serde(default)]
    pub version: i64,
    /// Opaque concurrency token from the last read.
    #[serde(default)]
    pub etag: String,
    /// Existing bindings, in backend order.
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// Options for reading a policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPolicyOptions {
    /// Highest schema version the caller understands.
    pub requested_policy_version: i64,
}

impl GetPolicyOptions {
    /// Request the schema version that carries conditions.
    #[must_use]
    pub fn conditional() -> Self {
        Self {
            requested_policy_version: CONDITIONAL_POLICY_VERSION,
        }
    }
}

/// Kinds of resource that can carry an IAM policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `projects/<id>`
    Projects,
    /// `organizations/<id>`
    Organizations,
}

impl ResourceKind {
    /// The reference prefix, without the trailing slash.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Organizations => "organizations",
        }
    }
}

/// A parsed `<type>/<id>` resource reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    kind: ResourceKind,
    id: String,
}

impl ResourceRef {
    /// Parse a resource reference.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidResource`] for an unknown prefix or an
    /// empty id. This is a configuration problem and is never retried.
    pub fn parse(resource: &ResourceId) -> Result<Self, BackendError> {
        let invalid = || BackendError::InvalidResource {
            resource: resource.to_string(),
        };
        let (prefix, id) = resource.as_str().split_once('/').ok_or_else(invalid)?;
        let kind = match prefix {
            "projects" => ResourceKind::Projects,
            "organizations" => ResourceKind::Organizations,
            _ => return Err(invalid()),
        };
        if id.is_empty() || id.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            kind,
            id: id.to_string(),
        })
    }

    /// The kind of resource.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The id part of the reference.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The name the IAM API addresses this resource by.
    ///
    /// Projects are addressed by bare id, organizations by the full
    /// `organizations/<id>` reference.
    #[must_use]
    pub fn api_name(&self) -> String {
        match self.kind {
            ResourceKind::Projects => self.id.clone(),
            ResourceKind::Organizations => self.to_string(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.prefix(), self.id)
    }
}
