//! Escalation policy - which groups may request which roles on which resources.
//!
//! A [`Policy`] is a flat list of [`PolicyRule`]s. A request is permitted when a
//! *single* rule contains one of the requester's groups, the requested role and
//! the requested resource. There is no hierarchy, no wildcard matching and no
//! per-identity grants: without a matching rule, everything is denied.
//!
//! # Example
//!
//! ```
//! use elevate_core::policy::{Policy, PolicyRule};
//! use elevate_core::types::{GroupId, GroupSet, RoleId, ResourceId};
//!
//! let policy = Policy::new(vec![PolicyRule::new(
//!     ["oncall@example.com"],
//!     ["roles/x"],
//!     ["organizations/1"],
//! )]);
//!
//! let groups: GroupSet = [GroupId::new("oncall@example.com")].into_iter().collect();
//! assert!(policy.permits(&groups, &RoleId::new("roles/x"), &ResourceId::new("organizations/1")));
//! assert!(!policy.permits(&groups, &RoleId::new("roles/x"), &ResourceId::new("organizations/2")));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{GroupId, GroupSet, ResourceId, RoleId};

/// A single grant rule: members of any of `groups` may request any of `roles`
/// on any of `resources`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Directory groups the rule applies to.
    pub groups: BTreeSet<GroupId>,
    /// Roles that may be requested.
    pub roles: BTreeSet<RoleId>,
    /// Resources the roles may be granted on.
    pub resources: BTreeSet<ResourceId>,
}

impl PolicyRule {
    /// Build a rule from plain string collections.
    #[must_use]
    pub fn new<G, R, S>(
        groups: impl IntoIterator<Item = G>,
        roles: impl IntoIterator<Item = R>,
        resources: impl IntoIterator<Item = S>,
    ) -> Self
    where
        G: Into<GroupId>,
        R: Into<RoleId>,
        S: Into<ResourceId>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            roles: roles.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// Check all three predicates against this rule alone.
    #[must_use]
    pub fn permits(&self, groups: &GroupSet, role: &RoleId, resource: &ResourceId) -> bool {
        self.roles.contains(role)
            && self.resources.contains(resource)
            && !self.groups.is_disjoint(groups)
    }
}

/// The full set of escalation rules, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "policy_rules", default)]
    rules: Vec<PolicyRule>,
}

/// Deduplicated groups, roles and resources mentioned anywhere in a policy.
///
/// Requesting frontends use this to offer only choices that can succeed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyOptions {
    /// Every group referenced by a rule.
    pub groups: BTreeSet<GroupId>,
    /// Every role referenced by a rule.
    pub roles: BTreeSet<RoleId>,
    /// Every resource referenced by a rule.
    pub resources: BTreeSet<ResourceId>,
}

impl Policy {
    /// Create a policy from a list of rules.
    #[must_use]
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    /// A policy with no rules. Denies every request.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// The rules, in load order.
    #[must_use]
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Whether the policy has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the first rule that permits the request, with its index.
    #[must_use]
    pub fn matching_rule(
        &self,
        groups: &GroupSet,
        role: &RoleId,
        resource: &ResourceId,
    ) -> Option<(usize, &PolicyRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.permits(groups, role, resource))
    }

    /// Whether any single rule permits the request.
    #[must_use]
    pub fn permits(&self, groups: &GroupSet, role: &RoleId, resource: &ResourceId) -> bool {
        self.matching_rule(groups, role, resource).is_some()
    }

    /// Collect the deduplicated groups, roles and resources across all rules.
    #[must_use]
    pub fn options(&self) -> PolicyOptions {
        let mut options = PolicyOptions::default();
        for rule in &self.rules {
            options.groups.extend(rule.groups.iter().cloned());
            options.roles.extend(rule.roles.iter().cloned());
            options.resources.extend(rule.resources.iter().cloned());
        }
        options
    }
}
