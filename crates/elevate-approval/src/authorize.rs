//! Authorization engine - decides whether a request may be granted at all.
//!
//! # Check Order
//!
//! 1. Are the requestor, role and resource present? -> `Validation`
//! 2. Is the requestor in the trusted domain? -> `Domain`
//! 3. Resolve current group membership -> `Resolver` / `NoGroups`
//! 4. Does a single policy rule contain one of the groups, the role and the
//!    resource? -> `true`, otherwise `false`
//!
//! Group membership is resolved on every call and written into the request,
//! replacing whatever the caller put there.

use std::sync::Arc;

use elevate_core::{EscalationRequest, GroupSet, Identity, MembershipResolver, Policy};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{ApprovalError, ApprovalResult};

/// Matches escalation requests against the policy.
#[derive(Clone)]
pub struct Authorizer {
    policy: Arc<Policy>,
    resolver: Arc<dyn MembershipResolver>,
    trusted_domain: String,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("rules", &self.policy.rules().len())
            .field("trusted_domain", &self.trusted_domain)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    /// Create an authorizer over `policy`.
    #[must_use]
    pub fn new(
        policy: Arc<Policy>,
        resolver: Arc<dyn MembershipResolver>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            policy,
            resolver,
            trusted_domain: config.trusted_domain.clone(),
        }
    }

    /// The policy this authorizer matches against.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Check that `identity` belongs to the trusted domain.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Domain`] otherwise.
    pub fn check_domain(&self, identity: &Identity) -> ApprovalResult<()> {
        if identity.in_domain(&self.trusted_domain) {
            Ok(())
        } else {
            Err(ApprovalError::Domain {
                identity: identity.to_string(),
                domain: self.trusted_domain.clone(),
            })
        }
    }

    /// Authorize `request`.
    ///
    /// Returns `Ok(true)` when a policy rule permits the request and
    /// `Ok(false)` when none does. Every error also means "not authorized";
    /// it carries the reason.
    ///
    /// # Errors
    ///
    /// - [`ApprovalError::Validation`] if a required field is empty
    /// - [`ApprovalError::Domain`] if the requestor is outside the trusted domain
    /// - [`ApprovalError::Resolver`] if group membership lookup failed
    /// - [`ApprovalError::NoGroups`] if the requestor belongs to no groups
    pub async fn authorize(&self, request: &mut EscalationRequest) -> ApprovalResult<bool> {
        request.validate()?;
        self.check_domain(&request.requestor)?;

        // Drop anything the caller supplied before resolving.
        request.groups = GroupSet::new();
        let resolved = self
            .resolver
            .list_groups(&request.requestor, &self.trusted_domain)
            .await
            .map_err(|source| {
                warn!(requestor = %request.requestor, error = %source, "group lookup failed");
                ApprovalError::Resolver {
                    identity: request.requestor.to_string(),
                    source,
                }
            })?;

        let groups = match resolved {
            Some(groups) if !groups.is_empty() => groups,
            _ => {
                return Err(ApprovalError::NoGroups {
                    identity: request.requestor.to_string(),
                });
            },
        };
        request.groups = groups;

        let matched = self
            .policy
            .matching_rule(&request.groups, &request.role, &request.resource);
        match matched {
            Some((index, _)) => {
                debug!(
                    requestor = %request.requestor,
                    role = %request.role,
                    resource = %request.resource,
                    rule = index,
                    "request authorized"
                );
                Ok(true)
            },
            None => {
                debug!(
                    requestor = %request.requestor,
                    role = %request.role,
                    resource = %request.resource,
                    groups = request.groups.len(),
                    "no policy rule matched"
                );
                Ok(false)
            },
        }
    }
}
