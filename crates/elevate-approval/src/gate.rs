//! Approval gate - validates an approver's decision and applies it.
//!
//! The approval payload comes back through the chat platform, so nothing in
//! it is trusted. The embedded request is authorized again from scratch
//! before the approver is even looked at.
//!
//! # Validation Order
//!
//! 1. Re-authorize the embedded request -> `Unauthorized` (or the
//!    authorizer's own error)
//! 2. Is the approver in the trusted domain? -> `Domain`
//! 3. Is the approver the requestor? -> `SelfApproval`
//! 4. Log the audit record
//! 5. Denied -> `ApprovalOutcome::Denied`, nothing is written
//! 6. Approved -> conditional grant -> `ApprovalOutcome::Granted`

use elevate_core::{ApprovalStatus, EscalationApproval};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::authorize::Authorizer;
use crate::error::{ApprovalError, ApprovalResult};
use crate::grant::{GrantManager, GrantReceipt};

/// Target for audit events.
pub const AUDIT_TARGET: &str = "elevate::audit";

/// The result of a valid approval decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// The approver denied the request. Nothing was changed.
    Denied,
    /// The role was granted.
    Granted(GrantReceipt),
}

impl ApprovalOutcome {
    /// Check if the role was granted.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// The status this outcome corresponds to.
    #[must_use]
    pub fn status(&self) -> ApprovalStatus {
        match self {
            Self::Denied => ApprovalStatus::Denied,
            Self::Granted(_) => ApprovalStatus::Approved,
        }
    }
}

/// Validates approvals and hands approved ones to the [`GrantManager`].
#[derive(Debug, Clone)]
pub struct ApprovalGate {
    authorizer: Authorizer,
    grants: GrantManager,
}

impl ApprovalGate {
    /// Create a gate.
    #[must_use]
    pub fn new(authorizer: Authorizer, grants: GrantManager) -> Self {
        Self { authorizer, grants }
    }

    /// Validate `approval` and, if it approves, grant the role.
    ///
    /// The embedded request's groups are re-resolved in the process.
    ///
    /// # Errors
    ///
    /// - any error of [`Authorizer::authorize`] for the embedded request
    /// - [`ApprovalError::Unauthorized`] if no policy rule permits it
    /// - [`ApprovalError::Domain`] if the approver is outside the trusted domain
    /// - [`ApprovalError::SelfApproval`] if approver and requestor are the same
    /// - [`ApprovalError::Grant`] if the grant itself failed
    pub async fn validate_approval(
        &self,
        approval: &mut EscalationApproval,
        cancel: &CancellationToken,
    ) -> ApprovalResult<ApprovalOutcome> {
        let request = &mut approval.request;
        if !self.authorizer.authorize(request).await? {
            return Err(ApprovalError::Unauthorized {
                requestor: request.requestor.to_string(),
                role: request.role.to_string(),
                resource: request.resource.to_string(),
            });
        }

        self.authorizer.check_domain(&approval.approver)?;

        if approval.is_self_approval() {
            return Err(ApprovalError::SelfApproval {
                identity: approval.approver.to_string(),
            });
        }

        warn!(
            target: AUDIT_TARGET,
            requestor = %approval.request.requestor,
            role = %approval.request.role,
            resource = %approval.request.resource,
            when = %approval.request.timestamp,
            reason = %approval.request.reason,
            status = %approval.status,
            approver = %approval.approver,
            "{approval}"
        );

        match approval.status {
            ApprovalStatus::Denied => Ok(ApprovalOutcome::Denied),
            ApprovalStatus::Approved => {
                let receipt = self.grants.grant(approval, cancel).await?;
                Ok(ApprovalOutcome::Granted(receipt))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use elevate_core::{BackendError, Policy, PolicyRule};
    use elevate_test::{
        FixedClock, MockDirectory, MockIam, ON_CALL_ROLE, TEST_DOMAIN, TEST_ORG,
        owner_policy_document, test_approval, test_policy, test_request,
    };
    use std::sync::Arc;

    struct Harness {
        gate: ApprovalGate,
        iam: Arc<MockIam>,
        directory: Arc<MockDirectory>,
    }

    fn harness(policy: Policy, directory: MockDirectory, iam: MockIam, domain: &str) -> Harness {
        let config = EngineConfig::new(domain);
        let directory = Arc::new(directory);
        let iam = Arc::new(iam);
        let authorizer = Authorizer::new(Arc::new(policy), directory.clone(), &config);
        let grants = GrantManager::new(
            iam.clone(),
            iam.clone(),
            Arc::new(FixedClock::test_time()),
            &config,
        );
        Harness {
            gate: ApprovalGate::new(authorizer, grants),
            iam,
            directory,
        }
    }

    fn on_call_harness() -> Harness {
        harness(
            test_policy(),
            MockDirectory::new().with_member("alice@example.com", ["on-call@example.com"]),
            MockIam::with_policy(owner_policy_document()),
            TEST_DOMAIN,
        )
    }

    #[tokio::test]
    async fn test_approved_request_is_granted() {
        let h = on_call_harness();
        let mut approval = test_approval(
            test_request("alice@example.com", ON_CALL_ROLE, TEST_ORG),
            "bob@example.com",
            ApprovalStatus::Approved,
        );
        let outcome = h
            .gate
            .validate_approval(&mut approval, &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is_granted());
        assert_eq!(outcome.status(), ApprovalStatus::Approved);
        assert_eq!(h.iam.written().len(), 1);
        assert_eq!(h.iam.written()[0].bindings.len(), 3);
    }

    #[tokio::test]
    async fn test_denial_is_not_an_error_and_writes_nothing() {
        let h = on_call_harness();
        let mut approval = test_approval(
            test_request("alice@example.com", ON_CALL_ROLE, TEST_ORG),
            "bob@example.com",
            ApprovalStatus::Denied,
        );
        let outcome = h
            .gate
            .validate_approval(&mut approval, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, ApprovalOutcome::Denied);
        assert_eq!(h.iam.fetch_count(), 0);
        assert_eq!(h.iam.write_count(), 0);
    }

    #[tokio::test]
    async fn test_self_approval_rejected_without_iam_call() {
        let h = harness(
            Policy::new(vec![PolicyRule::new(["oncall@co"], ["roles/x"], ["orgs/1"])]),
            MockDirectory::new().with_member("a@co", ["oncall@co"]),
            MockIam::with_policy(owner_policy_document()),
            "co",
        );
        let mut approval = test_approval(
            test_request("a@co", "roles/x", "orgs/1"),
            "a@co",
            ApprovalStatus::Approved,
        );
        let err = h
            .gate
            .validate_approval(&mut approval, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::SelfApproval { .. }));
        assert_eq!(h.iam.fetch_count(), 0);
        assert_eq!(h.iam.write_count(), 0);
    }

    #[tokio::test]
    async fn test_self_denial_also_rejected() {
        let h = on_call_harness();
        let mut approval = test_approval(
            test_request("alice@example.com", ON_CALL_ROLE, TEST_ORG),
            "alice@example.com",
            ApprovalStatus::Denied,
        );
        assert!(matches!(
            h.gate
                .validate_approval(&mut approval, &CancellationToken::new())
                .await,
            Err(ApprovalError::SelfApproval { .. })
        ));
    }

    #[tokio::test]
    async fn test_approver_outside_domain_rejected() {
        let h = on_call_harness();
        let mut approval = test_approval(
            test_request("alice@example.com", ON_CALL_ROLE, TEST_ORG),
            "bob@gmail.com",
            ApprovalStatus::Approved,
        );
        let err = h
            .gate
            .validate_approval(&mut approval, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ApprovalError::Domain { identity, domain } => {
                assert_eq!(identity, "bob@gmail.com");
                assert_eq!(domain, TEST_DOMAIN);
            },
            other => panic!("expected Domain error, got {other:?}"),
        }
        assert_eq!(h.iam.write_count(), 0);
    }

    #[tokio::test]
    async fn test_tampered_request_fails_recheck() {
        // Alice may request the on-call role, but the payload was edited to
        // ask for hub_root.
        let h = on_call_harness();
        let mut approval = test_approval(
            test_request(
                "alice@example.com",
                "organizations/0000000000/roles/hub_root",
                TEST_ORG,
            ),
            "bob@example.com",
            ApprovalStatus::Approved,
        );
        let err = h
            .gate
            .validate_approval(&mut approval, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::Unauthorized { .. }));
        assert_eq!(h.iam.write_count(), 0);
    }

    #[tokio::test]
    async fn test_membership_is_resolved_again_on_approval() {
        let h = on_call_harness();
        let mut approval = test_approval(
            test_request("alice@example.com", ON_CALL_ROLE, TEST_ORG),
            "bob@example.com",
            ApprovalStatus::Denied,
        );
        h.gate
            .validate_approval(&mut approval, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(h.directory.lookup_count(), 1);
        assert!(!approval.request.groups.is_empty());
    }

    #[tokio::test]
    async fn test_grant_error_propagated() {
        let h = harness(
            test_policy(),
            MockDirectory::new().with_member("alice@example.com", ["on-call@example.com"]),
            MockIam::with_policy(owner_policy_document()).fail_fetch(BackendError::Rejected {
                status: 403,
                message: "permission denied".to_string(),
            }),
            TEST_DOMAIN,
        );
        let mut approval = test_approval(
            test_request("alice@example.com", ON_CALL_ROLE, TEST_ORG),
            "bob@example.com",
            ApprovalStatus::Approved,
        );
        let err = h
            .gate
            .validate_approval(&mut approval, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApprovalError::Grant(crate::GrantError::Fetch { .. })
        ));
    }
}
