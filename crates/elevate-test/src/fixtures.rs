//! Test fixtures.

use elevate_core::{
    ApprovalStatus, Binding, EscalationApproval, EscalationRequest, IamPolicy, Policy, PolicyRule,
    RoleId,
};

/// Trusted domain used by fixtures.
pub const TEST_DOMAIN: &str = "example.com";

/// Organization used by fixtures.
pub const TEST_ORG: &str = "organizations/0000000000";

/// Project used by fixtures.
pub const TEST_PROJECT: &str = "projects/testing";

/// Custom on-call role used by fixtures.
pub const ON_CALL_ROLE: &str = "organizations/0000000000/roles/on_call_elevated";

/// A four-rule policy covering on-call, database and root escalation.
#[must_use]
pub fn test_policy() -> Policy {
    Policy::new(vec![
        PolicyRule::new(["on-call@example.com"], [ON_CALL_ROLE], [TEST_ORG]),
        PolicyRule::new(["on-call@example.com"], [ON_CALL_ROLE], [TEST_PROJECT]),
        PolicyRule::new(
            ["prod-db-access@example.com"],
            ["roles/cloudsql.admin"],
            [TEST_PROJECT],
        ),
        PolicyRule::new(
            ["on-call-sudo@example.com"],
            ["organizations/0000000000/roles/hub_root"],
            [TEST_ORG],
        ),
    ])
}

/// A request with a fixed timestamp.
#[must_use]
pub fn test_request(requestor: &str, role: &str, resource: &str) -> EscalationRequest {
    EscalationRequest::new(requestor, role, resource, "investigating incident")
        .with_timestamp("2024-04-28T00:00:00Z")
}

/// An approval of `request` by `approver`.
#[must_use]
pub fn test_approval(
    request: EscalationRequest,
    approver: &str,
    status: ApprovalStatus,
) -> EscalationApproval {
    EscalationApproval::new(request, approver, status)
}

/// An unconditional `roles/owner` binding for four users.
#[must_use]
pub fn owner_binding() -> Binding {
    Binding {
        role: RoleId::new("roles/owner"),
        members: vec![
            "user:bob@example.com".to_string(),
            "user:foo@example.com".to_string(),
            "user:bar@example.com".to_string(),
            "user:baz@example.com".to_string(),
        ],
        condition: None,
    }
}

/// A second pre-existing binding.
#[must_use]
pub fn viewer_binding() -> Binding {
    Binding {
        role: RoleId::new("roles/viewer"),
        members: vec!["user:bar@example.com".to_string()],
        condition: None,
    }
}

/// A version 1 policy document holding [`owner_binding`] and [`viewer_binding`].
#[must_use]
pub fn owner_policy_document() -> IamPolicy {
    IamPolicy {
        version: 1,
        etag: "BwXhqDa3Fq0=".to_string(),
        bindings: vec![owner_binding(), viewer_binding()],
    }
}
