//! Conditional grant manager - merges a time-boxed binding into a resource's
//! IAM policy.
//!
//! # Grant Protocol
//!
//! 1. Compute the expiry from the clock and the configured duration
//! 2. Build one conditional binding for the requestor
//! 3. Fetch the current policy (schema version 3)
//! 4. Append the binding to the fetched bindings
//! 5. Set the schema version to 3 and write the policy back
//! 6. On a conflict from either call, wait and start again from step 3
//!
//! The write always carries a document that was fetched in the same attempt.
//! The backend replaces the whole policy on write, so writing anything other
//! than "what was there plus one binding" removes existing access from the
//! resource. A resource without any policy document is an error, never an
//! empty starting point.
//!
//! Conflicts are retried until the caller's cancellation token fires. There
//! is no attempt cap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use elevate_core::{
    Binding, CONDITIONAL_POLICY_VERSION, Clock, EscalationApproval, Expr, GetPolicyOptions,
    PolicyReader, PolicyWriter, ResourceRef,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{GrantError, GrantResult};

/// What a successful grant did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantReceipt {
    /// The binding that was appended.
    pub binding: Binding,
    /// When the binding stops applying.
    pub expires_at: DateTime<Utc>,
    /// Fetch/write cycles it took, including the successful one.
    pub attempts: u32,
}

/// Build the time-boxed binding for an approval.
#[must_use]
pub fn conditional_binding(approval: &EscalationApproval, expires_at: DateTime<Utc>) -> Binding {
    let request = &approval.request;
    let until = expires_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    Binding {
        role: request.role.clone(),
        members: vec![request.requestor.principal()],
        condition: Some(Expr {
            title: format!("Until: {until}"),
            description: format!(
                "Grant {} on {} until {until}",
                request.role, request.requestor
            ),
            expression: format!("request.time < timestamp(\"{until}\")"),
        }),
    }
}

/// Applies approved escalations to the IAM backend.
#[derive(Clone)]
pub struct GrantManager {
    reader: Arc<dyn PolicyReader>,
    writer: Arc<dyn PolicyWriter>,
    clock: Arc<dyn Clock>,
    grant_duration: chrono::Duration,
    retry_interval: Duration,
}

impl std::fmt::Debug for GrantManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantManager")
            .field("grant_duration", &self.grant_duration)
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

/// Why a single fetch/write attempt did not finish.
enum AttemptError {
    Conflict,
    Fatal(GrantError),
}

impl GrantManager {
    /// Create a grant manager.
    #[must_use]
    pub fn new(
        reader: Arc<dyn PolicyReader>,
        writer: Arc<dyn PolicyWriter>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            clock,
            grant_duration: config.grant_duration(),
            retry_interval: config.retry_interval,
        }
    }

    /// Grant the approved role until `now + grant duration`.
    ///
    /// Callers must only pass approvals that passed the approval gate; this
    /// method does not look at `approval.status`.
    ///
    /// # Errors
    ///
    /// - [`GrantError::InvalidResource`] if the resource cannot be addressed
    /// - [`GrantError::NoExistingPolicy`] if the resource has no policy
    /// - [`GrantError::Fetch`] / [`GrantError::Write`] for non-conflict backend errors
    /// - [`GrantError::Cancelled`] if `cancel` fires first
    pub async fn grant(
        &self,
        approval: &EscalationApproval,
        cancel: &CancellationToken,
    ) -> GrantResult<GrantReceipt> {
        let resource = ResourceRef::parse(&approval.request.resource)
            .map_err(GrantError::InvalidResource)?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.grant_duration)
            .ok_or(GrantError::ExpiryOutOfRange)?;
        let binding = conditional_binding(approval, expires_at);
        debug!(%resource, role = %binding.role, %expires_at, "binding conditional iam policy");

        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            match self.attempt(&resource, &binding, cancel, attempts).await {
                Ok(()) => {
                    info!(
                        %resource,
                        role = %binding.role,
                        member = %approval.request.requestor,
                        %expires_at,
                        attempts,
                        "conditional grant written"
                    );
                    return Ok(GrantReceipt {
                        binding,
                        expires_at,
                        attempts,
                    });
                },
                Err(AttemptError::Conflict) => {
                    warn!(
                        %resource,
                        attempt = attempts,
                        retry_in_ms = u64::try_from(self.retry_interval.as_millis()).unwrap_or(u64::MAX),
                        "iam policy conflict, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(GrantError::Cancelled { attempts }),
                        () = tokio::time::sleep(self.retry_interval) => {},
                    }
                },
                Err(AttemptError::Fatal(err)) => return Err(err),
            }
        }
    }

    /// One read-append-write cycle against a freshly fetched document.
    async fn attempt(
        &self,
        resource: &ResourceRef,
        binding: &Binding,
        cancel: &CancellationToken,
        attempts: u32,
    ) -> Result<(), AttemptError> {
        let cancelled = || AttemptError::Fatal(GrantError::Cancelled { attempts });
        let options = GetPolicyOptions::conditional();

        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled()),
            fetched = self.reader.get_policy(resource, &options) => fetched,
        };
        let mut policy = match fetched {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                return Err(AttemptError::Fatal(GrantError::NoExistingPolicy {
                    resource: resource.to_string(),
                }));
            },
            Err(e) if e.is_conflict() => return Err(AttemptError::Conflict),
            Err(source) => {
                return Err(AttemptError::Fatal(GrantError::Fetch {
                    resource: resource.to_string(),
                    source,
                }));
            },
        };

        debug!(
            %resource,
            existing = policy.bindings.len(),
            etag = %policy.etag,
            "appending binding to fetched policy"
        );
        policy.bindings.push(binding.clone());
        policy.version = CONDITIONAL_POLICY_VERSION;

        let written = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled()),
            written = self.writer.set_policy(resource, policy) => written,
        };
        match written {
            Ok(_) => Ok(()),
            Err(e) if e.is_conflict() => Err(AttemptError::Conflict),
            Err(source) => Err(AttemptError::Fatal(GrantError::Write {
                resource: resource.to_string(),
                source,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use elevate_core::{ApprovalStatus, BackendError, IamPolicy, RoleId};
    use elevate_test::{
        FixedClock, MockIam, TEST_PROJECT, owner_binding, owner_policy_document, test_approval,
        test_request, viewer_binding,
    };

    const EXPIRY: &str = "2024-04-28T02:00:00Z";

    fn approval(requestor: &str, role: &str, resource: &str) -> EscalationApproval {
        test_approval(
            test_request(requestor, role, resource),
            "approver@example.com",
            ApprovalStatus::Approved,
        )
    }

    fn manager(iam: &Arc<MockIam>) -> GrantManager {
        GrantManager::new(
            iam.clone(),
            iam.clone(),
            Arc::new(FixedClock::test_time()),
            &EngineConfig::new("example.com"),
        )
    }

    fn expected_binding(member: &str, role: &str) -> Binding {
        Binding {
            role: RoleId::new(role),
            members: vec![format!("user:{member}")],
            condition: Some(Expr {
                description: format!("Grant {role} on {member} until {EXPIRY}"),
                expression: format!("request.time < timestamp(\"{EXPIRY}\")"),
                title: format!("Until: {EXPIRY}"),
            }),
        }
    }

    #[test]
    fn test_conditional_binding_shape() {
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);
        let expires_at = FixedClock::test_time()
            .now()
            .checked_add_signed(chrono::Duration::hours(2))
            .unwrap();
        assert_eq!(
            conditional_binding(&a, expires_at),
            expected_binding("bob@example.com", "roles/editor")
        );
    }

    #[tokio::test]
    async fn test_grant_appends_to_existing_bindings() {
        let iam = Arc::new(MockIam::with_policy(owner_policy_document()));
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);

        let receipt = manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 1);
        assert_eq!(receipt.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true), EXPIRY);

        let written = iam.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].version, 3);
        assert_eq!(
            written[0].bindings,
            vec![
                owner_binding(),
                viewer_binding(),
                expected_binding("bob@example.com", "roles/editor"),
            ]
        );
    }

    #[tokio::test]
    async fn test_grant_keeps_etag_from_fetch() {
        let iam = Arc::new(MockIam::with_policy(owner_policy_document()));
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);
        manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap();

        // The mock bumps the etag on write; the document it received carried
        // the fetched one, which the backend uses for conflict detection.
        let fetched = iam.fetched();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].0.to_string(), TEST_PROJECT);
        assert_eq!(fetched[0].1.requested_policy_version, 3);
    }

    #[tokio::test]
    async fn test_duplicate_role_gets_separate_conditional_binding() {
        let mut doc = owner_policy_document();
        doc.bindings.push(Binding {
            role: RoleId::new("roles/owner2"),
            members: vec!["user:bar@example.com".to_string()],
            condition: None,
        });
        let iam = Arc::new(MockIam::with_policy(doc));
        let a = approval("foo@example.com", "roles/owner2", TEST_PROJECT);
        manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap();

        let written = iam.written();
        assert_eq!(written[0].bindings.len(), 4);
        assert_eq!(
            written[0].bindings[3],
            expected_binding("foo@example.com", "roles/owner2")
        );
        assert!(written[0].bindings[2].condition.is_none());
    }

    #[tokio::test]
    async fn test_missing_policy_aborts_without_write() {
        let iam = Arc::new(MockIam::without_policy());
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);
        let err = manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GrantError::NoExistingPolicy { .. }));
        assert_eq!(iam.write_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_resource_aborts_before_fetch() {
        let iam = Arc::new(MockIam::with_policy(owner_policy_document()));
        let a = approval("bob@example.com", "roles/editor", "folders/123");
        let err = manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GrantError::InvalidResource(_)));
        assert_eq!(iam.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_non_conflict_fetch_error_is_fatal() {
        let iam = Arc::new(
            MockIam::with_policy(owner_policy_document())
                .fail_fetch(BackendError::Unavailable("connection reset".to_string())),
        );
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);
        let err = manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GrantError::Fetch {
                source: BackendError::Unavailable(_),
                ..
            }
        ));
        assert_eq!(iam.fetch_count(), 1);
        assert_eq!(iam.write_count(), 0);
    }

    #[tokio::test]
    async fn test_non_conflict_write_error_is_fatal() {
        let iam = Arc::new(MockIam::with_policy(owner_policy_document()).fail_write(
            BackendError::Rejected {
                status: 400,
                message: "Conditions can't be set on primitive roles".to_string(),
            },
        ));
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);
        let err = manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GrantError::Write {
                source: BackendError::Rejected { status: 400, .. },
                ..
            }
        ));
        assert_eq!(iam.fetch_count(), 1);
        assert_eq!(iam.write_count(), 1);
        assert_eq!(iam.current(), Some(owner_policy_document()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_conflicts_are_retried_with_backoff() {
        let conflict = || BackendError::Conflict("409".to_string());
        let iam = Arc::new(
            MockIam::with_policy(owner_policy_document())
                .fail_fetch(conflict())
                .fail_fetch(conflict()),
        );
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);

        let start = tokio::time::Instant::now();
        let receipt = manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 3);
        assert_eq!(iam.fetch_count(), 3);
        assert_eq!(iam.write_count(), 1);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_conflicts_refetch_before_rewriting() {
        let other = Binding {
            role: RoleId::new("roles/browser"),
            members: vec!["user:carol@example.com".to_string()],
            condition: None,
        };
        let iam = Arc::new(
            MockIam::with_policy(owner_policy_document())
                .lose_write_race(other.clone())
                .fail_write(BackendError::Conflict("409".to_string())),
        );
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);

        let start = tokio::time::Instant::now();
        let receipt = manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 3);
        assert_eq!(iam.fetch_count(), 3);
        assert_eq!(iam.write_count(), 3);
        assert!(start.elapsed() >= Duration::from_secs(10));

        // The concurrent writer's binding survives; ours is appended once.
        let final_doc = iam.current().unwrap();
        assert_eq!(
            final_doc.bindings,
            vec![
                owner_binding(),
                viewer_binding(),
                other,
                expected_binding("bob@example.com", "roles/editor"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_then_write_conflict_refetches_each_attempt() {
        let iam = Arc::new(
            MockIam::with_policy(owner_policy_document())
                .fail_fetch(BackendError::Conflict("409".to_string()))
                .fail_write(BackendError::Conflict("409".to_string())),
        );
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);

        let receipt = manager(&iam)
            .grant(&a, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 3);
        assert_eq!(iam.fetch_count(), 3);
        assert_eq!(iam.write_count(), 2);
        assert!(
            iam.fetched()
                .iter()
                .all(|(_, options)| options.requested_policy_version == 3)
        );

        let written = iam.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].bindings.len(), 3);
        assert_eq!(
            written[0].bindings[2],
            expected_binding("bob@example.com", "roles/editor")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let iam = Arc::new(
            MockIam::with_policy(owner_policy_document())
                .fail_fetch(BackendError::Conflict("409".to_string())),
        );
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);
        let cancel = CancellationToken::new();
        let manager = manager(&iam);

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = manager.grant(&a, &cancel).await.unwrap_err();
        assert!(matches!(err, GrantError::Cancelled { attempts: 1 }));
        assert_eq!(iam.write_count(), 0);
    }

    /// A backend that never answers.
    struct HangingIam;

    #[async_trait]
    impl PolicyReader for HangingIam {
        async fn get_policy(
            &self,
            _resource: &ResourceRef,
            _options: &GetPolicyOptions,
        ) -> Result<Option<IamPolicy>, BackendError> {
            std::future::pending().await
        }
    }

    #[async_trait]
    impl PolicyWriter for HangingIam {
        async fn set_policy(
            &self,
            _resource: &ResourceRef,
            _policy: IamPolicy,
        ) -> Result<IamPolicy, BackendError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backend_call() {
        let iam = Arc::new(HangingIam);
        let manager = GrantManager::new(
            iam.clone(),
            iam,
            Arc::new(FixedClock::test_time()),
            &EngineConfig::new("example.com"),
        );
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = manager.grant(&a, &cancel).await.unwrap_err();
        assert!(matches!(err, GrantError::Cancelled { attempts: 1 }));
    }

    #[tokio::test]
    async fn test_expiry_uses_configured_duration() {
        let iam = Arc::new(MockIam::with_policy(owner_policy_document()));
        let manager = GrantManager::new(
            iam.clone(),
            iam.clone(),
            Arc::new(FixedClock::test_time()),
            &EngineConfig::new("example.com").with_grant_duration_hours(8),
        );
        let a = approval("bob@example.com", "roles/editor", TEST_PROJECT);
        let receipt = manager.grant(&a, &CancellationToken::new()).await.unwrap();
        assert_eq!(
            receipt.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "2024-04-28T08:00:00Z"
        );
        let cond = receipt.binding.condition.unwrap();
        assert_eq!(cond.expression, "request.time < timestamp(\"2024-04-28T08:00:00Z\")");
    }
}
