//! Request and approve commands - run the escalation flow end to end.
//!
//! Both commands go through the real authorizer, approval gate and grant
//! manager. The directory and IAM store are the in-memory ones from
//! [`crate::memory`], so each run starts from freshly seeded documents.

use std::sync::Arc;

use anyhow::{Context, bail};
use elevate_approval::{ApprovalGate, ApprovalOutcome, Authorizer, EngineConfig, GrantManager};
use elevate_config::Config;
use elevate_core::{
    ApprovalStatus, EscalationApproval, EscalationRequest, IamPolicy, Identity, ResourceRef,
    SystemClock,
};
use tokio_util::sync::CancellationToken;

use crate::bridge;
use crate::memory::{MemoryDirectory, MemoryIam};

/// The wired-up engine.
pub(crate) struct Engine {
    config: EngineConfig,
    authorizer: Authorizer,
    gate: ApprovalGate,
    iam: Arc<MemoryIam>,
}

impl Engine {
    /// Build the engine over the backend selected in `[backend]`.
    pub(crate) fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        if !cfg.backend.mock {
            bail!(
                "no IAM backend configured; set `[backend] mock = true` or pass --mock to use the in-memory backend"
            );
        }

        let config = bridge::to_engine_config(cfg);
        let directory = Arc::new(MemoryDirectory::new(
            cfg.backend.mock_groups.iter().map(String::as_str),
        ));
        let iam = Arc::new(MemoryIam::new(&Identity::new(format!(
            "owner@{}",
            config.trusted_domain
        ))));

        let authorizer = Authorizer::new(Arc::new(bridge::to_policy(cfg)), directory, &config);
        let grants = GrantManager::new(iam.clone(), iam.clone(), Arc::new(SystemClock), &config);
        let gate = ApprovalGate::new(authorizer.clone(), grants);

        Ok(Self {
            config,
            authorizer,
            gate,
            iam,
        })
    }
}

/// Result of `elevate request`.
#[derive(Debug)]
pub(crate) enum RequestOutcome {
    /// The rule at this index permits the request.
    Authorized {
        rule: usize,
        request: EscalationRequest,
    },
    /// No rule permits the request.
    Denied(EscalationRequest),
}

/// Authorize a new request stamped with the current time.
pub(crate) async fn request(
    engine: &Engine,
    requestor: &str,
    role: &str,
    resource: &str,
    reason: &str,
) -> anyhow::Result<RequestOutcome> {
    let mut request = EscalationRequest::new(requestor, role, resource, reason);
    if !engine.authorizer.authorize(&mut request).await? {
        return Ok(RequestOutcome::Denied(request));
    }

    let rule = engine
        .authorizer
        .policy()
        .matching_rule(&request.groups, &request.role, &request.resource)
        .map(|(index, _)| index)
        .context("authorized request matched no rule")?;
    Ok(RequestOutcome::Authorized { rule, request })
}

/// Render a [`RequestOutcome`]. An authorized request prints the payload to
/// hand to `elevate approve`.
pub(crate) fn render_request(outcome: &RequestOutcome, json: bool) -> anyhow::Result<String> {
    match outcome {
        RequestOutcome::Authorized { rule, request } => {
            let payload =
                serde_json::to_string_pretty(request).context("failed to serialize request")?;
            if json {
                Ok(payload)
            } else {
                Ok(format!(
                    "authorized by rule #{rule}; send this payload to an approver:\n{payload}"
                ))
            }
        },
        RequestOutcome::Denied(request) => Ok(format!(
            "denied: no single rule grants {} on {} to {}",
            request.role, request.resource, request.requestor
        )),
    }
}

/// What `elevate approve` did.
#[derive(Debug)]
pub(crate) struct ApproveReport {
    pub(crate) approval: EscalationApproval,
    pub(crate) outcome: ApprovalOutcome,
    /// The resource's policy after the decision, if it was read at all.
    pub(crate) document: Option<IamPolicy>,
}

/// Validate `approver`'s decision on the request `payload` and apply it.
pub(crate) async fn approve(
    engine: &Engine,
    payload: &str,
    approver: &str,
    status: ApprovalStatus,
    cancel: &CancellationToken,
) -> anyhow::Result<ApproveReport> {
    let request: EscalationRequest =
        serde_json::from_str(payload).context("request payload is not a valid request")?;
    let mut approval = EscalationApproval::new(request, approver, status);

    let outcome = engine.gate.validate_approval(&mut approval, cancel).await?;
    let document = ResourceRef::parse(&approval.request.resource)
        .ok()
        .and_then(|resource| engine.iam.document(&resource));

    Ok(ApproveReport {
        approval,
        outcome,
        document,
    })
}

/// Render an [`ApproveReport`].
pub(crate) fn render_approve(
    report: &ApproveReport,
    engine: &Engine,
    json: bool,
) -> anyhow::Result<String> {
    let message = report
        .outcome
        .status()
        .outcome_text(engine.config.grant_duration_hours);

    if json {
        let expires_at = match &report.outcome {
            ApprovalOutcome::Granted(receipt) => Some(receipt.expires_at.to_rfc3339()),
            ApprovalOutcome::Denied => None,
        };
        let value = serde_json::json!({
            "status": report.outcome.status(),
            "message": message,
            "expires_at": expires_at,
            "policy": report.document,
        });
        return serde_json::to_string_pretty(&value).context("failed to serialize approval");
    }

    match &report.outcome {
        ApprovalOutcome::Granted(receipt) => Ok(format!(
            "{message}\n{} bound to {} on {} until {}",
            receipt.binding.role,
            report.approval.request.requestor,
            report.approval.request.resource,
            receipt.expires_at.to_rfc3339()
        )),
        ApprovalOutcome::Denied => Ok(message),
    }
}
