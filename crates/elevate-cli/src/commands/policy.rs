//! Policy command - inspect and evaluate the escalation policy offline.
//!
//! Nothing here talks to the directory or the IAM backend. `check` takes
//! the requestor's groups on the command line instead of resolving them.

use std::fmt::Write as _;

use anyhow::Context;
use elevate_core::{GroupSet, Policy, PolicyOptions, ResourceId, ResourceRef, RoleId};

/// Result of evaluating one request against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CheckOutcome {
    /// Rule at this index (zero-based, load order) permits the request.
    Allowed(usize),
    /// No single rule permits the request.
    Denied,
}

/// Evaluate `role` on `resource` for members of `groups`.
pub(crate) fn check(policy: &Policy, groups: &[String], role: &str, resource: &str) -> CheckOutcome {
    let groups: GroupSet = groups.iter().map(|g| g.as_str().into()).collect();
    match policy.matching_rule(&groups, &RoleId::new(role), &ResourceId::new(resource)) {
        Some((index, _)) => CheckOutcome::Allowed(index),
        None => CheckOutcome::Denied,
    }
}

/// Human-readable verdict for [`check`].
pub(crate) fn render_check(outcome: &CheckOutcome) -> String {
    match outcome {
        CheckOutcome::Allowed(index) => format!("allowed by rule #{index}"),
        CheckOutcome::Denied => "denied: no single rule covers the group, role and resource".to_owned(),
    }
}

/// Render the deduplicated groups, roles and resources.
pub(crate) fn render_options(options: &PolicyOptions, json: bool) -> anyhow::Result<String> {
    if json {
        return serde_json::to_string_pretty(options).context("failed to serialize policy options");
    }

    let mut out = String::new();
    for (title, values) in [
        ("Groups", options.groups.iter().map(ToString::to_string).collect::<Vec<_>>()),
        ("Roles", options.roles.iter().map(ToString::to_string).collect()),
        ("Resources", options.resources.iter().map(ToString::to_string).collect()),
    ] {
        writeln!(out, "{title}:")?;
        if values.is_empty() {
            writeln!(out, "  (none)")?;
        }
        for value in values {
            writeln!(out, "  {value}")?;
        }
    }
    Ok(out)
}

/// Check that every resource can be addressed and summarize the policy.
///
/// The config loader already checked the shape of each rule; this runs the
/// same parser the grant path uses.
pub(crate) fn validate_policy(policy: &Policy) -> anyhow::Result<String> {
    for (index, rule) in policy.rules().iter().enumerate() {
        for resource in &rule.resources {
            ResourceRef::parse(resource)
                .with_context(|| format!("rule #{index} names an unusable resource"))?;
        }
    }

    if policy.is_empty() {
        return Ok("policy OK: no rules, every request will be denied".to_owned());
    }

    let options = policy.options();
    Ok(format!(
        "policy OK: {} rules covering {} groups, {} roles, {} resources",
        policy.rules().len(),
        options.groups.len(),
        options.roles.len(),
        options.resources.len()
    ))
}
