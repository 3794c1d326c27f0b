//! Configuration types.
//!
//! These types do not depend on any other elevate crate. Policy rules are
//! mirrored as plain strings here and converted to domain types by the
//! binary. Every section implements [`Default`], so a bare `[section]`
//! header produces a working configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity domain checks.
    pub auth: AuthSection,
    /// Grant duration and contention handling.
    pub grant: GrantSection,
    /// Log level, format and output.
    pub logging: LoggingSection,
    /// Escalation policy rules.
    pub policy: PolicySection,
    /// Which directory and IAM backends the binary talks to.
    pub backend: BackendSection,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `[auth]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Requestors and approvers must have an address in this domain.
    pub trusted_domain: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            trusted_domain: "example.com".to_owned(),
        }
    }
}

/// `[grant]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantSection {
    /// Hours a granted role stays active.
    pub duration_hours: u32,
    /// Seconds to wait before retrying after an IAM conflict.
    pub retry_interval_secs: u64,
}

impl Default for GrantSection {
    fn default() -> Self {
        Self {
            duration_hours: 2,
            retry_interval_secs: 5,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base log level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`).
    pub format: String,
    /// Extra filter directives, e.g. `elevate_approval=debug`.
    pub directives: Vec<String>,
    /// Write logs to daily-rotated files in this directory instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_dir: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
            file_dir: None,
        }
    }
}

/// `[policy]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Rules, each written as a `[[policy.rules]]` table.
    pub rules: Vec<PolicyRuleSection>,
}

/// `[backend]`
///
/// Only the in-memory backend ships with the binary. `request` and `approve`
/// refuse to run unless `mock` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Use the in-memory directory and IAM store.
    pub mock: bool,
    /// Groups every identity resolves to in mock mode.
    pub mock_groups: Vec<String>,
}

/// One `[[policy.rules]]` entry.
///
/// A request is allowed when a single rule lists one of the requestor's
/// groups, the role and the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRuleSection {
    /// Groups whose members may use this rule.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Roles this rule allows.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Resources (`projects/<id>` or `organizations/<id>`) this rule covers.
    #[serde(default)]
    pub resources: Vec<String>,
}
