//! Environment variable fallbacks.
//!
//! Recognized variables are turned into a TOML overlay that sits between the
//! embedded defaults and the config files. Any value set in a file wins.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::types::PolicyRuleSection;

/// Trusted identity domain.
pub const TRUSTED_DOMAIN: &str = "ELEVATE_TRUSTED_DOMAIN";
/// Grant duration in hours.
pub const GRANT_DURATION_HOURS: &str = "ELEVATE_GRANT_DURATION_HOURS";
/// Conflict retry interval in seconds.
pub const RETRY_INTERVAL_SECS: &str = "ELEVATE_RETRY_INTERVAL_SECS";
/// Base log level.
pub const LOG_LEVEL: &str = "ELEVATE_LOG_LEVEL";
/// Policy rules as JSON.
pub const POLICY_RULES: &str = "ELEVATE_POLICY_RULES";
/// Use the in-memory backend (`true`/`false`, `1`/`0`).
pub const MOCK_BACKEND: &str = "ELEVATE_MOCK_BACKEND";

/// Snapshot the `ELEVATE_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("ELEVATE_"))
        .collect()
}

/// The two accepted shapes of [`POLICY_RULES`].
#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyRulesJson {
    Wrapped { policy_rules: Vec<PolicyRuleSection> },
    Bare(Vec<PolicyRuleSection>),
}

impl PolicyRulesJson {
    fn into_rules(self) -> Vec<PolicyRuleSection> {
        match self {
            Self::Wrapped { policy_rules } => policy_rules,
            Self::Bare(rules) => rules,
        }
    }
}

/// Build the overlay for the recognized variables in `env`.
///
/// Returns the overlay and the names of the variables that contributed to
/// it, sorted.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse or
/// the policy JSON is malformed.
pub fn env_overlay(env: &HashMap<String, String>) -> ConfigResult<(toml::Value, Vec<String>)> {
    let mut auth = toml::Table::new();
    let mut grant = toml::Table::new();
    let mut logging = toml::Table::new();
    let mut policy = toml::Table::new();
    let mut backend = toml::Table::new();
    let mut applied = Vec::new();

    if let Some(domain) = non_empty(env, TRUSTED_DOMAIN) {
        auth.insert("trusted_domain".to_owned(), domain.into());
        applied.push(TRUSTED_DOMAIN.to_owned());
    }

    if let Some(raw) = non_empty(env, GRANT_DURATION_HOURS) {
        let hours = parse_integer(GRANT_DURATION_HOURS, raw)?;
        grant.insert("duration_hours".to_owned(), hours.into());
        applied.push(GRANT_DURATION_HOURS.to_owned());
    }

    if let Some(raw) = non_empty(env, RETRY_INTERVAL_SECS) {
        let secs = parse_integer(RETRY_INTERVAL_SECS, raw)?;
        grant.insert("retry_interval_secs".to_owned(), secs.into());
        applied.push(RETRY_INTERVAL_SECS.to_owned());
    }

    if let Some(level) = non_empty(env, LOG_LEVEL) {
        logging.insert("level".to_owned(), level.into());
        applied.push(LOG_LEVEL.to_owned());
    }

    if let Some(raw) = non_empty(env, POLICY_RULES) {
        let rules = serde_json::from_str::<PolicyRulesJson>(raw)
            .map_err(|e| ConfigError::EnvError {
                var: POLICY_RULES.to_owned(),
                message: format!(
                    "expected {{\"policy_rules\": [...]}} or a JSON array of rules: {e}"
                ),
            })?
            .into_rules();
        let rules = toml::Value::try_from(rules).map_err(|e| ConfigError::EnvError {
            var: POLICY_RULES.to_owned(),
            message: e.to_string(),
        })?;
        policy.insert("rules".to_owned(), rules);
        applied.push(POLICY_RULES.to_owned());
    }

    if let Some(raw) = non_empty(env, MOCK_BACKEND) {
        backend.insert("mock".to_owned(), parse_bool(MOCK_BACKEND, raw)?.into());
        applied.push(MOCK_BACKEND.to_owned());
    }

    let mut root = toml::Table::new();
    for (name, table) in [
        ("auth", auth),
        ("grant", grant),
        ("logging", logging),
        ("policy", policy),
        ("backend", backend),
    ] {
        if !table.is_empty() {
            root.insert(name.to_owned(), toml::Value::Table(table));
        }
    }

    applied.sort();
    Ok((toml::Value::Table(root), applied))
}

fn non_empty<'a>(env: &'a HashMap<String, String>, var: &str) -> Option<&'a str> {
    env.get(var).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_integer(var: &str, raw: &str) -> ConfigResult<i64> {
    raw.parse::<i64>().map_err(|e| ConfigError::EnvError {
        var: var.to_owned(),
        message: format!("'{raw}' is not an integer: {e}"),
    })
}

fn parse_bool(var: &str, raw: &str) -> ConfigResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::EnvError {
            var: var.to_owned(),
            message: format!("'{raw}' is not a boolean"),
        }),
    }
}
