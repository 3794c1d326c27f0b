//! Post-merge configuration validation.
//!
//! Runs on the fully merged and deserialized [`Config`](crate::Config).
//! The first problem found is reported.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound on a single grant, one week.
pub const MAX_GRANT_DURATION_HOURS: u32 = 168;

/// Upper bound on the conflict retry interval.
pub const MAX_RETRY_INTERVAL_SECS: u64 = 300;

/// Resource kinds the IAM backend can address.
pub const RESOURCE_KINDS: &[&str] = &["projects", "organizations"];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns the first [`ConfigError::ValidationError`] found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_auth(config)?;
    validate_grant(config)?;
    validate_logging(config)?;
    validate_policy(config)?;
    validate_backend(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_auth(config: &Config) -> ConfigResult<()> {
    let domain = config.auth.trusted_domain.trim();
    if domain.is_empty() {
        return Err(invalid("auth.trusted_domain", "must not be empty"));
    }
    if domain.contains('@') {
        return Err(invalid(
            "auth.trusted_domain",
            format!("'{domain}' must be a bare domain without '@'"),
        ));
    }
    Ok(())
}

fn validate_grant(config: &Config) -> ConfigResult<()> {
    let g = &config.grant;
    if !(1..=MAX_GRANT_DURATION_HOURS).contains(&g.duration_hours) {
        return Err(invalid(
            "grant.duration_hours",
            format!("must be between 1 and {MAX_GRANT_DURATION_HOURS}"),
        ));
    }
    if !(1..=MAX_RETRY_INTERVAL_SECS).contains(&g.retry_interval_secs) {
        return Err(invalid(
            "grant.retry_interval_secs",
            format!("must be between 1 and {MAX_RETRY_INTERVAL_SECS}"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&l.format.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    if l.file_dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
        return Err(invalid("logging.file_dir", "must not be empty when set"));
    }
    Ok(())
}

fn validate_policy(config: &Config) -> ConfigResult<()> {
    for (i, rule) in config.policy.rules.iter().enumerate() {
        for (name, values) in [
            ("groups", &rule.groups),
            ("roles", &rule.roles),
            ("resources", &rule.resources),
        ] {
            let field = format!("policy.rules[{i}].{name}");
            if values.is_empty() {
                return Err(invalid(field, "must list at least one entry"));
            }
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(invalid(field, "entries must not be empty"));
            }
        }
        for resource in &rule.resources {
            check_resource(resource)
                .map_err(|message| invalid(format!("policy.rules[{i}].resources"), message))?;
        }
    }
    Ok(())
}

fn validate_backend(config: &Config) -> ConfigResult<()> {
    if config.backend.mock_groups.iter().any(|g| g.trim().is_empty()) {
        return Err(invalid("backend.mock_groups", "entries must not be empty"));
    }
    Ok(())
}

/// Check that `resource` has the `<kind>/<id>` shape.
fn check_resource(resource: &str) -> Result<(), String> {
    let (kind, id) = resource
        .split_once('/')
        .ok_or_else(|| format!("'{resource}' is not of the form <kind>/<id>"))?;
    if !RESOURCE_KINDS.contains(&kind) {
        return Err(format!(
            "'{resource}' has unsupported kind '{kind}'; expected one of: {}",
            RESOURCE_KINDS.join(", ")
        ));
    }
    if id.is_empty() || id.contains('/') {
        return Err(format!("'{resource}' has an invalid id '{id}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PolicyRuleSection;

    fn rule(resources: &[&str]) -> PolicyRuleSection {
        PolicyRuleSection {
            groups: vec!["on-call@example.com".to_owned()],
            roles: vec!["roles/owner".to_owned()],
            resources: resources.iter().map(|r| (*r).to_owned()).collect(),
        }
    }

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_domain() {
        let mut config = Config::default();
        config.auth.trusted_domain = "  ".to_owned();
        assert_eq!(field_of(validate(&config)), "auth.trusted_domain");
    }

    #[test]
    fn test_domain_with_at_sign() {
        let mut config = Config::default();
        config.auth.trusted_domain = "@example.com".to_owned();
        assert_eq!(field_of(validate(&config)), "auth.trusted_domain");
    }

    #[test]
    fn test_zero_duration() {
        let mut config = Config::default();
        config.grant.duration_hours = 0;
        assert_eq!(field_of(validate(&config)), "grant.duration_hours");
    }

    #[test]
    fn test_duration_upper_bound() {
        let mut config = Config::default();
        config.grant.duration_hours = MAX_GRANT_DURATION_HOURS;
        assert!(validate(&config).is_ok());
        config.grant.duration_hours = 169;
        assert_eq!(field_of(validate(&config)), "grant.duration_hours");
    }

    #[test]
    fn test_retry_interval_bounds() {
        let mut config = Config::default();
        config.grant.retry_interval_secs = 0;
        assert_eq!(field_of(validate(&config)), "grant.retry_interval_secs");
        config.grant.retry_interval_secs = 301;
        assert_eq!(field_of(validate(&config)), "grant.retry_interval_secs");
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".to_owned();
        config.logging.format = "Json".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_valid_rules() {
        let mut config = Config::default();
        config.policy.rules = vec![rule(&["projects/testing", "organizations/0000000000"])];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rule_without_groups() {
        let mut config = Config::default();
        let mut r = rule(&["projects/testing"]);
        r.groups.clear();
        config.policy.rules = vec![rule(&["projects/a"]), r];
        assert_eq!(field_of(validate(&config)), "policy.rules[1].groups");
    }

    #[test]
    fn test_rule_with_blank_role() {
        let mut config = Config::default();
        let mut r = rule(&["projects/testing"]);
        r.roles.push(String::new());
        config.policy.rules = vec![r];
        assert_eq!(field_of(validate(&config)), "policy.rules[0].roles");
    }

    #[test]
    fn test_unsupported_resource_kind() {
        let mut config = Config::default();
        config.policy.rules = vec![rule(&["folders/123"])];
        assert_eq!(field_of(validate(&config)), "policy.rules[0].resources");
    }

    #[test]
    fn test_blank_mock_group() {
        let mut config = Config::default();
        config.backend.mock_groups = vec!["on-call@example.com".to_owned(), " ".to_owned()];
        assert_eq!(field_of(validate(&config)), "backend.mock_groups");
    }

    #[test]
    fn test_malformed_resource() {
        for bad in ["testing", "projects/", "projects/a/b"] {
            let mut config = Config::default();
            config.policy.rules = vec![rule(&[bad])];
            assert_eq!(
                field_of(validate(&config)),
                "policy.rules[0].resources",
                "{bad} should be rejected"
            );
        }
    }
}
