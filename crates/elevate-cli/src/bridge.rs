//! Bridge from `elevate_config::Config` to domain types.

use std::time::Duration;

use elevate_approval::EngineConfig;
use elevate_config::Config;
use elevate_core::{Policy, PolicyRule};
use elevate_telemetry::{LogConfig, LogFormat};

/// Convert the `[[policy.rules]]` entries into a [`Policy`].
#[must_use]
pub fn to_policy(cfg: &Config) -> Policy {
    Policy::new(
        cfg.policy
            .rules
            .iter()
            .map(|rule| {
                PolicyRule::new(
                    rule.groups.iter().map(String::as_str),
                    rule.roles.iter().map(String::as_str),
                    rule.resources.iter().map(String::as_str),
                )
            })
            .collect(),
    )
}

/// Convert `[auth]` and `[grant]` into an [`EngineConfig`].
#[must_use]
pub fn to_engine_config(cfg: &Config) -> EngineConfig {
    EngineConfig::new(cfg.auth.trusted_domain.trim())
        .with_grant_duration_hours(cfg.grant.duration_hours)
        .with_retry_interval(Duration::from_secs(cfg.grant.retry_interval_secs))
}

/// Convert `[logging]` into a [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);
    let mut log_config = LogConfig::new(cfg.logging.level.to_ascii_lowercase()).with_format(format);
    if let Some(dir) = &cfg.logging.file_dir {
        log_config = log_config.with_file_logging(dir);
    }
    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }
    log_config
}
