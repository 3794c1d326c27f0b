//! Config command - inspect the resolved configuration.

use std::path::Path;

use elevate_config::{ResolvedConfig, ShowFormat};

/// Render the merged configuration, preceded by the layers it came from.
pub(crate) fn show_config(resolved: &ResolvedConfig, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(resolved.render(ShowFormat::Json)?);
    }

    let mut out = String::from("# Resolved from (lowest precedence first):\n");
    for source in resolved.sources() {
        out.push_str("#   ");
        out.push_str(&source);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&resolved.render(ShowFormat::Toml)?);
    Ok(out)
}

/// Where configuration is looked up.
pub(crate) fn show_paths(user_config: &Path) -> String {
    format!(
        "User config:  {}\nEnvironment:  ELEVATE_TRUSTED_DOMAIN, ELEVATE_GRANT_DURATION_HOURS, \
         ELEVATE_RETRY_INTERVAL_SECS, ELEVATE_LOG_LEVEL, ELEVATE_POLICY_RULES",
        user_config.display()
    )
}
