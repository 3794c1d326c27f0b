//! Elevate CLI - inspect configuration and evaluate the escalation policy.
//!
//! The binary loads the layered configuration, builds the domain policy
//! through [`bridge`], and answers questions about it. `request` and
//! `approve` run the full escalation flow against the in-memory backend.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elevate_config::{Config, ResolvedConfig};
use elevate_core::ApprovalStatus;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod bridge;
mod commands;
mod memory;

use commands::{config, escalate, policy};

/// Elevate - policy-gated, time-bound privilege grants
#[derive(Parser)]
#[command(name = "elevate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Additional config file, overriding every other layer
    #[arg(short, long, global = true, env = "ELEVATE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON where supported
    #[arg(long, global = true)]
    json: bool,

    /// Use the in-memory directory and IAM backend
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect and evaluate the escalation policy
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },

    /// Request a time-bound role and print the payload for an approver
    Request {
        /// Who is asking for the role
        #[arg(long)]
        requestor: String,

        /// Role to request
        #[arg(short, long)]
        role: String,

        /// Resource, e.g. `projects/my-project` or `organizations/123`
        #[arg(long)]
        resource: String,

        /// Justification shown to the approver
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Approve or deny a request payload and apply the decision
    Approve {
        /// File holding the request payload, `-` for stdin
        #[arg(long = "request", value_name = "FILE")]
        payload: PathBuf,

        /// Who is deciding
        #[arg(long)]
        approver: String,

        /// Deny instead of approve
        #[arg(long)]
        deny: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration and where it came from
    Show,
    /// Show where configuration is looked up
    Paths,
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// List every group, role and resource the policy mentions
    Options,

    /// Check whether members of the given groups may request a role
    Check {
        /// Directory group of the requestor (repeatable)
        #[arg(short, long = "group", required = true)]
        groups: Vec<String>,

        /// Role to request
        #[arg(short, long)]
        role: String,

        /// Resource, e.g. `projects/my-project` or `organizations/123`
        #[arg(long)]
        resource: String,
    },

    /// Validate the policy and summarize it
    Validate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Paths don't need a valid config.
    if let Commands::Config {
        command: ConfigCommands::Paths,
    } = cli.command
    {
        let path = elevate_config::loader::default_user_config_path()?;
        println!("{}", config::show_paths(&path));
        return Ok(ExitCode::SUCCESS);
    }

    let mut resolved = load_config(&cli)?;
    if cli.mock {
        resolved.config.backend.mock = true;
    }
    init_logging(&resolved, cli.verbose);
    debug!(files = ?resolved.loaded_files, env = ?resolved.env_vars, "configuration loaded");

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                print!("{}", config::show_config(&resolved, cli.json)?);
                Ok(ExitCode::SUCCESS)
            },
            ConfigCommands::Paths => Ok(ExitCode::SUCCESS),
        },
        Commands::Policy { command } => handle_policy(command, &resolved, cli.json),
        Commands::Request {
            requestor,
            role,
            resource,
            reason,
        } => handle_request(&resolved, &requestor, &role, &resource, &reason, cli.json).await,
        Commands::Approve {
            payload,
            approver,
            deny,
        } => handle_approve(&resolved, &payload, &approver, deny, cli.json).await,
    }
}

async fn handle_request(
    resolved: &ResolvedConfig,
    requestor: &str,
    role: &str,
    resource: &str,
    reason: &str,
    json: bool,
) -> Result<ExitCode> {
    let engine = escalate::Engine::from_config(&resolved.config)?;
    let outcome = escalate::request(&engine, requestor, role, resource, reason).await?;
    println!("{}", escalate::render_request(&outcome, json)?);
    Ok(match outcome {
        escalate::RequestOutcome::Authorized { .. } => ExitCode::SUCCESS,
        escalate::RequestOutcome::Denied(_) => ExitCode::FAILURE,
    })
}

async fn handle_approve(
    resolved: &ResolvedConfig,
    payload: &Path,
    approver: &str,
    deny: bool,
    json: bool,
) -> Result<ExitCode> {
    let engine = escalate::Engine::from_config(&resolved.config)?;
    let payload = read_payload(payload)?;
    let status = if deny {
        ApprovalStatus::Denied
    } else {
        ApprovalStatus::Approved
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling grant");
            on_interrupt.cancel();
        }
    });

    let report = escalate::approve(&engine, &payload, approver, status, &cancel).await?;
    println!("{}", escalate::render_approve(&report, &engine, json)?);
    Ok(ExitCode::SUCCESS)
}

fn read_payload(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("failed to read request payload from stdin")?;
        return Ok(payload);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request payload from {}", path.display()))
}

fn handle_policy(command: PolicyCommands, resolved: &ResolvedConfig, json: bool) -> Result<ExitCode> {
    let policy = bridge::to_policy(&resolved.config);
    match command {
        PolicyCommands::Options => {
            print!("{}", policy::render_options(&policy.options(), json)?);
            Ok(ExitCode::SUCCESS)
        },
        PolicyCommands::Check {
            groups,
            role,
            resource,
        } => {
            let outcome = policy::check(&policy, &groups, &role, &resource);
            println!("{}", policy::render_check(&outcome));
            Ok(match outcome {
                policy::CheckOutcome::Allowed(_) => ExitCode::SUCCESS,
                policy::CheckOutcome::Denied => ExitCode::FAILURE,
            })
        },
        PolicyCommands::Validate => {
            println!("{}", policy::validate_policy(&policy)?);
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn load_config(cli: &Cli) -> Result<ResolvedConfig> {
    Config::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration with {}", path.display()),
        None => "failed to load configuration".to_owned(),
    })
}

fn init_logging(resolved: &ResolvedConfig, verbose: bool) {
    let mut log_config = bridge::to_log_config(&resolved.config);
    if verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = elevate_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_policy_check() {
        let cli = Cli::try_parse_from([
            "elevate",
            "policy",
            "check",
            "--group",
            "oncall@co",
            "-g",
            "dba@co",
            "--role",
            "roles/x",
            "--resource",
            "organizations/1",
        ])
        .unwrap();

        match cli.command {
            Commands::Policy {
                command:
                    PolicyCommands::Check {
                        groups,
                        role,
                        resource,
                    },
            } => {
                assert_eq!(groups, vec!["oncall@co", "dba@co"]);
                assert_eq!(role, "roles/x");
                assert_eq!(resource, "organizations/1");
            },
            _ => panic!("expected policy check"),
        }
    }

    #[test]
    fn policy_check_requires_a_group() {
        let result = Cli::try_parse_from([
            "elevate",
            "policy",
            "check",
            "--role",
            "roles/x",
            "--resource",
            "organizations/1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_approve_with_mock() {
        let cli = Cli::try_parse_from([
            "elevate",
            "approve",
            "--request",
            "-",
            "--approver",
            "bob@co",
            "--deny",
            "--mock",
        ])
        .unwrap();

        assert!(cli.mock);
        match cli.command {
            Commands::Approve {
                payload,
                approver,
                deny,
            } => {
                assert_eq!(payload, PathBuf::from("-"));
                assert_eq!(approver, "bob@co");
                assert!(deny);
            },
            _ => panic!("expected approve"),
        }
    }

    #[test]
    fn request_reason_defaults_to_empty() {
        let cli = Cli::try_parse_from([
            "elevate",
            "request",
            "--requestor",
            "alice@co",
            "-r",
            "roles/x",
            "--resource",
            "organizations/1",
        ])
        .unwrap();
        match cli.command {
            Commands::Request { reason, .. } => assert!(reason.is_empty()),
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn read_payload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(read_payload(&path).unwrap(), "{}");
        assert!(read_payload(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["elevate", "config", "show", "--config", "/tmp/e.toml", "--json"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/e.toml")));
        assert!(cli.json);
    }
}
