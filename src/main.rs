//! AWS Kill Switch - Standalone Binary
//!
//! Contains a compromised AWS account from the command line or a job runner.
//!
//! ## Usage
//!
//! ```bash
//! # Strip every policy from a role and delete it
//! killswitch run --action delete_role --target-account-id 111122223333 \
//!     --assumed-role-name KillSwitchRole --target-identity-name compromised-role
//!
//! # Lock down an account with the SCP from switch.conf
//! killswitch --config switch.conf run --action apply_scp --target-account-id 111122223333 \
//!     --assumed-role-name OrgAdmin --org-management-account-id 999988887777
//!
//! # Request as JSON on stdin, outcome as JSON
//! echo '{"action":"detach_policies",...}' | killswitch run --request - --output json
//!
//! # Check a request without touching AWS
//! killswitch validate --request request.json
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use killswitch::config::DEFAULT_CONFIG_FILE;
use killswitch::{AwsSessionFactory, Dispatcher, FileConfigSource, KillSwitchError, RemediationRequest};

/// AWS Kill Switch - contain a compromised AWS account
#[derive(Parser, Debug)]
#[command(name = "killswitch", version, about, long_about = None)]
struct Cli {
    /// Switch config file holding the containment SCP
    #[arg(long, global = true, env = "KILLSWITCH_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "KILLSWITCH_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and execute a remediation request
    Run {
        #[command(flatten)]
        request: RequestArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Validate a request and print the resolved plan; makes no AWS calls
    Validate {
        #[command(flatten)]
        request: RequestArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output: OutputFormat,
    },
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// JSON request file, or "-" to read from stdin
    #[arg(
        long,
        conflicts_with_all = [
            "action",
            "target_account_id",
            "assumed_role_name",
            "target_identity_name",
            "org_management_account_id",
        ]
    )]
    request: Option<PathBuf>,

    /// apply_scp, detach_policies or delete_role
    #[arg(long)]
    action: Option<String>,

    /// Account to contain
    #[arg(long)]
    target_account_id: Option<String>,

    /// Role assumed in the target (or management) account
    #[arg(long, alias = "role-to-assume")]
    assumed_role_name: Option<String>,

    /// Role to strip (detach_policies, delete_role)
    #[arg(long, alias = "target-role-name")]
    target_identity_name: Option<String>,

    /// Organization management account (apply_scp)
    #[arg(long, alias = "org-management-account")]
    org_management_account_id: Option<String>,

    /// AWS region for the session (default: us-east-1)
    #[arg(long)]
    region: Option<String>,
}

impl RequestArgs {
    fn into_request(self) -> Result<RemediationRequest> {
        let mut request = match &self.request {
            Some(path) => {
                let body = if path.as_os_str() == "-" {
                    let mut body = String::new();
                    std::io::stdin()
                        .read_to_string(&mut body)
                        .context("Failed to read request from stdin")?;
                    body
                } else {
                    std::fs::read_to_string(path)
                        .with_context(|| format!("Failed to read request from {}", path.display()))?
                };
                serde_json::from_str::<RemediationRequest>(&body)
                    .context("Failed to parse request JSON")?
            }
            None => RemediationRequest {
                action: self.action.unwrap_or_default(),
                target_account_id: self.target_account_id.unwrap_or_default(),
                assumed_role_name: self.assumed_role_name.unwrap_or_default(),
                target_identity_name: self.target_identity_name,
                org_management_account_id: self.org_management_account_id,
                region: None,
            },
        };

        if self.region.is_some() {
            request.region = self.region;
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Print a failure in the requested format and turn it into the exit error
fn report_failure(err: KillSwitchError, output: OutputFormat) -> anyhow::Error {
    if err.is_validation() {
        warn!(kind = err.kind(), error = %err, "Request rejected; no AWS calls were made");
    } else {
        error!(kind = err.kind(), error = %err, "Remediation failed");
    }

    if let OutputFormat::Json = output {
        let body = serde_json::json!({
            "error": err.to_string(),
            "kind": err.kind(),
        });
        println!("{}", body);
    }

    anyhow::Error::new(err)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let dispatcher = Dispatcher::new(
        Arc::new(AwsSessionFactory),
        Arc::new(FileConfigSource::new(&cli.config)),
    );

    match cli.command {
        Commands::Validate { request, output } => {
            let request = request.into_request()?;
            let plan = dispatcher
                .plan(&request)
                .map_err(|e| report_failure(e, output))?;

            match output {
                OutputFormat::Text => println!("{}", plan.display()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?
                ),
            }
            info!("✅ Request is valid");
        }

        Commands::Run { request, output } => {
            let request = request.into_request()?;

            warn!(
                action = %request.action,
                target_account_id = %request.target_account_id,
                "🚨 Kill switch engaged"
            );

            let outcome = dispatcher
                .dispatch(&request)
                .await
                .map_err(|e| report_failure(e, output))?;

            match output {
                OutputFormat::Text => println!("{}", outcome),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
                ),
            }
            info!(action = %outcome.action, "✅ Remediation complete");
        }
    }

    Ok(())
}
