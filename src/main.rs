use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use dscreen_agent_lib::config::AgentConfig;
use dscreen_agent_lib::permissions::fixture::FixtureHost;
use dscreen_agent_lib::permissions::{self, PermissionGate, PermissionRequest};
use dscreen_agent_lib::utils::logging;

#[derive(Parser, Debug)]
#[command(name = "dscreen-agent", version, about = "Distributed screen permission agent")]
struct Cli {
    /// JSON config file; DSCREEN_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check and request permissions against a fixture host
    Grant {
        /// Host fixture (falls back to DSCREEN_FIXTURE)
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Target bundle; defaults to the host's own bundle
        #[arg(long)]
        bundle: Option<String>,

        #[arg(long)]
        user_id: Option<i32>,

        /// Permission names; defaults to the distributed screen set
        permissions: Vec<String>,
    },
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = AgentConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Grant {
            fixture,
            bundle,
            user_id,
            permissions,
        } => run_grant(&config, fixture, bundle, user_id, permissions).await,
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_grant(
    config: &AgentConfig,
    fixture: Option<PathBuf>,
    bundle: Option<String>,
    user_id: Option<i32>,
    names: Vec<String>,
) -> Result<()> {
    let fixture = fixture
        .or_else(|| config.fixture_path.clone())
        .ok_or_else(|| anyhow!("no fixture given (use --fixture or DSCREEN_FIXTURE)"))?;
    let host = Arc::new(FixtureHost::from_file(&fixture)?);

    let mut request = if names.is_empty() {
        permissions::distributed_screen_request()
    } else {
        PermissionRequest::new(names)
    };
    if let Some(bundle) = bundle.or_else(|| config.bundle_name.clone()) {
        request = request.with_bundle_name(bundle);
    }
    if let Some(user_id) = user_id {
        request = request.with_user_id(user_id);
    }

    let gate = PermissionGate::new(host.clone(), host.clone()).with_config(config);
    let report = gate
        .grant(host.as_ref(), &request, Some(Box::new(|| log::debug!("grant cycle complete"))))
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.all_granted() {
        log::warn!("Missing permissions: {}", report.denied().join(", "));
    }
    Ok(())
}
