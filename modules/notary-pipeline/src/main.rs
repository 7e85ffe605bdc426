use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use github_client::GithubClient;
use glif_client::GlifClient;
use notary_common::Config;
use notary_pipeline::{stages, AddressResolver};

const DEFAULT_LOG_FILTER: &str =
    "notary_pipeline=info,notary_common=info,glif_client=info,github_client=info";

#[derive(Parser)]
#[command(
    name = "notary-pipeline",
    about = "Reconcile Filecoin notary applications with the on-chain verifier registry"
)]
struct Cli {
    /// Root of the raw/processed/generated artifact tree (overrides NOTARY_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download every governance issue with its comments
    FetchIssues,
    /// Extract verifier applications from the downloaded issues
    ParseIssues,
    /// Resolve ID and key addresses for every application
    AddressMapping,
    /// Merge applications with registry data and publish the verifier list
    Verifiers,
    /// Run parse-issues, address-mapping and verifiers in order
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    config.log_redacted();

    let paths = config.paths();
    let issue_url = |n: u64| config.issue_url(n);

    match cli.command {
        Command::FetchIssues => {
            let token = config
                .github_token
                .as_deref()
                .context("GITHUB_TOKEN is required to fetch issues")?;
            let github = GithubClient::with_api_url(
                &config.github_api_url,
                token,
                &config.github_owner,
                &config.github_repo,
            )?;
            stages::fetch_issues(&github, &paths).await?;
        }
        Command::ParseIssues => {
            stages::parse_issues(&paths)?;
        }
        Command::AddressMapping => {
            let resolver = build_resolver(&config)?;
            stages::address_mapping(&resolver, &paths).await?;
        }
        Command::Verifiers => {
            stages::verifiers(&paths, issue_url)?;
        }
        Command::All => {
            let resolver = build_resolver(&config)?;
            let published = stages::run_all(&resolver, &paths, issue_url).await?;
            tracing::info!(published, "Pipeline complete");
        }
    }

    Ok(())
}

fn build_resolver(config: &Config) -> Result<AddressResolver> {
    let glif = GlifClient::new(&config.glif_api_endpoint)
        .context("Failed to build address RPC client")?;
    Ok(AddressResolver::new(Arc::new(glif), &config.resolver))
}
