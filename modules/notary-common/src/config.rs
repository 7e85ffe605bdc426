use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::NotaryError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // GitHub
    pub github_token: Option<String>,
    pub github_owner: String,
    pub github_repo: String,
    pub github_api_url: String,

    // Address resolution
    pub glif_api_endpoint: String,
    pub resolver: ResolverSettings,

    // Artifacts
    pub data_dir: PathBuf,
}

/// Worker pool, rate limit and retry tuning for the address resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    /// Lookups in flight at once.
    pub concurrency: usize,
    /// Rolling window for the rate limit.
    pub interval: Duration,
    /// Lookups allowed to start within one window.
    pub interval_cap: usize,
    /// Retries after the first attempt.
    pub retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_factor: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            concurrency: 2,
            interval: Duration::from_millis(500),
            interval_cap: 5,
            retries: 3,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
            backoff_factor: 2,
        }
    }
}

impl Config {
    /// Load configuration from environment variables. Only malformed numeric
    /// values are an error; everything else has a default.
    pub fn from_env() -> Result<Self, NotaryError> {
        let defaults = ResolverSettings::default();
        let resolver = ResolverSettings {
            concurrency: parsed_env("RESOLVER_CONCURRENCY", defaults.concurrency)?.max(1),
            interval: Duration::from_millis(parsed_env(
                "RESOLVER_INTERVAL_MS",
                defaults.interval.as_millis() as u64,
            )?),
            interval_cap: parsed_env("RESOLVER_INTERVAL_CAP", defaults.interval_cap)?.max(1),
            retries: parsed_env("RESOLVER_RETRIES", defaults.retries)?,
            min_backoff: Duration::from_millis(parsed_env(
                "RESOLVER_MIN_BACKOFF_MS",
                defaults.min_backoff.as_millis() as u64,
            )?),
            max_backoff: Duration::from_millis(parsed_env(
                "RESOLVER_MAX_BACKOFF_MS",
                defaults.max_backoff.as_millis() as u64,
            )?),
            backoff_factor: parsed_env("RESOLVER_BACKOFF_FACTOR", defaults.backoff_factor)?,
        };

        Ok(Self {
            github_token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            github_owner: env_or("GITHUB_OWNER", "filecoin-project"),
            github_repo: env_or("GITHUB_REPO", "notary-governance"),
            github_api_url: env_or("GITHUB_API_URL", "https://api.github.com"),
            glif_api_endpoint: env_or("GLIF_API_ENDPOINT", "https://api.node.glif.io/rpc/v0"),
            resolver,
            data_dir: PathBuf::from(env_or("NOTARY_DATA_DIR", "./data")),
        })
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(&self.data_dir)
    }

    /// Web URL of a governance issue.
    pub fn issue_url(&self, issue_number: u64) -> String {
        format!(
            "https://github.com/{}/{}/issues/{}",
            self.github_owner, self.github_repo, issue_number
        )
    }

    /// Log the loaded config without the token.
    pub fn log_redacted(&self) {
        tracing::info!(
            github_owner = %self.github_owner,
            github_repo = %self.github_repo,
            github_token = if self.github_token.is_some() { "[set]" } else { "[unset]" },
            glif_api_endpoint = %self.glif_api_endpoint,
            data_dir = %self.data_dir.display(),
            concurrency = self.resolver.concurrency,
            interval_ms = self.resolver.interval.as_millis() as u64,
            interval_cap = self.resolver.interval_cap,
            retries = self.resolver.retries,
            "Loaded config"
        );
    }
}

/// Every artifact the pipeline reads or writes, rooted at the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub raw_issues: PathBuf,
    pub registry_verifiers: PathBuf,
    pub registry_verified_clients: PathBuf,
    pub registry_allowances: PathBuf,
    pub parsed_applications: PathBuf,
    pub address_mapping: PathBuf,
    pub verifiers: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path) -> Self {
        let raw = data_dir.join("raw");
        let processed = data_dir.join("processed");
        let generated = data_dir.join("generated");
        Self {
            raw_issues: raw.join("notary-governance-issues.json"),
            registry_verifiers: raw.join("interplanetaryone-verifiers.json"),
            registry_verified_clients: raw.join("interplanetaryone-verified-clients.json"),
            registry_allowances: raw.join("interplanetaryone-allowances.json"),
            parsed_applications: processed.join("notary-governance-issues.json"),
            address_mapping: generated.join("address-mapping.json"),
            verifiers: generated.join("verifiers.json"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T, NotaryError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| NotaryError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
