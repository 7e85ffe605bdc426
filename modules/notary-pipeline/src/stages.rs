//! Batch stages. Each reads its declared inputs from disk, does its work, and
//! writes its artifact before returning, so a later failure never loses an
//! earlier stage's output.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use github_client::Issue;
use notary_common::{
    AddressIdentity, DataPaths, ExternalAllowance, ExternalVerifiedClient, ExternalVerifierRecord,
    RegistryResponse, VerifierApplication,
};

use crate::assembler::assemble;
use crate::mapping::{apply_mapping, build_mapping, prefill_from_registry};
use crate::merger::{merge, RegistrySnapshot};
use crate::resolver::{AddressCache, AddressResolver};
use crate::store::{read_json, write_json};
use crate::traits::IssueSource;
use crate::{extractor, normalizer};

/// Pull every governance issue and store it as the raw issues artifact.
pub async fn fetch_issues(source: &dyn IssueSource, paths: &DataPaths) -> Result<usize> {
    let issues = source
        .fetch_all_issues()
        .await
        .context("Failed to fetch governance issues")?;
    write_json(&paths.raw_issues, &issues)?;
    info!(count = issues.len(), path = %paths.raw_issues.display(), "Stored raw issues");
    Ok(issues.len())
}

/// Extract and normalize applications from the raw issues.
pub fn parse_issues(paths: &DataPaths) -> Result<Vec<VerifierApplication>> {
    let issues: Vec<Issue> = read_json(&paths.raw_issues)?;
    let parsed = extractor::parse_issues(&issues);
    let applications = normalizer::normalize(parsed);

    write_json(&paths.parsed_applications, &applications)?;
    info!(
        issues = issues.len(),
        applications = applications.len(),
        "Parsed governance issues"
    );
    Ok(applications)
}

/// Resolve both address forms for every application and store the mapping.
///
/// The mapping is written even when some lookups failed; the failures are
/// then reported as an error.
pub async fn address_mapping(
    resolver: &AddressResolver,
    paths: &DataPaths,
) -> Result<Vec<AddressIdentity>> {
    let applications: Vec<VerifierApplication> = read_json(&paths.parsed_applications)?;
    let registry: RegistryResponse<ExternalVerifierRecord> = read_json(&paths.registry_verifiers)?;

    let identities = prefill_from_registry(&applications, &registry.data);
    let pending = identities
        .iter()
        .filter(|i| i.address_id.is_none() != i.address_key.is_none())
        .count();
    info!(
        applications = applications.len(),
        pending, "Prefilled addresses from registry"
    );

    let cache = AddressCache::new();
    let outcome = resolver.resolve(identities, &cache).await;
    let complete = outcome.ensure_complete();
    let mapping = build_mapping(outcome.identities);

    write_json(&paths.address_mapping, &mapping)?;
    info!(entries = mapping.len(), path = %paths.address_mapping.display(), "Stored address mapping");

    complete?;
    Ok(mapping)
}

/// Merge applications with the registry and store the published verifier list.
pub fn verifiers(paths: &DataPaths, issue_url: impl Fn(u64) -> String) -> Result<Vec<Value>> {
    let applications: Vec<VerifierApplication> = read_json(&paths.parsed_applications)?;
    let mapping: Vec<AddressIdentity> = read_json(&paths.address_mapping)?;
    let verifiers: RegistryResponse<ExternalVerifierRecord> = read_json(&paths.registry_verifiers)?;
    let verified_clients: RegistryResponse<ExternalVerifiedClient> =
        read_json(&paths.registry_verified_clients)?;
    let allowances: RegistryResponse<ExternalAllowance> = read_json(&paths.registry_allowances)?;

    let registry = RegistrySnapshot {
        verifiers: verifiers.data,
        verified_clients: verified_clients.data,
        allowances: allowances.data,
    };
    let applications = apply_mapping(applications, &mapping);
    let merged = merge(applications, &registry, issue_url);
    let published = assemble(merged)?;

    write_json(&paths.verifiers, &published)?;
    info!(count = published.len(), path = %paths.verifiers.display(), "Stored verifiers");
    Ok(published)
}

/// Parse, map and merge in sequence. Fetching stays a separate step.
pub async fn run_all(
    resolver: &AddressResolver,
    paths: &DataPaths,
    issue_url: impl Fn(u64) -> String,
) -> Result<usize> {
    parse_issues(paths).context("parse-issues stage failed")?;
    address_mapping(resolver, paths)
        .await
        .context("address-mapping stage failed")?;
    let published = verifiers(paths, issue_url).context("verifiers stage failed")?;
    Ok(published.len())
}
