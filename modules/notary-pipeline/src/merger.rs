//! Reconcile parsed applications with the registry and compute per-verifier
//! statistics.
//!
//! Every pass is a plain function over an owned list so the stage runner (and
//! tests) can compose them one at a time. `merge` runs them in pipeline order.

use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat};
use num_bigint::BigInt;
use regex::Regex;
use tracing::info;

use notary_common::{
    parse_amount, Datacap, ExternalAllowance, ExternalVerifiedClient, ExternalVerifierRecord,
    Verifier, VerifierApplication, VerifierStats, VerifierStatus,
};

use crate::ttd::{time_to_datacap, LdnSignatures};

/// Unix time of the first Filecoin block.
pub const FILECOIN_GENESIS_UNIX: i64 = 1_598_306_400;
/// Seconds per chain epoch.
pub const EPOCH_SECONDS: i64 = 30;

static AUDIT_TRAIL_ISSUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)([0-9]+)$").unwrap());

/// Everything the registry API contributed to one run.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub verifiers: Vec<ExternalVerifierRecord>,
    pub verified_clients: Vec<ExternalVerifiedClient>,
    pub allowances: Vec<ExternalAllowance>,
}

/// Issue number at the end of an audit trail (usually the issue URL).
pub fn audit_trail_issue_number(audit_trail: &str) -> Option<u64> {
    AUDIT_TRAIL_ISSUE_RE
        .captures(audit_trail)
        .and_then(|c| c[1].parse().ok())
}

fn same(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

fn matches_by_address(address_id: &Option<String>, address_key: &Option<String>, record: &ExternalVerifierRecord) -> bool {
    same(address_id, &record.address_id) || same(address_key, &record.address)
}

// --- Passes ---

/// Keep applications the registry knows about, by either address or by the
/// issue number in the record's audit trail.
pub fn filter_registered(
    apps: Vec<VerifierApplication>,
    records: &[ExternalVerifierRecord],
) -> Vec<VerifierApplication> {
    let audited: HashSet<u64> = records
        .iter()
        .filter_map(|r| r.audit_trail.as_deref())
        .filter_map(audit_trail_issue_number)
        .collect();

    apps.into_iter()
        .filter(|app| {
            audited.contains(&app.issue_number)
                || records
                    .iter()
                    .any(|r| matches_by_address(&app.address_id, &app.address_key, r))
        })
        .collect()
}

/// Attach the first registry record matching by either address. Unmatched
/// applications get no record.
pub fn attach_records(
    apps: Vec<VerifierApplication>,
    records: &[ExternalVerifierRecord],
) -> Vec<Verifier> {
    apps.into_iter()
        .map(|app| {
            let record = records
                .iter()
                .find(|r| matches_by_address(&app.address_id, &app.address_key, r))
                .cloned();
            Verifier {
                from_interplanetary_one: record,
                ..Verifier::from_application(app)
            }
        })
        .collect()
}

/// Most active first: verified client count, then initial allowance, both
/// descending. Verifiers without the value sort after those with it.
pub fn order_by_activity(mut verifiers: Vec<Verifier>) -> Vec<Verifier> {
    // Reverse(None) sorts after every Reverse(Some(_)).
    verifiers.sort_by_cached_key(|v| {
        let record = v.from_interplanetary_one.as_ref();
        let count = record.and_then(|r| r.verified_clients_count);
        let allowance: Option<BigInt> = record
            .and_then(|r| r.initial_allowance.as_deref())
            .and_then(parse_amount);
        (Reverse(count), Reverse(allowance))
    });
    verifiers
}

/// Attach the registry's verified clients whose verifier is this verifier.
pub fn attach_verified_clients(
    verifiers: Vec<Verifier>,
    clients: &[ExternalVerifiedClient],
) -> Vec<Verifier> {
    verifiers
        .into_iter()
        .map(|v| {
            let attached = clients
                .iter()
                .filter(|c| same(&c.verifier_address_id, &v.address_id))
                .cloned()
                .collect();
            Verifier {
                verified_clients_from_interplanetary_one: attached,
                ..v
            }
        })
        .collect()
}

pub fn attach_ttd(verifiers: Vec<Verifier>, ldn: &LdnSignatures) -> Vec<Verifier> {
    verifiers
        .into_iter()
        .map(|v| {
            let ttd_averages = time_to_datacap(
                v.address_id.as_deref(),
                &v.verified_clients_from_interplanetary_one,
            );
            let ldn_ttd_averages = ldn.averages_for(v.address_id.as_deref());
            Verifier {
                ttd_averages,
                ldn_ttd_averages,
                ..v
            }
        })
        .collect()
}

/// Fastest first by raw TTD average. Verifiers without an average go last,
/// in their existing order.
pub fn sort_by_ttd(mut verifiers: Vec<Verifier>) -> Vec<Verifier> {
    verifiers.sort_by(|a, b| {
        match (a.ttd_averages.average_ttd_raw, b.ttd_averages.average_ttd_raw) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    verifiers
}

/// First occurrence per ID address wins. Verifiers without one are kept.
pub fn dedupe_by_address_id(verifiers: Vec<Verifier>) -> Vec<Verifier> {
    let mut seen = HashSet::new();
    verifiers
        .into_iter()
        .filter(|v| match &v.address_id {
            Some(id) => seen.insert(id.clone()),
            None => true,
        })
        .collect()
}

/// Chain height to an ISO-8601 UTC timestamp with milliseconds.
pub fn height_to_timestamp(height: i64) -> Option<String> {
    let unix = height.checked_mul(EPOCH_SECONDS)?.checked_add(FILECOIN_GENESIS_UNIX)?;
    DateTime::from_timestamp(unix, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Total, allocated and available datacap. `None` unless both registry
/// amounts parse.
pub fn datacap(record: &ExternalVerifierRecord) -> Option<Datacap> {
    let total = parse_amount(record.initial_allowance.as_deref()?)?;
    let available = parse_amount(record.allowance.as_deref()?)?;
    let allocated = &total - &available;
    Some(Datacap {
        total: total.to_string(),
        allocated: allocated.to_string(),
        available: available.to_string(),
    })
}

/// Derived output fields: creation time, status, datacap, stats, client
/// count and issue link.
pub fn shape_output(verifiers: Vec<Verifier>, issue_url: impl Fn(u64) -> String) -> Vec<Verifier> {
    verifiers
        .into_iter()
        .map(|v| {
            let record = v.from_interplanetary_one.as_ref();
            let created_at = v
                .created_at
                .clone()
                .or_else(|| record.and_then(|r| r.created_at_height).and_then(height_to_timestamp));
            let status = if record.is_some_and(|r| r.removed) {
                VerifierStatus::Removed
            } else {
                VerifierStatus::Active
            };
            let clients_count = record
                .and_then(|r| r.verified_clients_count)
                .unwrap_or(v.verified_clients_from_interplanetary_one.len() as u64);

            Verifier {
                created_at,
                status,
                has_datacap: record.and_then(datacap),
                has_stats: Some(VerifierStats {
                    time_to_datacap: v.ttd_averages.clone(),
                    ldn_time_to_datacap: v.ldn_ttd_averages.clone(),
                }),
                clients_count,
                issue_url: Some(issue_url(v.issue_number)),
                ..v
            }
        })
        .collect()
}

/// Drop multisig accounts; they are LDN notary groups, not individual verifiers.
pub fn exclude_multisig(verifiers: Vec<Verifier>) -> Vec<Verifier> {
    verifiers.into_iter().filter(|v| !v.is_multisig()).collect()
}

/// All merge passes in order. Applications should already carry resolved
/// addresses.
pub fn merge(
    apps: Vec<VerifierApplication>,
    registry: &RegistrySnapshot,
    issue_url: impl Fn(u64) -> String,
) -> Vec<Verifier> {
    let total = apps.len();
    let registered = filter_registered(apps, &registry.verifiers);
    let matched = registered.len();

    let verifiers = attach_records(registered, &registry.verifiers);
    let verifiers = order_by_activity(verifiers);
    let verifiers = attach_verified_clients(verifiers, &registry.verified_clients);

    let ldn = LdnSignatures::from_allowances(&registry.allowances);
    let verifiers = attach_ttd(verifiers, &ldn);
    let verifiers = dedupe_by_address_id(sort_by_ttd(verifiers));
    let deduped = verifiers.len();

    let verifiers = exclude_multisig(shape_output(verifiers, issue_url));

    info!(
        applications = total,
        registered = matched,
        unique = deduped,
        ldn_signers = ldn.signers(),
        kept = verifiers.len(),
        "Merged applications with registry"
    );
    verifiers
}
