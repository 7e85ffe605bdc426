//! Time-to-datacap statistics.
//!
//! Two averages per verifier: one over its directly verified clients (issue
//! opened to allocation message), one over its LDN allowance signatures.

use std::collections::HashMap;

use notary_common::{ExternalAllowance, ExternalVerifiedClient, TtdAverages};

/// Mean of the samples rounded to whole seconds, with a humanized form.
/// No samples means no average, never zero.
pub fn averages(samples: &[i64]) -> TtdAverages {
    if samples.is_empty() {
        return TtdAverages::default();
    }

    let sum: i128 = samples.iter().map(|&s| s as i128).sum();
    let mean = (sum as f64 / samples.len() as f64).round() as i64;
    TtdAverages {
        average_ttd: Some(humanize(mean)),
        average_ttd_raw: Some(mean),
    }
}

/// Seconds from issue creation to allocation for every client that counts:
/// both timestamps set and nonzero, allocation after the issue, and not a
/// self-allocation by the verifier.
pub fn client_ttd_samples(verifier_address_id: &str, clients: &[ExternalVerifiedClient]) -> Vec<i64> {
    clients
        .iter()
        .filter(|c| c.address_id.as_deref() != Some(verifier_address_id))
        .filter_map(|c| match (c.issue_create_timestamp, c.create_message_timestamp) {
            (Some(issued), Some(created)) if issued != 0 && created != 0 && created > issued => {
                Some(created - issued)
            }
            _ => None,
        })
        .collect()
}

/// TTD averages for a verifier over its attached clients. A verifier without
/// an ID address has nothing to compare against.
pub fn time_to_datacap(
    verifier_address_id: Option<&str>,
    clients: &[ExternalVerifiedClient],
) -> TtdAverages {
    match verifier_address_id {
        Some(id) => averages(&client_ttd_samples(id, clients)),
        None => TtdAverages::default(),
    }
}

/// LDN operation durations grouped by signing verifier ID address. Signers
/// with no recorded duration (or zero) are skipped.
#[derive(Debug, Clone, Default)]
pub struct LdnSignatures {
    by_signer: HashMap<String, Vec<i64>>,
}

impl LdnSignatures {
    pub fn from_allowances(allowances: &[ExternalAllowance]) -> Self {
        let mut by_signer: HashMap<String, Vec<i64>> = HashMap::new();
        for signer in allowances.iter().flat_map(|a| &a.signers) {
            let (Some(address_id), Some(ttd)) = (&signer.address_id, signer.operation_ttd) else {
                continue;
            };
            if ttd == 0 {
                continue;
            }
            by_signer.entry(address_id.clone()).or_default().push(ttd);
        }
        Self { by_signer }
    }

    pub fn signers(&self) -> usize {
        self.by_signer.len()
    }

    pub fn averages_for(&self, verifier_address_id: Option<&str>) -> TtdAverages {
        verifier_address_id
            .and_then(|id| self.by_signer.get(id))
            .map(|samples| averages(samples))
            .unwrap_or_default()
    }
}

/// Relative duration wording: "a few seconds", "3 hours", "a month", ...
///
/// Each unit is the whole duration rounded in that unit; the first
/// threshold that holds picks the wording.
pub fn humanize(seconds: i64) -> String {
    let secs = seconds.unsigned_abs() as f64;
    let minutes = (secs / 60.0).round();
    let hours = (secs / 3_600.0).round();
    let days_exact = secs / 86_400.0;
    let days = days_exact.round();
    let months_exact = days_exact * 4_800.0 / 146_097.0;
    let months = months_exact.round();
    let years = (months_exact / 12.0).round();

    if secs.round() < 45.0 {
        "a few seconds".to_string()
    } else if minutes <= 1.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{minutes} minutes")
    } else if hours <= 1.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{hours} hours")
    } else if days <= 1.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{days} days")
    } else if months <= 1.0 {
        "a month".to_string()
    } else if months < 11.0 {
        format!("{months} months")
    } else if years <= 1.0 {
        "a year".to_string()
    } else {
        format!("{years} years")
    }
}
