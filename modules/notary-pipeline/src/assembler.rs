//! Final filtering and deterministic serialization of the verifier list.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::info;

use notary_common::Verifier;

static TEST_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)testing.*deleted").unwrap());

/// Whether a verifier belongs in the published list: it needs a real name
/// and at least one address.
pub fn is_publishable(verifier: &Verifier) -> bool {
    let named = match verifier.name.as_deref().map(str::trim) {
        None | Some("") => false,
        Some(name) => !name.eq_ignore_ascii_case("n/a") && !TEST_ENTRY_RE.is_match(name),
    };
    named && !(verifier.address_id.is_none() && verifier.address_key.is_none())
}

/// Rebuild a JSON value with every object's keys in lexicographic order.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Drop unpublishable entries and emit each record with sorted keys, keeping
/// list order.
pub fn assemble(verifiers: Vec<Verifier>) -> Result<Vec<Value>> {
    let total = verifiers.len();
    let records = verifiers
        .into_iter()
        .filter(is_publishable)
        .map(|v| serde_json::to_value(v).map(sort_keys))
        .collect::<Result<Vec<_>, _>>()?;

    info!(total, published = records.len(), "Assembled verifiers");
    Ok(records)
}
