//! Clean parsed applications, drop the ones with too little data, and keep the
//! most recent application per address.

use std::collections::HashSet;

use notary_common::VerifierApplication;

/// Applications with fewer populated fields than this are discarded.
pub const MIN_VALID_FIELDS: usize = 4;

/// Trim string fields and null out placeholder values.
pub fn normalize_application(app: VerifierApplication) -> VerifierApplication {
    let organization = clean(app.organization).filter(|org| {
        !org.eq_ignore_ascii_case("n/a") && !org.eq_ignore_ascii_case("none")
    });
    let website_and_social = clean(app.website_and_social).filter(|w| w != "n/a");

    VerifierApplication {
        issue_number: app.issue_number,
        address_id: clean(app.address_id),
        address_key: clean(app.address_key),
        name: clean(app.name),
        organization,
        region: app.region,
        website_and_social,
    }
}

pub fn is_valid_application(app: &VerifierApplication) -> bool {
    app.populated_fields() >= MIN_VALID_FIELDS
}

/// Newest issue first, then one application per address. The key is the ID
/// address when present, else the key address. Applications carrying neither
/// are all kept.
pub fn dedupe_applications(mut apps: Vec<VerifierApplication>) -> Vec<VerifierApplication> {
    apps.sort_by(|a, b| b.issue_number.cmp(&a.issue_number));

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_keys: HashSet<String> = HashSet::new();

    apps.into_iter()
        .filter(|app| match (&app.address_id, &app.address_key) {
            (Some(id), _) => seen_ids.insert(id.clone()),
            (None, Some(key)) => seen_keys.insert(key.clone()),
            (None, None) => true,
        })
        .collect()
}

/// Full normalization pass: clean, drop invalid, dedupe.
pub fn normalize(apps: Vec<VerifierApplication>) -> Vec<VerifierApplication> {
    let total = apps.len();
    let valid: Vec<_> = apps
        .into_iter()
        .map(normalize_application)
        .filter(is_valid_application)
        .collect();
    let invalid = total - valid.len();

    let deduped = dedupe_applications(valid);
    tracing::info!(
        total,
        invalid,
        kept = deduped.len(),
        "Normalized verifier applications"
    );
    deduped
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
