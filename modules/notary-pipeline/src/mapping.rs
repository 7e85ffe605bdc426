//! The address mapping artifact: every verifier's ID address paired with its
//! key address.

use std::collections::{BTreeMap, HashMap};

use notary_common::{AddressIdentity, ExternalVerifierRecord, VerifierApplication};

/// Fill whichever address form an application lacks from the registry, before
/// anything goes to the network.
pub fn prefill_from_registry(
    apps: &[VerifierApplication],
    records: &[ExternalVerifierRecord],
) -> Vec<AddressIdentity> {
    apps.iter()
        .map(|app| {
            let mut identity = app.identity();
            match (&identity.address_id, &identity.address_key) {
                (None, Some(key)) => {
                    identity.address_id = records
                        .iter()
                        .find(|r| r.address.as_deref() == Some(key))
                        .and_then(|r| r.address_id.clone());
                }
                (Some(id), None) => {
                    identity.address_key = records
                        .iter()
                        .find(|r| r.address_id.as_deref() == Some(id))
                        .and_then(|r| r.address.clone());
                }
                _ => {}
            }
            identity
        })
        .collect()
}

/// Fully resolved identities only, one per ID address, sorted by ID address.
/// The first pairing seen for an ID address wins.
pub fn build_mapping(identities: Vec<AddressIdentity>) -> Vec<AddressIdentity> {
    let mut by_id: BTreeMap<String, AddressIdentity> = BTreeMap::new();
    for identity in identities.into_iter().filter(AddressIdentity::is_resolved) {
        if let Some(id) = identity.address_id.clone() {
            by_id.entry(id).or_insert(identity);
        }
    }
    by_id.into_values().collect()
}

/// Fill missing address forms on applications from a previously built mapping.
pub fn apply_mapping(
    apps: Vec<VerifierApplication>,
    mapping: &[AddressIdentity],
) -> Vec<VerifierApplication> {
    let key_for_id: HashMap<&str, &str> = mapping
        .iter()
        .filter_map(|m| Some((m.address_id.as_deref()?, m.address_key.as_deref()?)))
        .collect();
    let mut id_for_key: HashMap<&str, &str> = HashMap::new();
    for m in mapping {
        if let (Some(id), Some(key)) = (m.address_id.as_deref(), m.address_key.as_deref()) {
            id_for_key.entry(key).or_insert(id);
        }
    }

    apps.into_iter()
        .map(|mut app| {
            match (&app.address_id, &app.address_key) {
                (None, Some(key)) => {
                    app.address_id = id_for_key.get(key.as_str()).map(|id| id.to_string());
                }
                (Some(id), None) => {
                    app.address_key = key_for_id.get(id.as_str()).map(|key| key.to_string());
                }
                _ => {}
            }
            app
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &str = "f1k6wwevxvp466ybil7y2scqlhtnrz5atjkkyvm4a";
    const KEY_B: &str = "f3vfs6f7tagrcpnwv65wq3leznbajqyg77bmijrpvoyjv3zjyi3urq25vigfbs";

    fn app(address_id: Option<&str>, address_key: Option<&str>) -> VerifierApplication {
        VerifierApplication {
            issue_number: 1,
            address_id: address_id.map(String::from),
            address_key: address_key.map(String::from),
            name: None,
            organization: None,
            region: Vec::new(),
            website_and_social: None,
        }
    }

    fn record(address_id: &str, address: &str) -> ExternalVerifierRecord {
        ExternalVerifierRecord {
            address_id: Some(address_id.to_string()),
            address: Some(address.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn prefill_fills_from_registry_pairs() {
        let records = vec![record("f01000", KEY_A)];
        let out = prefill_from_registry(
            &[app(Some("f01000"), None), app(None, Some(KEY_A)), app(None, Some(KEY_B)), app(None, None)],
            &records,
        );
        assert_eq!(out[0], AddressIdentity::new(Some("f01000"), Some(KEY_A)));
        assert_eq!(out[1], AddressIdentity::new(Some("f01000"), Some(KEY_A)));
        assert_eq!(out[2], AddressIdentity::new(None, Some(KEY_B)));
        assert_eq!(out[3], AddressIdentity::default());
    }

    #[test]
    fn mapping_is_validated_deduplicated_and_sorted() {
        let mapping = build_mapping(vec![
            AddressIdentity::new(Some("f02000"), Some(KEY_B)),
            AddressIdentity::new(Some("f01000"), Some(KEY_A)),
            AddressIdentity::new(Some("f01000"), Some(KEY_A)),
            AddressIdentity::new(Some("f03000"), None),
            AddressIdentity::new(Some("f04000"), Some("f1short")),
            AddressIdentity::default(),
        ]);
        assert_eq!(
            mapping,
            vec![
                AddressIdentity::new(Some("f01000"), Some(KEY_A)),
                AddressIdentity::new(Some("f02000"), Some(KEY_B)),
            ]
        );
    }

    #[test]
    fn apply_mapping_fills_either_side() {
        let mapping = vec![
            AddressIdentity::new(Some("f01000"), Some(KEY_A)),
            AddressIdentity::new(Some("f02000"), Some(KEY_B)),
        ];
        let out = apply_mapping(
            vec![app(Some("f01000"), None), app(None, Some(KEY_B)), app(Some("f09999"), None)],
            &mapping,
        );
        assert_eq!(out[0].address_key.as_deref(), Some(KEY_A));
        assert_eq!(out[1].address_id.as_deref(), Some("f02000"));
        assert_eq!(out[2].address_key, None);
    }
}
