//! JSON artifacts on disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use notary_common::NotaryError;

/// Read and decode a JSON artifact. A missing or malformed file names the
/// artifact in the error.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| NotaryError::Artifact {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let value = serde_json::from_str(&raw).map_err(|e| NotaryError::Artifact {
        path: path.display().to_string(),
        message: format!("invalid JSON: {e}"),
    })?;
    Ok(value)
}

/// Pretty-print a value to a JSON artifact, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Wrote artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_common::{ExternalVerifierRecord, RegistryResponse};
    use serde_json::json;

    #[test]
    fn registry_rows_round_trip_without_precision_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("verifiers.json");

        let original = json!({
            "count": 1,
            "data": [{
                "addressId": "f01234",
                "initialAllowance": "340282366920938463463374607431768211456",
                "allowance": "18446744073709551617",
                "removed": false,
                "isMultisig": false,
                "customField": { "nested": [1, 2, 3] },
            }],
        });
        let page: RegistryResponse<ExternalVerifierRecord> =
            serde_json::from_value(original).unwrap();

        write_json(&path, &page).unwrap();
        let back: RegistryResponse<ExternalVerifierRecord> = read_json(&path).unwrap();

        assert_eq!(back, page);
        assert_eq!(
            back.data[0].initial_allowance.as_deref(),
            Some("340282366920938463463374607431768211456")
        );
        assert_eq!(back.data[0].extra["customField"], json!({ "nested": [1, 2, 3] }));
    }

    #[test]
    fn missing_artifact_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
        assert!(err.downcast_ref::<NotaryError>().is_some());
    }

    #[test]
    fn malformed_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }
}
