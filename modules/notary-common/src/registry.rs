//! Rows from the ledger-derived registry API (verifiers, verified clients,
//! LDN allowances).
//!
//! Only the fields the pipeline reads are typed. Everything else rides along
//! in `extra` so a read-then-write keeps the row intact. Amounts stay decimal
//! strings; the API sometimes sends them as bare integers.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `{ count, data }` envelope every registry endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalVerifierRecord {
    pub id: Option<u64>,
    pub address_id: Option<String>,
    pub address: Option<String>,
    pub audit_trail: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub removed: bool,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub initial_allowance: Option<String>,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub allowance: Option<String>,
    #[serde(default)]
    pub is_multisig: bool,
    pub created_at_height: Option<i64>,
    pub issue_create_timestamp: Option<i64>,
    pub create_message_timestamp: Option<i64>,
    pub verified_clients_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalVerifiedClient {
    pub id: Option<u64>,
    pub address_id: Option<String>,
    pub address: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub initial_allowance: Option<String>,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub allowance: Option<String>,
    pub verifier_address_id: Option<String>,
    pub issue_create_timestamp: Option<i64>,
    pub create_message_timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAllowance {
    pub id: Option<u64>,
    pub client_address_id: Option<String>,
    pub verifier_address_id: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec::deserialize")]
    pub signers: Vec<AllowanceSigner>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A notary signature on an LDN allowance, with how long the operation took.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceSigner {
    pub address_id: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "operationTTD")]
    pub operation_ttd: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parse a decimal amount string. Blank or malformed amounts yield `None`.
pub fn parse_amount(amount: &str) -> Option<BigInt> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<BigInt>().ok()
}

pub mod decimal {
    use serde::{Deserialize, Deserializer};
    use serde_json::Number;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(Number),
    }

    /// Accept a JSON string, integer or null as an optional decimal string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        }))
    }
}

pub mod nullable_vec {
    use serde::{Deserialize, Deserializer};

    /// Treat an explicit null like a missing array.
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }
}
