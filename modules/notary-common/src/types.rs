use serde::{Deserialize, Serialize};

use crate::address::{is_address_id, is_address_key};
use crate::registry::{ExternalVerifiedClient, ExternalVerifierRecord};

// --- Region ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    Africa,
    AsiaNotGreaterChina,
    Europe,
    GreaterChina,
    NorthAmerica,
    Oceania,
    SouthAmerica,
    Global,
    Other,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Africa => write!(f, "AFRICA"),
            Region::AsiaNotGreaterChina => write!(f, "ASIA_NOT_GREATER_CHINA"),
            Region::Europe => write!(f, "EUROPE"),
            Region::GreaterChina => write!(f, "GREATER_CHINA"),
            Region::NorthAmerica => write!(f, "NORTH_AMERICA"),
            Region::Oceania => write!(f, "OCEANIA"),
            Region::SouthAmerica => write!(f, "SOUTH_AMERICA"),
            Region::Global => write!(f, "GLOBAL"),
            Region::Other => write!(f, "OTHER"),
        }
    }
}

// --- Parsed applications ---

/// A verifier application parsed out of a governance issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierApplication {
    pub issue_number: u64,
    pub address_id: Option<String>,
    pub address_key: Option<String>,
    pub name: Option<String>,
    pub organization: Option<String>,
    #[serde(default)]
    pub region: Vec<Region>,
    pub website_and_social: Option<String>,
}

impl VerifierApplication {
    /// Number of the seven fields carrying real data.
    pub fn populated_fields(&self) -> usize {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        [
            self.issue_number != 0,
            filled(&self.address_id),
            filled(&self.address_key),
            filled(&self.name),
            filled(&self.organization),
            !self.region.is_empty(),
            filled(&self.website_and_social),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }

    pub fn identity(&self) -> AddressIdentity {
        AddressIdentity {
            address_id: self.address_id.clone(),
            address_key: self.address_key.clone(),
        }
    }
}

// --- Address identity ---

/// One account under its two equivalent address representations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressIdentity {
    pub address_id: Option<String>,
    pub address_key: Option<String>,
}

impl AddressIdentity {
    pub fn new(address_id: Option<&str>, address_key: Option<&str>) -> Self {
        Self {
            address_id: address_id.map(String::from),
            address_key: address_key.map(String::from),
        }
    }

    /// Both forms present and each passes its validator.
    pub fn is_resolved(&self) -> bool {
        self.address_id.as_deref().is_some_and(is_address_id)
            && self.address_key.as_deref().is_some_and(is_address_key)
    }

    pub fn is_empty(&self) -> bool {
        self.address_id.is_none() && self.address_key.is_none()
    }
}

// --- Output verifier ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifierStatus {
    #[default]
    Active,
    Removed,
}

/// Average time to datacap, humanised and in raw seconds. Both null when
/// there was nothing to average.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtdAverages {
    pub average_ttd: Option<String>,
    pub average_ttd_raw: Option<i64>,
}

/// Datacap amounts as decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datacap {
    pub total: String,
    pub allocated: String,
    pub available: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierStats {
    pub time_to_datacap: TtdAverages,
    pub ldn_time_to_datacap: TtdAverages,
}

/// A consolidated verifier: the parsed application plus everything the
/// registries contributed and the statistics computed from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verifier {
    pub issue_number: u64,
    pub address_id: Option<String>,
    pub address_key: Option<String>,
    pub name: Option<String>,
    pub organization: Option<String>,
    #[serde(default)]
    pub region: Vec<Region>,
    pub website_and_social: Option<String>,
    pub from_interplanetary_one: Option<ExternalVerifierRecord>,
    #[serde(default)]
    pub verified_clients_from_interplanetary_one: Vec<ExternalVerifiedClient>,
    #[serde(default)]
    pub ttd_averages: TtdAverages,
    #[serde(default)]
    pub ldn_ttd_averages: TtdAverages,
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: VerifierStatus,
    pub has_datacap: Option<Datacap>,
    pub has_stats: Option<VerifierStats>,
    #[serde(default)]
    pub clients_count: u64,
    pub issue_url: Option<String>,
}

impl Verifier {
    pub fn from_application(app: VerifierApplication) -> Self {
        Self {
            issue_number: app.issue_number,
            address_id: app.address_id,
            address_key: app.address_key,
            name: app.name,
            organization: app.organization,
            region: app.region,
            website_and_social: app.website_and_social,
            from_interplanetary_one: None,
            verified_clients_from_interplanetary_one: Vec::new(),
            ttd_averages: TtdAverages::default(),
            ldn_ttd_averages: TtdAverages::default(),
            created_at: None,
            status: VerifierStatus::Active,
            has_datacap: None,
            has_stats: None,
            clients_count: 0,
            issue_url: None,
        }
    }

    pub fn is_multisig(&self) -> bool {
        self.from_interplanetary_one
            .as_ref()
            .is_some_and(|r| r.is_multisig)
    }
}
