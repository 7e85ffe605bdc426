//! Pull verifier application fields out of free-text governance issues.
//!
//! Every field comes from a labelled line (`<label>...: <value>`), matched
//! case-insensitively, first match wins. The address falls back to the first
//! approval comment that names one.

use regex::Regex;
use std::sync::LazyLock;

use github_client::Issue;
use notary_common::{AddressKind, Region, VerifierApplication};

static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^<?[^\n]*?region[^:\n]*:(?P<value>[^\n]+)").unwrap());
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^<?[^\n]*?address[^:\n]*:[^\n]*?(?P<value>f\d[0-9A-Za-z]+)").unwrap()
});
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^<?[^\n]*?name[^:\n]*:(?P<value>[^\n]{0,80})").unwrap());
static ORGANIZATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)^[^\n]*?organization[^\n]{0,5}?: *(?:[\s"'\\*])*(?P<value>[\w _\-(),./]+)"#)
        .unwrap()
});
static WEBSITE_SOCIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^<?[^\n]*?website[^\n]{0,3}social[^:\n]*:(?P<value>[^\n\r]+)").unwrap()
});
static APPROVED_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)approved.*?address.*?\s(?P<value>f[0-9]+[^\r\n]*)").unwrap()
});

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[^>]*>").unwrap());
static LEADING_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^f\S+").unwrap());

static AFRICA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(Africa)\s*$").unwrap());
static ASIA_NOT_GCN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(Asia.minus.GCN)\s*$").unwrap());
static EUROPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(Europe|EU)\s*$").unwrap());
static GREATER_CHINA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(Asia.GCN|GCN.Asia|China|Greater.China)\s*$").unwrap()
});
// "n/a" lands here too. Upstream data uses it for both.
static NORTH_AMERICA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(n/a|North.America|NA)\s*$").unwrap());
static OCEANIA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(Oceania)\s*$").unwrap());
static SOUTH_AMERICA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(South.America)\s*$").unwrap());
static GLOBAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(Global)\s*$").unwrap());
static OTHER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?im)^\s*(Other)\s*$").unwrap());

/// Raw, cleaned field values before address and region classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub address: Option<String>,
    pub name: Option<String>,
    pub organization: Option<String>,
    pub region: Option<String>,
    pub website_and_social: Option<String>,
}

impl ExtractedFields {
    /// Classify the address and region into an application for `issue_number`.
    pub fn into_application(self, issue_number: u64) -> VerifierApplication {
        let address = self.address.as_deref().and_then(leading_address_token);
        let (address_id, address_key) = match address {
            Some(addr) => match AddressKind::classify(&addr) {
                Some(AddressKind::Id) => (Some(addr), None),
                Some(AddressKind::Key) => (None, Some(addr)),
                None => (None, None),
            },
            None => (None, None),
        };

        VerifierApplication {
            issue_number,
            address_id,
            address_key,
            name: self.name,
            organization: self.organization,
            region: normalize_region(self.region.as_deref().unwrap_or_default()),
            website_and_social: self.website_and_social,
        }
    }
}

/// Extract labelled fields from an issue body, falling back to approval
/// comments for the address.
pub fn extract(body: &str, comments: &[&str]) -> ExtractedFields {
    let address = capture(&ADDRESS_RE, body).or_else(|| {
        comments
            .iter()
            .find_map(|comment| capture(&APPROVED_ADDRESS_RE, comment))
    });

    ExtractedFields {
        address,
        name: capture(&NAME_RE, body),
        organization: capture(&ORGANIZATION_RE, body),
        region: capture(&REGION_RE, body),
        website_and_social: capture(&WEBSITE_SOCIAL_RE, body),
    }
}

/// Parse one governance issue into an application.
pub fn parse_issue(issue: &Issue) -> VerifierApplication {
    let comments: Vec<&str> = issue.comments.iter().map(|c| c.body.as_str()).collect();
    extract(&issue.body, &comments).into_application(issue.number)
}

pub fn parse_issues(issues: &[Issue]) -> Vec<VerifierApplication> {
    issues.iter().map(parse_issue).collect()
}

/// Map a free-text region to canonical tags. Every matching tag is kept;
/// nothing matching means `OTHER`.
pub fn normalize_region(raw: &str) -> Vec<Region> {
    let predicates: [(&LazyLock<Regex>, Region); 9] = [
        (&AFRICA_RE, Region::Africa),
        (&ASIA_NOT_GCN_RE, Region::AsiaNotGreaterChina),
        (&EUROPE_RE, Region::Europe),
        (&GREATER_CHINA_RE, Region::GreaterChina),
        (&NORTH_AMERICA_RE, Region::NorthAmerica),
        (&OCEANIA_RE, Region::Oceania),
        (&SOUTH_AMERICA_RE, Region::SouthAmerica),
        (&GLOBAL_RE, Region::Global),
        (&OTHER_RE, Region::Other),
    ];

    let mut regions: Vec<Region> = predicates
        .iter()
        .filter(|(re, _)| re.is_match(raw))
        .map(|(_, region)| *region)
        .collect();

    if regions.is_empty() {
        regions.push(Region::Other);
    }
    regions
}

/// Strip HTML tags, surrounding whitespace, wrapping brackets and markdown
/// emphasis from an extracted value. Emphasis markers only go when they wrap
/// the whole value, so `acme_` or `_acme` keep their underscores.
pub fn clean_value(raw: &str) -> String {
    let without_tags = HTML_TAG_RE.replace_all(raw, "");
    let trimmed = without_tags.trim();
    let trimmed = trimmed.strip_prefix('[').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(']').unwrap_or(trimmed);
    strip_emphasis(trimmed.trim()).trim().to_string()
}

fn strip_emphasis(value: &str) -> &str {
    for marker in ["**", "__", "*", "_"] {
        if let Some(inner) = value
            .strip_prefix(marker)
            .and_then(|rest| rest.strip_suffix(marker))
        {
            if !inner.is_empty() {
                return inner;
            }
        }
    }
    value
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    let value = re.captures(text)?.name("value")?.as_str();
    let cleaned = clean_value(value);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Keep only the leading `f...` token, dropping prose captured after it.
fn leading_address_token(address: &str) -> Option<String> {
    let token = LEADING_TOKEN_RE
        .find(address)
        .map(|m| m.as_str())
        .unwrap_or(address);
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_lowercase())
}
