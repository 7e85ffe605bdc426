//! Filecoin address syntax and the length bounds that tell the two
//! representations apart.
//!
//! An ID address (`f0...`) is short; a public-key address (`f1...`, `f3...`)
//! is long. Bounds: ID length in (4, 20], key length in [14, 100]. The ranges
//! overlap on 14..=20, where classification prefers the ID form.

use regex::Regex;
use std::sync::LazyLock;

pub const ADDRESS_ID_MIN_EXCLUSIVE: usize = 4;
pub const ADDRESS_ID_MAX: usize = 20;
pub const ADDRESS_KEY_MIN: usize = 14;
pub const ADDRESS_KEY_MAX: usize = 100;

static ADDRESS_SYNTAX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[fF][a-zA-Z0-9]+$").unwrap());

/// Literal address syntax: `f` followed by alphanumerics.
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_SYNTAX_RE.is_match(address)
}

pub fn is_address_id(address: &str) -> bool {
    let len = address.chars().count();
    len > ADDRESS_ID_MIN_EXCLUSIVE && len <= ADDRESS_ID_MAX && is_valid_address(address)
}

pub fn is_address_key(address: &str) -> bool {
    let len = address.chars().count();
    (ADDRESS_KEY_MIN..=ADDRESS_KEY_MAX).contains(&len) && is_valid_address(address)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Id,
    Key,
}

impl AddressKind {
    /// Classify a cleaned address token. ID bounds are checked first.
    pub fn classify(address: &str) -> Option<Self> {
        if is_address_id(address) {
            Some(AddressKind::Id)
        } else if is_address_key(address) {
            Some(AddressKind::Key)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(len: usize) -> String {
        format!("f{}", "1".repeat(len - 1))
    }

    #[test]
    fn address_id_lower_bound_is_exclusive() {
        assert!(!is_address_id(&addr(4)));
        assert!(is_address_id(&addr(5)));
    }

    #[test]
    fn address_id_upper_bound_is_inclusive() {
        assert!(is_address_id(&addr(20)));
        assert!(!is_address_id(&addr(21)));
    }

    #[test]
    fn address_key_bounds() {
        assert!(!is_address_key(&addr(13)));
        assert!(is_address_key(&addr(14)));
        assert!(is_address_key(&addr(100)));
        assert!(!is_address_key(&addr(101)));
    }

    #[test]
    fn syntax_requires_f_prefix_and_alphanumerics() {
        assert!(is_valid_address("f01234"));
        assert!(is_valid_address("f1k6wwevxvp466ybil7y2scqlhtnrz5atjkkyvm4a"));
        assert!(!is_valid_address("t01234"));
        assert!(!is_valid_address("f0-1234"));
        assert!(!is_valid_address("f"));
        assert!(!is_address_id("x0123456"));
    }

    #[test]
    fn classify_prefers_id_in_overlap() {
        assert_eq!(AddressKind::classify("f01234"), Some(AddressKind::Id));
        assert_eq!(AddressKind::classify(&addr(16)), Some(AddressKind::Id));
        assert_eq!(
            AddressKind::classify("f1k6wwevxvp466ybil7y2scqlhtnrz5atjkkyvm4a"),
            Some(AddressKind::Key)
        );
        assert_eq!(AddressKind::classify("f01"), None);
    }
}
