//! Fill in the missing half of partial address identities.
//!
//! Lookups run through a bounded pool (`buffered`, so output order matches
//! input order) behind a rolling-window rate limiter. Each lookup retries
//! transient failures with exponential backoff. Successful lookups are
//! memoized in an `AddressCache` owned by the caller, so one cache spans one
//! pipeline run and nothing else.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use glif_client::{GlifError, RpcMethod};
use notary_common::{is_valid_address, AddressIdentity, NotaryError, ResolverSettings};

use crate::traits::AddressLookup;

// --- Cache ---

/// Successful lookups keyed by `(method, input address)`.
#[derive(Debug, Default)]
pub struct AddressCache {
    entries: Mutex<HashMap<(RpcMethod, String), String>>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, method: RpcMethod, address: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&(method, address.to_string())).cloned()
    }

    /// Concurrent writers of the same key always carry the same value, so
    /// last write wins harmlessly.
    pub fn insert(&self, method: RpcMethod, address: &str, resolved: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((method, address.to_string()), resolved.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// --- Rate limiting ---

/// At most `cap` dispatches start within any `interval`.
struct RateLimiter {
    interval: Duration,
    cap: usize,
    starts: tokio::sync::Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    fn new(interval: Duration, cap: usize) -> Self {
        Self {
            interval,
            cap: cap.max(1),
            starts: tokio::sync::Mutex::new(VecDeque::new()),
        }
    }

    async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        loop {
            let wait = {
                let mut starts = self.starts.lock().await;
                let now = Instant::now();
                while let Some(front) = starts.front() {
                    if now.duration_since(*front) >= self.interval {
                        starts.pop_front();
                    } else {
                        break;
                    }
                }

                if starts.len() < self.cap {
                    starts.push_back(now);
                    return;
                }
                match starts.front() {
                    Some(oldest) => self.interval.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

// --- Retry ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub factor: u32,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `min * factor^attempt`,
    /// capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.max(1).saturating_pow(attempt);
        self.min_backoff
            .saturating_mul(multiplier)
            .min(self.max_backoff)
    }
}

impl From<&ResolverSettings> for RetryPolicy {
    fn from(s: &ResolverSettings) -> Self {
        Self {
            retries: s.retries,
            min_backoff: s.min_backoff,
            max_backoff: s.max_backoff,
            factor: s.backoff_factor,
        }
    }
}

// --- Outcome ---

/// A lookup that ran out of retries on a transient error, or got an answer
/// it could not use. The identity keeps its missing field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveFailure {
    pub index: usize,
    pub method: RpcMethod,
    pub address: String,
    pub attempts: u32,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub total: usize,
    pub resolved: usize,
    pub cache_hits: usize,
    pub unchanged: usize,
    pub unresolvable: usize,
    /// Definitive answers with nothing to fill in: unknown actor, empty
    /// result or malformed address.
    pub not_found: usize,
    pub failed: usize,
}

impl std::fmt::Display for ResolveStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total={} resolved={} cache_hits={} unchanged={} unresolvable={} not_found={} failed={}",
            self.total,
            self.resolved,
            self.cache_hits,
            self.unchanged,
            self.unresolvable,
            self.not_found,
            self.failed
        )
    }
}

/// One output per input, in input order, plus what went wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOutcome {
    pub identities: Vec<AddressIdentity>,
    pub failures: Vec<ResolveFailure>,
    pub stats: ResolveStats,
}

impl ResolveOutcome {
    /// Aggregate failure summary, if any lookup failed.
    /// Addresses the endpoint definitively could not resolve do not count.
    pub fn ensure_complete(&self) -> Result<(), NotaryError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(NotaryError::Resolution {
                failed: self.failures.len(),
                total: self.stats.total,
            })
        }
    }
}

enum Resolution {
    Unchanged,
    Unresolvable,
    NotFound,
    Resolved { cached: bool },
    Failed(ResolveFailure),
}

// --- Resolver ---

pub struct AddressResolver {
    lookup: Arc<dyn AddressLookup>,
    concurrency: usize,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl AddressResolver {
    pub fn new(lookup: Arc<dyn AddressLookup>, settings: &ResolverSettings) -> Self {
        info!(
            concurrency = settings.concurrency,
            interval_ms = settings.interval.as_millis() as u64,
            interval_cap = settings.interval_cap,
            retries = settings.retries,
            "Address resolver configured"
        );
        Self {
            lookup,
            concurrency: settings.concurrency.max(1),
            limiter: RateLimiter::new(settings.interval, settings.interval_cap),
            retry: RetryPolicy::from(settings),
        }
    }

    /// Resolve every partial identity. Never fails: lookups that exhaust
    /// their retries are reported in `failures`, permanent answers only
    /// leave the field empty.
    pub async fn resolve(
        &self,
        identities: Vec<AddressIdentity>,
        cache: &AddressCache,
    ) -> ResolveOutcome {
        let total = identities.len();
        info!(total, "Resolving addresses");

        let results: Vec<(AddressIdentity, Resolution)> = stream::iter(
            identities
                .into_iter()
                .enumerate()
                .map(|(index, identity)| self.resolve_one(index, identity, cache)),
        )
        .buffered(self.concurrency)
        .collect()
        .await;

        let mut stats = ResolveStats {
            total,
            ..Default::default()
        };
        let mut failures = Vec::new();
        let mut resolved = Vec::with_capacity(total);

        for (identity, resolution) in results {
            match resolution {
                Resolution::Unchanged => stats.unchanged += 1,
                Resolution::Unresolvable => stats.unresolvable += 1,
                Resolution::NotFound => stats.not_found += 1,
                Resolution::Resolved { cached } => {
                    stats.resolved += 1;
                    if cached {
                        stats.cache_hits += 1;
                    }
                }
                Resolution::Failed(failure) => {
                    stats.failed += 1;
                    failures.push(failure);
                }
            }
            resolved.push(identity);
        }

        info!(%stats, "Address resolution complete");
        ResolveOutcome {
            identities: resolved,
            failures,
            stats,
        }
    }

    async fn resolve_one(
        &self,
        index: usize,
        identity: AddressIdentity,
        cache: &AddressCache,
    ) -> (AddressIdentity, Resolution) {
        let (method, input) = match (&identity.address_id, &identity.address_key) {
            (Some(_), Some(_)) => return (identity, Resolution::Unchanged),
            (None, None) => return (identity, Resolution::Unresolvable),
            (Some(id), None) => (RpcMethod::ResolveIdToKey, id.clone()),
            (None, Some(key)) => (RpcMethod::ResolveKeyToId, key.clone()),
        };

        let (value, cached) = if let Some(hit) = cache.get(method, &input) {
            debug!(%method, address = %input, "Cache hit");
            (hit, true)
        } else {
            match self.lookup_with_retry(method, &input).await {
                Ok(value) => {
                    cache.insert(method, &input, &value);
                    (value, false)
                }
                Err((
                    error @ (GlifError::Rpc { .. }
                    | GlifError::EmptyResult { .. }
                    | GlifError::InvalidAddress(_)),
                    _,
                )) => {
                    warn!(%method, address = %input, error = %error, "Address not resolvable");
                    return (identity, Resolution::NotFound);
                }
                Err((error, attempts)) => {
                    warn!(%method, address = %input, attempts, error = %error, "Address lookup failed");
                    let failure = ResolveFailure {
                        index,
                        method,
                        address: input,
                        attempts,
                        error: error.to_string(),
                    };
                    return (identity, Resolution::Failed(failure));
                }
            }
        };

        let filled = match method {
            RpcMethod::ResolveIdToKey => AddressIdentity {
                address_key: Some(value),
                ..identity
            },
            RpcMethod::ResolveKeyToId => AddressIdentity {
                address_id: Some(value),
                ..identity
            },
        };
        (filled, Resolution::Resolved { cached })
    }

    /// Rate-limited lookup with exponential backoff. Returns the final error
    /// and the number of attempts made.
    async fn lookup_with_retry(
        &self,
        method: RpcMethod,
        address: &str,
    ) -> Result<String, (GlifError, u32)> {
        if !is_valid_address(address) {
            return Err((GlifError::InvalidAddress(address.to_string()), 0));
        }

        let mut attempt: u32 = 0;
        loop {
            self.limiter.acquire().await;
            match self.lookup.lookup(method, address).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        %method,
                        address,
                        attempt = attempt + 1,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Lookup failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt + 1)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "f1k6wwevxvp466ybil7y2scqlhtnrz5atjkkyvm4a";

    /// Maps `f0N` <-> `f1...N` and records traffic. Addresses listed in
    /// `rate_limited` answer 429 for their first `rate_limit_times` calls;
    /// addresses in `missing` always fail with an RPC error.
    #[derive(Default)]
    struct MockLookup {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        rate_limited: Vec<String>,
        rate_limit_times: usize,
        rate_limit_seen: AtomicUsize,
        missing: Vec<String>,
        delay: Duration,
    }

    #[async_trait]
    impl AddressLookup for MockLookup {
        async fn lookup(&self, method: RpcMethod, address: &str) -> glif_client::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.rate_limited.iter().any(|a| a == address)
                && self.rate_limit_seen.fetch_add(1, Ordering::SeqCst) < self.rate_limit_times
            {
                return Err(GlifError::RateLimited);
            }
            if self.missing.iter().any(|a| a == address) {
                return Err(GlifError::Rpc {
                    code: 1,
                    message: "actor not found".to_string(),
                });
            }

            Ok(match method {
                RpcMethod::ResolveIdToKey => format!("f1key{}", &address[2..]),
                RpcMethod::ResolveKeyToId => format!("f0{}", &address[5..]),
            })
        }
    }

    fn settings() -> ResolverSettings {
        ResolverSettings {
            concurrency: 2,
            interval: Duration::ZERO,
            interval_cap: 5,
            retries: 3,
            min_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            backoff_factor: 2,
        }
    }

    fn resolver(mock: Arc<MockLookup>, settings: &ResolverSettings) -> AddressResolver {
        AddressResolver::new(mock, settings)
    }

    #[tokio::test]
    async fn fills_missing_fields_in_order() {
        let mock = Arc::new(MockLookup::default());
        let r = resolver(mock.clone(), &settings());
        let cache = AddressCache::new();

        let input = vec![
            AddressIdentity::new(Some("f01111"), None),
            AddressIdentity::new(None, Some("f1key2222")),
            AddressIdentity::new(Some("f03333"), Some(KEY)),
            AddressIdentity::new(None, None),
        ];
        let outcome = r.resolve(input, &cache).await;

        assert_eq!(
            outcome.identities,
            vec![
                AddressIdentity::new(Some("f01111"), Some("f1key1111")),
                AddressIdentity::new(Some("f02222"), Some("f1key2222")),
                AddressIdentity::new(Some("f03333"), Some(KEY)),
                AddressIdentity::new(None, None),
            ]
        );
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.stats.resolved, 2);
        assert_eq!(outcome.stats.unchanged, 1);
        assert_eq!(outcome.stats.unresolvable, 1);
        assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
        assert!(outcome.ensure_complete().is_ok());
    }

    #[tokio::test]
    async fn failures_keep_totality_and_order() {
        let mock = Arc::new(MockLookup {
            missing: vec!["f02222".to_string()],
            ..Default::default()
        });
        let r = resolver(mock.clone(), &settings());
        let cache = AddressCache::new();

        let input = vec![
            AddressIdentity::new(Some("f01111"), None),
            AddressIdentity::new(Some("f02222"), None),
            AddressIdentity::new(Some("not-an-address"), None),
            AddressIdentity::new(Some("f04444"), None),
        ];
        let outcome = r.resolve(input, &cache).await;

        assert_eq!(outcome.identities.len(), 4);
        assert_eq!(outcome.identities[0].address_key.as_deref(), Some("f1key1111"));
        assert_eq!(outcome.identities[1], AddressIdentity::new(Some("f02222"), None));
        assert_eq!(outcome.identities[2], AddressIdentity::new(Some("not-an-address"), None));
        assert_eq!(outcome.identities[3].address_key.as_deref(), Some("f1key4444"));

        // Unknown actors are not retried; invalid addresses never hit the network.
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.stats.not_found, 2);
        assert_eq!(outcome.stats.resolved, 2);
        assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
        assert!(outcome.ensure_complete().is_ok());
    }

    #[tokio::test]
    async fn malformed_address_is_not_a_failure() {
        let mock = Arc::new(MockLookup::default());
        let r = resolver(mock.clone(), &settings());

        let outcome = r
            .resolve(vec![AddressIdentity::new(Some("f0-12"), None)], &AddressCache::new())
            .await;

        assert_eq!(outcome.identities, vec![AddressIdentity::new(Some("f0-12"), None)]);
        assert_eq!(outcome.stats.not_found, 1);
        assert!(outcome.failures.is_empty());
        assert!(outcome.ensure_complete().is_ok());
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_with_backoff() {
        let mock = Arc::new(MockLookup {
            rate_limited: vec!["f05555".to_string()],
            rate_limit_times: 2,
            ..Default::default()
        });
        let r = resolver(mock.clone(), &settings());
        let cache = AddressCache::new();

        let outcome = r
            .resolve(vec![AddressIdentity::new(Some("f05555"), None)], &cache)
            .await;

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.identities[0].address_key.as_deref(), Some("f1key5555"));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let mock = Arc::new(MockLookup {
            rate_limited: vec!["f06666".to_string()],
            rate_limit_times: usize::MAX,
            ..Default::default()
        });
        let r = resolver(mock.clone(), &settings());
        let cache = AddressCache::new();

        let outcome = r
            .resolve(vec![AddressIdentity::new(Some("f06666"), None)], &cache)
            .await;

        assert_eq!(outcome.identities, vec![AddressIdentity::new(Some("f06666"), None)]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 0);
        assert_eq!(outcome.failures[0].attempts, 4);
        assert_eq!(mock.calls.load(Ordering::SeqCst), 4);

        let err = outcome.ensure_complete().unwrap_err();
        assert!(matches!(err, NotaryError::Resolution { failed: 1, total: 1 }));
    }

    #[tokio::test]
    async fn cache_short_circuits_lookups() {
        let mock = Arc::new(MockLookup::default());
        let r = resolver(mock.clone(), &ResolverSettings {
            concurrency: 1,
            ..settings()
        });
        let cache = AddressCache::new();

        let input = vec![
            AddressIdentity::new(Some("f07777"), None),
            AddressIdentity::new(Some("f07777"), None),
        ];
        let outcome = r.resolve(input.clone(), &cache).await;
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.stats.cache_hits, 1);

        let again = r.resolve(input, &cache).await;
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.stats.cache_hits, 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let mock = Arc::new(MockLookup {
            delay: Duration::from_millis(10),
            ..Default::default()
        });
        let r = resolver(mock.clone(), &ResolverSettings {
            concurrency: 3,
            ..settings()
        });
        let cache = AddressCache::new();

        let input: Vec<_> = (1000..1012)
            .map(|n| AddressIdentity::new(Some(format!("f0{n}").as_str()), None))
            .collect();
        let outcome = r.resolve(input, &cache).await;

        assert_eq!(outcome.identities.len(), 12);
        assert_eq!(outcome.identities[11].address_key.as_deref(), Some("f1key1011"));
        let max = mock.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 3, "max in flight was {max}");
        assert!(max >= 2, "lookups never overlapped");
    }

    #[tokio::test]
    async fn rate_limiter_spaces_dispatches() {
        let mock = Arc::new(MockLookup::default());
        let r = resolver(mock.clone(), &ResolverSettings {
            concurrency: 4,
            interval: Duration::from_millis(40),
            interval_cap: 2,
            ..settings()
        });
        let cache = AddressCache::new();

        let input: Vec<_> = (2000..2006)
            .map(|n| AddressIdentity::new(Some(format!("f0{n}").as_str()), None))
            .collect();
        let started = std::time::Instant::now();
        let outcome = r.resolve(input, &cache).await;

        assert!(outcome.failures.is_empty());
        // Six dispatches at two per window need at least two full windows.
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn backoff_grows_by_factor_and_caps() {
        let policy = RetryPolicy {
            retries: 3,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
            factor: 2,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(4), Duration::from_millis(1000));
        assert_eq!(policy.delay(40), Duration::from_millis(1000));
    }
}
