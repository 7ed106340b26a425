//! Bearer-token cache.
//!
//! One cached token, read-mostly. Refresh happens under the write lock as a
//! single check-fetch-store unit, so concurrent callers that all observe an
//! expired token produce exactly one login.

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use paybridge_shared::Masked;
use tokio::sync::RwLock;

use crate::error::{AirwallexError, Result};

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: Masked<String>,
    /// Expiry exactly as the gateway sent it.
    pub raw_expiry: String,
    /// Always derived from `raw_expiry` when the token was fetched.
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn from_login(token: String, raw_expiry: String) -> Result<Self> {
        let expires_at = parse_expiry(&raw_expiry)?;
        Ok(Self {
            token: Masked(token),
            raw_expiry,
            expires_at,
        })
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Something that can obtain a fresh token, normally the gateway login endpoint.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn login(&self) -> Result<CachedToken>;
}

pub struct TokenCache {
    entry: RwLock<Option<CachedToken>>,
    /// Tokens are treated as expired this long before the gateway says they are.
    skew: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_skew(Duration::zero())
    }

    pub fn with_skew(skew: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            skew,
        }
    }

    pub async fn get_token(&self, source: &dyn TokenSource) -> Result<String> {
        if let Some(token) = self.usable(self.entry.read().await.as_ref()) {
            return Ok(token);
        }

        let mut entry = self.entry.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = self.usable(entry.as_ref()) {
            tracing::debug!("Gateway token refreshed by a concurrent caller");
            return Ok(token);
        }

        tracing::debug!("Gateway token missing or expired, logging in");
        let fresh = source.login().await?;
        tracing::info!(expires_at = %fresh.expires_at, "Obtained new gateway token");

        let token = fresh.token.expose().clone();
        *entry = Some(fresh);
        Ok(token)
    }

    /// Drop the cached token if it is still the one the gateway rejected,
    /// so the next call logs in again. A token another caller has since
    /// refreshed is kept.
    pub async fn invalidate_if(&self, rejected: &str) {
        let mut entry = self.entry.write().await;
        if entry.as_ref().is_some_and(|cached| cached.token.expose() == rejected) {
            entry.take();
            tracing::debug!("Gateway token invalidated");
        }
    }

    #[cfg(test)]
    pub(crate) async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.entry.read().await.as_ref().map(|cached| cached.expires_at)
    }

    fn usable(&self, entry: Option<&CachedToken>) -> Option<String> {
        entry
            .filter(|cached| cached.is_usable_at(Utc::now() + self.skew))
            .map(|cached| cached.token.expose().clone())
    }

    #[cfg(test)]
    pub(crate) async fn force_expiry(&self, at: DateTime<Utc>) {
        if let Some(cached) = self.entry.write().await.as_mut() {
            cached.expires_at = at;
        }
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the gateway's expiry timestamp.
///
/// The gateway emits offsets without a colon (`+0000`), which RFC 3339 does
/// not allow; they are rewritten to `+00:00` before parsing.
pub fn parse_expiry(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&normalize_offset(raw))
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| AirwallexError::ExpiryFormat {
            raw: raw.to_string(),
            source,
        })
}

fn normalize_offset(raw: &str) -> Cow<'_, str> {
    const OFFSET_LEN: usize = 5;

    if raw.len() <= OFFSET_LEN || !raw.is_char_boundary(raw.len() - OFFSET_LEN) {
        return Cow::Borrowed(raw);
    }

    let (head, offset) = raw.split_at(raw.len() - OFFSET_LEN);
    let bytes = offset.as_bytes();
    let is_compact_offset = (bytes[0] == b'+' || bytes[0] == b'-')
        && bytes[1..].iter().all(u8::is_ascii_digit)
        && head.contains('T');

    if is_compact_offset {
        Cow::Owned(format!("{}{}:{}", head, &offset[..3], &offset[3..]))
    } else {
        Cow::Borrowed(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        logins: AtomicUsize,
        lifetime: Duration,
        delay: std::time::Duration,
    }

    impl CountingSource {
        fn new(lifetime: Duration) -> Self {
            Self {
                logins: AtomicUsize::new(0),
                lifetime,
                delay: std::time::Duration::from_millis(0),
            }
        }

        fn slow(lifetime: Duration, delay_ms: u64) -> Self {
            Self {
                delay: std::time::Duration::from_millis(delay_ms),
                ..Self::new(lifetime)
            }
        }

        fn count(&self) -> usize {
            self.logins.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn login(&self) -> Result<CachedToken> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let expiry = (Utc::now() + self.lifetime).format("%Y-%m-%dT%H:%M:%S+0000").to_string();
            CachedToken::from_login(format!("token-{}", n), expiry)
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TokenSource for FailingSource {
        async fn login(&self) -> Result<CachedToken> {
            Err(AirwallexError::auth("invalid credentials"))
        }
    }

    #[test]
    fn test_compact_offset_matches_colon_offset() {
        let compact = parse_expiry("2024-01-01T00:00:00+0000").unwrap();
        let standard = parse_expiry("2024-01-01T00:00:00+00:00").unwrap();
        assert_eq!(compact, standard);
    }

    #[test]
    fn test_non_utc_compact_offset() {
        let parsed = parse_expiry("2024-01-01T05:30:00+0530").unwrap();
        assert_eq!(parsed, parse_expiry("2024-01-01T00:00:00Z").unwrap());

        let negative = parse_expiry("2023-12-31T19:00:00-0500").unwrap();
        assert_eq!(negative, parsed);
    }

    #[test]
    fn test_fractional_seconds_and_zulu() {
        assert!(parse_expiry("2024-01-01T00:00:00.123+0000").is_ok());
        assert!(parse_expiry("2024-01-01T00:00:00Z").is_ok());
    }

    #[test]
    fn test_unparseable_expiry_is_format_error() {
        let err = parse_expiry("tomorrow-ish").unwrap_err();
        assert!(matches!(err, AirwallexError::ExpiryFormat { .. }));

        let err = parse_expiry("2024-01-01 00:00:00").unwrap_err();
        assert!(matches!(err, AirwallexError::ExpiryFormat { .. }));
    }

    #[test]
    fn test_cached_token_keeps_raw_expiry() {
        let token = CachedToken::from_login("t".into(), "2024-01-01T00:00:00+0000".into()).unwrap();
        assert_eq!(token.raw_expiry, "2024-01-01T00:00:00+0000");
        assert!(!token.is_usable_at(token.expires_at));
        assert!(token.is_usable_at(token.expires_at - Duration::seconds(1)));
    }

    #[tokio::test]
    async fn test_second_call_within_window_hits_cache() {
        let cache = TokenCache::new();
        let source = CountingSource::new(Duration::minutes(30));

        let first = cache.get_token(&source).await.unwrap();
        let second = cache.get_token(&source).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.count(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_triggers_exactly_one_login() {
        let cache = TokenCache::new();
        let source = CountingSource::new(Duration::minutes(30));

        cache.get_token(&source).await.unwrap();
        cache.force_expiry(Utc::now() - Duration::hours(1)).await;

        let refreshed = cache.get_token(&source).await.unwrap();
        assert_eq!(refreshed, "token-2");
        assert_eq!(source.count(), 2);

        cache.get_token(&source).await.unwrap();
        assert_eq!(source.count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_login() {
        let cache = Arc::new(TokenCache::new());
        let source = Arc::new(CountingSource::slow(Duration::minutes(30), 50));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let source = source.clone();
            handles.push(tokio::spawn(async move { cache.get_token(source.as_ref()).await }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(source.count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_after_expiry() {
        let cache = Arc::new(TokenCache::new());
        let source = Arc::new(CountingSource::slow(Duration::minutes(30), 50));

        cache.get_token(source.as_ref()).await.unwrap();
        cache.force_expiry(Utc::now() - Duration::seconds(1)).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let source = source.clone();
            handles.push(tokio::spawn(async move { cache.get_token(source.as_ref()).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-2");
        }
        assert_eq!(source.count(), 2);
    }

    #[tokio::test]
    async fn test_skew_refreshes_early() {
        let cache = TokenCache::with_skew(Duration::minutes(5));
        let source = CountingSource::new(Duration::minutes(2));

        cache.get_token(&source).await.unwrap();
        cache.get_token(&source).await.unwrap();
        assert_eq!(source.count(), 2);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_cache_empty() {
        let cache = TokenCache::new();

        let err = cache.get_token(&FailingSource).await.unwrap_err();
        assert!(matches!(err, AirwallexError::Auth { .. }));
        assert!(cache.expires_at().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_forces_login() {
        let cache = TokenCache::new();
        let source = CountingSource::new(Duration::minutes(30));

        let rejected = cache.get_token(&source).await.unwrap();
        cache.invalidate_if(&rejected).await;
        assert_eq!(cache.get_token(&source).await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_stale_rejection_keeps_refreshed_token() {
        let cache = TokenCache::new();
        let source = CountingSource::new(Duration::minutes(30));

        let stale = cache.get_token(&source).await.unwrap();
        cache.invalidate_if(&stale).await;
        let refreshed = cache.get_token(&source).await.unwrap();

        // A second caller reporting the old token must not drop the new one.
        cache.invalidate_if(&stale).await;
        assert_eq!(cache.get_token(&source).await.unwrap(), refreshed);
        assert_eq!(source.count(), 2);
    }
}
