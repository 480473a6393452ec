//! Cached bearer credentials.
//!
//! Tokens are kept in memory and, optionally, in `<dir>/<identity>.token`.
//! Acquisition for one identity is single-flight: concurrent callers wait for
//! the first one to finish issuing and then reuse its token.
mod token;
pub use token::CachedToken;

#[cfg(test)]
pub(crate) use token::jwt_expiring_at;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::{AgentResult, TokenIssuer};

/// Default margin before expiry at which a token is renewed.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CredentialCacheConfig {
    /// Directory for persisted tokens; `None` keeps tokens in memory only.
    pub dir: Option<PathBuf>,
    /// Tokens expiring within this margin are renewed.
    pub safety_margin: Duration,
    /// Fixed token returned for every identity; disables issuing.
    pub static_token: Option<String>,
}

impl Default for CredentialCacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            static_token: None,
        }
    }
}

impl CredentialCacheConfig {
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn with_static_token(mut self, token: Option<String>) -> Self {
        self.static_token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

type Slot = Arc<tokio::sync::Mutex<Option<CachedToken>>>;

/// Read-mostly token cache in front of a [`TokenIssuer`].
pub struct CredentialCache {
    issuer: Arc<dyn TokenIssuer>,
    cfg: CredentialCacheConfig,
    slots: Mutex<HashMap<String, Slot>>,
}

impl CredentialCache {
    pub fn new(issuer: Arc<dyn TokenIssuer>, cfg: CredentialCacheConfig) -> Self {
        Self {
            issuer,
            cfg,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a token for `identity` that is valid for at least the safety margin.
    ///
    /// Order: static token, in-memory token, persisted token, newly issued token.
    /// Issuing failures are returned as-is; persisting failures are only logged.
    #[instrument(level = "debug", skip(self))]
    pub async fn acquire(&self, identity: &str) -> AgentResult<String> {
        if let Some(token) = &self.cfg.static_token {
            return Ok(token.clone());
        }

        let slot = self.slot(identity);
        let mut cached = slot.lock().await;
        let now = OffsetDateTime::now_utc();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now, self.cfg.safety_margin)) {
            debug!("using in-memory token");
            return Ok(token.value().to_string());
        }

        if let Some(token) = self.load(identity).await {
            if token.is_fresh(now, self.cfg.safety_margin) {
                debug!("using persisted token");
                let value = token.value().to_string();
                *cached = Some(token);
                return Ok(value);
            }
            debug!("persisted token is expired");
        }

        let value = self.issuer.issue(identity).await?;
        match CachedToken::decode(value.clone()) {
            Some(token) => {
                debug!(expires_at = ?token.expires_at(), "issued new token");
                self.store(identity, &token).await;
                *cached = Some(token);
            }
            None => {
                warn!("issued token is not a JWT; it will not be cached");
                *cached = None;
            }
        }
        Ok(value)
    }

    /// Drops the in-memory token of `identity`; the next acquire re-reads or re-issues.
    pub async fn invalidate(&self, identity: &str) {
        let slot = self.slot(identity);
        *slot.lock().await = None;
    }

    fn slot(&self, identity: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(slots.entry(identity.to_string()).or_default())
    }

    fn path_for(&self, identity: &str) -> Option<PathBuf> {
        let dir = self.cfg.dir.as_ref()?;
        let safe = !identity.is_empty()
            && identity
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            && !identity.starts_with('.');
        if !safe {
            warn!(identity, "identity is not usable as a file name; token not persisted");
            return None;
        }
        Some(dir.join(format!("{identity}.token")))
    }

    async fn load(&self, identity: &str) -> Option<CachedToken> {
        let path = self.path_for(identity)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let token = CachedToken::decode(content);
                if token.is_none() {
                    debug!(path = %path.display(), "persisted token is unreadable");
                }
                token
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no persisted token");
                None
            }
        }
    }

    async fn store(&self, identity: &str, token: &CachedToken) {
        let Some(path) = self.path_for(identity) else {
            return;
        };
        if let Err(e) = write_private(&path, token.value()).await {
            warn!(path = %path.display(), error = %e, "could not persist token");
        }
    }
}

async fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(dir).await?;
    }
    tokio::fs::write(path, content).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentError;
    use crate::fakes::CountingIssuer;

    fn jwt_in(secs: i64) -> String {
        jwt_expiring_at(OffsetDateTime::now_utc().unix_timestamp() + secs)
    }

    #[tokio::test]
    async fn fresh_cached_token_is_reused() {
        let issuer = Arc::new(CountingIssuer::returning(jwt_in(3600)));
        let cache = CredentialCache::new(issuer.clone(), CredentialCacheConfig::default());

        let first = cache.acquire("alice").await.unwrap();
        let second = cache.acquire("alice").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(issuer.count(), 1);
    }

    #[tokio::test]
    async fn token_within_margin_is_reissued() {
        let issuer = Arc::new(CountingIssuer::returning(jwt_in(5)));
        let cache = CredentialCache::new(issuer.clone(), CredentialCacheConfig::default());

        cache.acquire("alice").await.unwrap();
        cache.acquire("alice").await.unwrap();
        assert_eq!(issuer.count(), 2);
    }

    #[tokio::test]
    async fn identities_are_cached_separately() {
        let issuer = Arc::new(CountingIssuer::returning(jwt_in(3600)));
        let cache = CredentialCache::new(issuer.clone(), CredentialCacheConfig::default());

        cache.acquire("alice").await.unwrap();
        cache.acquire("bob").await.unwrap();
        cache.acquire("alice").await.unwrap();
        assert_eq!(issuer.count(), 2);
    }

    #[tokio::test]
    async fn persisted_token_is_reused_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CredentialCacheConfig::default().with_dir(dir.path());

        let issuer = Arc::new(CountingIssuer::returning(jwt_in(3600)));
        let first = CredentialCache::new(issuer.clone(), cfg.clone());
        let token = first.acquire("alice").await.unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join("alice.token")).unwrap();
        assert_eq!(on_disk, token);

        let second = CredentialCache::new(issuer.clone(), cfg);
        assert_eq!(second.acquire("alice").await.unwrap(), token);
        assert_eq!(issuer.count(), 1);
    }

    #[tokio::test]
    async fn expired_or_unreadable_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.token");
        let cfg = CredentialCacheConfig::default().with_dir(dir.path());

        for stale in [jwt_in(-60), "garbage".to_string()] {
            std::fs::write(&path, &stale).unwrap();
            let fresh = jwt_in(3600);
            let issuer = Arc::new(CountingIssuer::returning(fresh.clone()));
            let cache = CredentialCache::new(issuer.clone(), cfg.clone());

            assert_eq!(cache.acquire("alice").await.unwrap(), fresh);
            assert_eq!(issuer.count(), 1);
            assert_eq!(std::fs::read_to_string(&path).unwrap(), fresh);
        }
    }

    #[tokio::test]
    async fn unwritable_cache_dir_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let cfg = CredentialCacheConfig::default().with_dir(blocker.join("nested"));

        let issuer = Arc::new(CountingIssuer::returning(jwt_in(3600)));
        let cache = CredentialCache::new(issuer, cfg);
        assert!(cache.acquire("alice").await.is_ok());
    }

    #[tokio::test]
    async fn static_token_skips_issuer() {
        let issuer = Arc::new(CountingIssuer::returning(jwt_in(3600)));
        let cfg = CredentialCacheConfig::default().with_static_token(Some("fixed".into()));
        let cache = CredentialCache::new(issuer.clone(), cfg);

        assert_eq!(cache.acquire("anyone").await.unwrap(), "fixed");
        assert_eq!(issuer.count(), 0);
    }

    #[tokio::test]
    async fn issuing_failure_propagates() {
        let issuer = Arc::new(CountingIssuer::failing());
        let cache = CredentialCache::new(issuer, CredentialCacheConfig::default());

        assert!(matches!(
            cache.acquire("alice").await,
            Err(AgentError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_acquire_issues_once() {
        let issuer = Arc::new(CountingIssuer::returning(jwt_in(3600)).with_delay_ms(50));
        let cache = Arc::new(CredentialCache::new(
            issuer.clone(),
            CredentialCacheConfig::default(),
        ));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.acquire("alice").await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        assert_eq!(issuer.count(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reissue() {
        let issuer = Arc::new(CountingIssuer::returning(jwt_in(3600)));
        let cache = CredentialCache::new(issuer.clone(), CredentialCacheConfig::default());

        cache.acquire("alice").await.unwrap();
        cache.invalidate("alice").await;
        cache.acquire("alice").await.unwrap();
        assert_eq!(issuer.count(), 2);
    }
}
