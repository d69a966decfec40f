//! Process-wide cache for the registry's bearer token.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use {
    mapion_config::RegistryConfig,
    secrecy::{ExposeSecret, Secret},
    tokio::{sync::Mutex, time::Instant},
    tracing::{debug, info, warn},
};

use crate::{
    auth::{self, AuthStrategy, Credentials},
    error::{Error, Result},
};

/// Default validity window for an issued token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Default timeout for each credential attempt.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// A cached bearer token and the instant it stops being reused.
#[derive(Clone)]
pub struct AuthToken {
    secret: Secret<String>,
    expires_at: Instant,
}

impl AuthToken {
    #[must_use]
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Acquires and caches the upstream bearer token.
///
/// The slot is guarded by an async mutex that stays locked for the whole
/// check-and-acquire sequence, so concurrent callers wait for a single
/// in-flight acquisition instead of each running the strategy list.
/// Failures are never cached.
pub struct TokenCache {
    http: reqwest::Client,
    auth_url: Option<String>,
    credentials: Option<Credentials>,
    strategies: Vec<Box<dyn AuthStrategy>>,
    ttl: Duration,
    attempt_timeout: Duration,
    slot: Mutex<Option<AuthToken>>,
    acquisitions: AtomicU64,
    failures: AtomicU64,
}

impl TokenCache {
    pub fn new(
        http: reqwest::Client,
        auth_url: Option<String>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            http,
            auth_url,
            credentials,
            strategies: auth::default_strategies(),
            ttl: DEFAULT_TOKEN_TTL,
            attempt_timeout: DEFAULT_AUTH_TIMEOUT,
            slot: Mutex::new(None),
            acquisitions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Build from the `[registry]` config section.
    pub fn from_config(http: reqwest::Client, config: &RegistryConfig) -> Self {
        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) if !username.trim().is_empty() => {
                Some(Credentials {
                    username: username.clone(),
                    password: password.clone(),
                })
            },
            _ => None,
        };
        let auth_url = config.auth_url.clone().filter(|u| !u.trim().is_empty());
        Self::new(http, auth_url, credentials)
            .with_ttl(Duration::from_secs(config.token_ttl_secs))
            .with_attempt_timeout(Duration::from_secs(config.auth_timeout_secs))
    }

    /// Replace the candidate strategy list (tried in order).
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn AuthStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Return a fresh token, acquiring one if needed.
    ///
    /// `None` means the registry is unavailable (not configured, unreachable,
    /// or no strategy was accepted).
    ///
    /// A failed round is shared with the callers that were already waiting
    /// on it, so a batch of lookups runs at most one round while the
    /// credential endpoint is down. Calls made after that round start a new
    /// one; a round can take up to one attempt timeout per strategy.
    pub async fn get_token(&self) -> Option<AuthToken> {
        let failures_seen = self.failures.load(Ordering::Acquire);
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Some(token.clone());
        }

        if self.failures.load(Ordering::Acquire) != failures_seen {
            debug!("registry token round failed while waiting");
            return None;
        }

        match self.acquire().await {
            Ok(token) => {
                *slot = Some(token.clone());
                Some(token)
            },
            Err(e) => {
                // A stale token must not be handed out after a failed refresh.
                *slot = None;
                self.failures.fetch_add(1, Ordering::Release);
                warn!(error = %e, "registry token unavailable");
                None
            },
        }
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// Number of acquisition rounds attempted since creation.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    async fn acquire(&self) -> Result<AuthToken> {
        let url = self
            .auth_url
            .as_deref()
            .ok_or(Error::NotConfigured("auth_url"))?;
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(Error::NotConfigured("credentials"))?;

        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        debug!(
            strategies = self.strategies.len(),
            "acquiring registry token"
        );

        let secret = auth::request_token(
            &self.http,
            url,
            credentials,
            &self.strategies,
            self.attempt_timeout,
        )
        .await?;

        info!(ttl_secs = self.ttl.as_secs(), "registry token acquired");
        Ok(AuthToken {
            secret,
            expires_at: Instant::now() + self.ttl,
        })
    }
}
