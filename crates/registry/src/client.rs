use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    mapion_config::RegistryConfig,
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::{error::Result, plate::NormalizedPlate, token::TokenCache};

/// Placeholder for fields the registry did not return.
pub const NOT_AVAILABLE: &str = "N/D";

/// Default timeout for a single plate lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Vehicle data returned for a found plate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRecord {
    pub chassis: String,
    pub responsible: String,
    pub phone: String,
}

/// Outcome of resolving one plate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found(VehicleRecord),
    NotFound,
    /// No bearer token could be obtained; the lookup was not attempted.
    AuthUnavailable,
    /// Transport failure, timeout, unexpected status, or undecodable body.
    UpstreamError,
}

/// Resolves validated plates. Implemented by [`RegistryClient`]; the
/// dispatcher only depends on this trait.
#[async_trait]
pub trait PlateLookup: Send + Sync {
    async fn lookup(&self, plate: &NormalizedPlate) -> LookupResult;
}

#[derive(Deserialize)]
struct RegistryRecord {
    #[serde(default)]
    chassi: Option<serde_json::Value>,
    #[serde(default)]
    responsavel: Option<serde_json::Value>,
    #[serde(default)]
    telefone: Option<serde_json::Value>,
}

impl From<RegistryRecord> for VehicleRecord {
    fn from(record: RegistryRecord) -> Self {
        Self {
            chassis: field_or_placeholder(record.chassi),
            responsible: field_or_placeholder(record.responsavel),
            phone: field_or_placeholder(record.telefone),
        }
    }
}

/// Strings pass through, numbers are rendered, absent/null become `N/D`.
fn field_or_placeholder(value: Option<serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => NOT_AVAILABLE.to_string(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

/// Authenticated client for the plate registry.
pub struct RegistryClient {
    http: reqwest::Client,
    consulta_url: Option<String>,
    timeout: Duration,
    tokens: Arc<TokenCache>,
}

impl RegistryClient {
    pub fn new(http: reqwest::Client, consulta_url: Option<String>, tokens: Arc<TokenCache>) -> Self {
        Self {
            http,
            consulta_url: consulta_url.filter(|u| !u.trim().is_empty()),
            timeout: DEFAULT_LOOKUP_TIMEOUT,
            tokens,
        }
    }

    /// Build the client and its token cache from the `[registry]` config section.
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        let tokens = Arc::new(TokenCache::from_config(http.clone(), config));
        Ok(Self::new(http, config.consulta_url.clone(), tokens)
            .with_timeout(Duration::from_secs(config.lookup_timeout_secs)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    fn plate_url(base: &str, plate: &NormalizedPlate) -> String {
        format!("{}/{}", base.trim_end_matches('/'), plate.as_str())
    }
}

#[async_trait]
impl PlateLookup for RegistryClient {
    async fn lookup(&self, plate: &NormalizedPlate) -> LookupResult {
        let Some(base) = self.consulta_url.as_deref() else {
            warn!(%plate, "registry lookup URL is not configured");
            return LookupResult::AuthUnavailable;
        };

        let Some(token) = self.tokens.get_token().await else {
            return LookupResult::AuthUnavailable;
        };

        let url = Self::plate_url(base, plate);
        let resp = match self
            .http
            .get(&url)
            .bearer_auth(token.expose())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%plate, error = %e, "registry lookup failed");
                return LookupResult::UpstreamError;
            },
        };

        match resp.status() {
            reqwest::StatusCode::OK => match resp.json::<RegistryRecord>().await {
                Ok(record) => {
                    debug!(%plate, "plate found");
                    LookupResult::Found(record.into())
                },
                Err(e) => {
                    warn!(%plate, error = %e, "registry returned an undecodable body");
                    LookupResult::UpstreamError
                },
            },
            reqwest::StatusCode::NOT_FOUND => {
                debug!(%plate, "plate not found");
                LookupResult::NotFound
            },
            status => {
                let body = resp.text().await.unwrap_or_default();
                warn!(%plate, %status, body = %body, "registry returned unexpected status");
                LookupResult::UpstreamError
            },
        }
    }
}
