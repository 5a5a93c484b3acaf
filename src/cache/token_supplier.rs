use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::credential::{freshness_of, Credential, Freshness};
use crate::errors::Result;
use crate::helpers::time::get_token_safety_margin_seconds;
use crate::observability::metrics::{
    get_metrics, OUTCOME_ACQUIRED, OUTCOME_CACHED, OUTCOME_FAILED, OUTCOME_REFRESHED,
};
use crate::sources::{ApplicationDefaultSource, CredentialSource};
use crate::utils::constants::CLOUDSQL_IAM_LOGIN_SCOPES;

/// Hands out access tokens, acquiring lazily and refreshing when stale.
///
/// Clones share the cached credential. The lock is released while talking to
/// the credential source, so concurrent first calls may each acquire a token;
/// the last one written wins.
#[derive(Debug, Clone)]
pub struct TokenSupplier {
    scopes: Arc<Vec<String>>,
    safety_margin_seconds: u64,
    source: Arc<dyn CredentialSource>,
    cached: Arc<RwLock<Option<Credential>>>,
}

impl TokenSupplier {
    /// Application Default Credentials with the IAM login scope set.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TokenSupplierBuilder {
        TokenSupplierBuilder::default()
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub async fn freshness(&self) -> Freshness {
        freshness_of(self.cached.read().await.as_ref(), self.safety_margin_seconds)
    }

    /// Return a token that is fresh at the moment of return.
    pub async fn get_token(&self) -> Result<String> {
        self.get_credential().await.map(|credential| credential.token)
    }

    pub async fn get_credential(&self) -> Result<Credential> {
        let metrics = get_metrics().await;
        let current = self.cached.read().await.clone();

        let freshness = freshness_of(current.as_ref(), self.safety_margin_seconds);
        let (outcome, result) = match (freshness, current) {
            (Freshness::Fresh, Some(credential)) => {
                debug!("using cached credential");
                metrics.token_requests.with_label_values(&[OUTCOME_CACHED]).inc();
                return Ok(credential);
            }
            (Freshness::Stale, Some(stale)) => {
                info!("cached credential is stale, refreshing");
                (OUTCOME_REFRESHED, self.source.refresh(&stale).await)
            }
            _ => {
                info!("acquiring credential for scopes {:?}", self.scopes);
                (OUTCOME_ACQUIRED, self.source.discover_default(&self.scopes).await)
            }
        };

        match result {
            Ok(credential) => {
                metrics.token_requests.with_label_values(&[outcome]).inc();
                debug!("credential {}, expires at {:?}", outcome, credential.expires_at);
                *self.cached.write().await = Some(credential.clone());
                Ok(credential)
            }
            Err(err) => {
                metrics.token_requests.with_label_values(&[OUTCOME_FAILED]).inc();
                warn!("token {} failed: {}", outcome, err);
                Err(err)
            }
        }
    }

    /// Mark the cached credential stale so the next call refreshes it.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        if let Some(credential) = cached.as_ref() {
            *cached = Some(credential.invalidated());
        }
    }
}

impl Default for TokenSupplier {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct TokenSupplierBuilder {
    scopes: Option<Vec<String>>,
    safety_margin_seconds: Option<u64>,
    source: Option<Arc<dyn CredentialSource>>,
}

impl TokenSupplierBuilder {
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn safety_margin_seconds(mut self, seconds: u64) -> Self {
        self.safety_margin_seconds = Some(seconds);
        self
    }

    pub fn maybe_safety_margin_seconds(mut self, seconds: Option<u64>) -> Self {
        self.safety_margin_seconds = seconds.or(self.safety_margin_seconds);
        self
    }

    pub fn source(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> TokenSupplier {
        let scopes = self
            .scopes
            .filter(|scopes| !scopes.is_empty())
            .unwrap_or_else(|| CLOUDSQL_IAM_LOGIN_SCOPES.iter().map(|s| s.to_string()).collect());
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(ApplicationDefaultSource::new()));
        TokenSupplier {
            scopes: Arc::new(scopes),
            safety_margin_seconds: get_token_safety_margin_seconds(None, self.safety_margin_seconds),
            source,
            cached: Arc::new(RwLock::new(None)),
        }
    }
}
