use async_trait::async_trait;

use crate::cache::credential::Credential;
use crate::errors::Result;
use crate::sources::CredentialSource;

/// Hands out a pre-minted token, e.g. from `gcloud auth print-access-token`.
#[derive(Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticTokenSource")
    }
}

#[async_trait]
impl CredentialSource for StaticTokenSource {
    async fn discover_default(&self, scopes: &[String]) -> Result<Credential> {
        Ok(Credential::new(self.token.clone(), None, scopes.to_vec()))
    }
}
