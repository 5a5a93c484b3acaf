//! Credential sources
//!
//! Everything able to mint a Google OAuth2 access token for a scope set.
//! [`ApplicationDefaultSource`] delegates discovery to `google-cloud-auth`;
//! [`StaticTokenSource`] serves a fixed token.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::cache::credential::Credential;
use crate::errors::Result;

pub mod default;
pub mod static_token;

pub use default::ApplicationDefaultSource;
pub use static_token::StaticTokenSource;

/// Capability to obtain and renew access tokens.
#[async_trait]
pub trait CredentialSource: Send + Sync + Debug {
    /// Discover ambient credentials and mint a token for `scopes`.
    async fn discover_default(&self, scopes: &[String]) -> Result<Credential>;

    /// Mint a replacement for `credential`, keeping its scopes.
    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        self.discover_default(&credential.scopes).await
    }
}
