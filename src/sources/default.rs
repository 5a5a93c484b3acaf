use async_trait::async_trait;
use google_cloud_auth::credentials::service_account::AccessSpecifier;
use google_cloud_auth::credentials::{
    external_account, impersonated, service_account, user_account, Builder, CacheableResource,
    Credentials,
};
use http::header::AUTHORIZATION;
use http::Extensions;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::credential::Credential;
use crate::errors::{ConnectorError, Result};
use crate::helpers::time::expires_at_from_now;
use crate::sources::CredentialSource;
use crate::utils::constants::ADC_RECHECK_SECONDS;

enum Origin {
    Discovered,
    File(PathBuf),
    Fixed(Credentials),
}

/// Google credentials resolved by `google-cloud-auth`.
///
/// By default this is Application Default Credentials: `GOOGLE_APPLICATION_CREDENTIALS`,
/// the gcloud well-known file, then the metadata server. One `Credentials`
/// handle is built per scope set and reused; the library keeps its own token
/// cache and refreshes ahead of expiry.
pub struct ApplicationDefaultSource {
    origin: Origin,
    built: Mutex<HashMap<Vec<String>, Credentials>>,
}

impl ApplicationDefaultSource {
    pub fn new() -> Self {
        Self::with_origin(Origin::Discovered)
    }

    /// Skip discovery and always load `path`.
    pub fn with_credentials_file(path: impl Into<PathBuf>) -> Self {
        Self::with_origin(Origin::File(path.into()))
    }

    /// Use prebuilt credentials for every scope set.
    pub fn from_credentials(credentials: Credentials) -> Self {
        Self::with_origin(Origin::Fixed(credentials))
    }

    fn with_origin(origin: Origin) -> Self {
        Self {
            origin,
            built: Mutex::new(HashMap::new()),
        }
    }

    async fn credentials(&self, scopes: &[String]) -> Result<Credentials> {
        let path = match &self.origin {
            Origin::Fixed(credentials) => return Ok(credentials.clone()),
            Origin::File(path) => Some(path),
            Origin::Discovered => None,
        };

        let mut built = self.built.lock().await;
        if let Some(credentials) = built.get(scopes) {
            return Ok(credentials.clone());
        }
        let credentials = match path {
            Some(path) => load_credentials_file(path, scopes).await?,
            None => discover(scopes.to_vec()).await?,
        };
        info!("google credentials ready for scopes {:?}", scopes);
        built.insert(scopes.to_vec(), credentials.clone());
        Ok(credentials)
    }
}

impl Default for ApplicationDefaultSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApplicationDefaultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origin = match &self.origin {
            Origin::Discovered => "application default".to_owned(),
            Origin::File(path) => path.display().to_string(),
            Origin::Fixed(_) => "prebuilt".to_owned(),
        };
        f.debug_struct("ApplicationDefaultSource")
            .field("origin", &origin)
            .finish()
    }
}

async fn discover(scopes: Vec<String>) -> Result<Credentials> {
    // the ADC builder reads the filesystem synchronously
    tokio::task::spawn_blocking(move || Builder::default().with_scopes(scopes).build())
        .await
        .map_err(|err| ConnectorError::auth(format!("credential discovery aborted: {}", err)))?
        .map_err(|err| ConnectorError::auth(format!("application default credentials: {}", err)))
}

/// Build credentials from a credentials JSON file.
pub async fn load_credentials_file(path: &Path, scopes: &[String]) -> Result<Credentials> {
    let content = tokio::fs::read_to_string(path).await.map_err(|err| {
        ConnectorError::auth(format!("cannot read credentials file {}: {}", path.display(), err))
    })?;
    let json: Value = serde_json::from_str(&content).map_err(|err| {
        ConnectorError::auth(format!("malformed credentials file {}: {}", path.display(), err))
    })?;
    debug!("loading credentials from {}", path.display());
    credentials_from_json(json, scopes)
        .map_err(|err| ConnectorError::auth(format!("{} ({})", err, path.display())))
}

/// Dispatch on the `type` field the way gcloud-generated files are laid out.
pub fn credentials_from_json(json: Value, scopes: &[String]) -> std::result::Result<Credentials, String> {
    let kind = json
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let scopes = scopes.to_vec();
    let built = match kind.as_str() {
        "service_account" => service_account::Builder::new(json)
            .with_access_specifier(AccessSpecifier::from_scopes(scopes))
            .build()
            .map_err(|err| err.to_string()),
        "authorized_user" => user_account::Builder::new(json)
            .with_scopes(scopes)
            .build()
            .map_err(|err| err.to_string()),
        "impersonated_service_account" => impersonated::Builder::new(json)
            .with_scopes(scopes)
            .build()
            .map_err(|err| err.to_string()),
        "external_account" => external_account::Builder::new(json)
            .with_scopes(scopes)
            .build()
            .map_err(|err| err.to_string()),
        other => return Err(format!("unsupported credentials type '{}'", other)),
    };
    built.map_err(|err| format!("invalid {} credentials: {}", kind, err))
}

/// Bearer token carried by the `Authorization` header of `credentials`.
async fn bearer_token(credentials: &Credentials) -> Result<String> {
    let headers = match credentials
        .headers(Extensions::new())
        .await
        .map_err(|err| ConnectorError::auth(format!("token request failed: {}", err)))?
    {
        CacheableResource::New { data, .. } => data,
        CacheableResource::NotModified => {
            return Err(ConnectorError::auth("credentials returned no headers"));
        }
    };
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
        .ok_or_else(|| ConnectorError::auth("credentials did not produce a bearer token"))
}

#[async_trait]
impl CredentialSource for ApplicationDefaultSource {
    async fn discover_default(&self, scopes: &[String]) -> Result<Credential> {
        let credentials = self.credentials(scopes).await?;
        let token = bearer_token(&credentials).await?;
        Ok(Credential::new(
            token,
            Some(expires_at_from_now(ADC_RECHECK_SECONDS)),
            scopes.to_vec(),
        ))
    }
}
