use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::settings::{ConnectionConfig, CredentialsConfig, LoggingConfig, SqlAdminConfig};
use crate::cache::token_supplier::TokenSupplier;
use crate::errors::Result;
use crate::instance::SqlAdminDirectory;
use crate::provider::{ConnInfoProvider, ConnectorBuilder};
use crate::sources::{ApplicationDefaultSource, CredentialSource};
use crate::utils::constants::SCOPE_SQLSERVICE_ADMIN;

/// ================================
/// Full connector configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectorConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub sql_admin: SqlAdminConfig,
    pub logging: Option<LoggingConfig>,
}

impl ConnectorConfig {
    /// Credential source described by the `credentials` block.
    pub fn credential_source(&self) -> Arc<dyn CredentialSource> {
        match &self.credentials.credentials_file {
            Some(path) => Arc::new(ApplicationDefaultSource::with_credentials_file(PathBuf::from(path))),
            None => Arc::new(ApplicationDefaultSource::new()),
        }
    }

    /// Builder carrying every setting of this configuration.
    pub fn connector_builder(&self, client: &Client) -> ConnectorBuilder {
        let source = self.credential_source();
        let admin_supplier = TokenSupplier::builder()
            .scopes([SCOPE_SQLSERVICE_ADMIN])
            .maybe_safety_margin_seconds(self.credentials.safety_margin_seconds)
            .source(source.clone())
            .build();
        let directory = SqlAdminDirectory::with_token_supplier(client.clone(), admin_supplier)
            .endpoint(&self.sql_admin.endpoint);

        let mut builder = ConnectorBuilder::default()
            .client(client.clone())
            .maybe_instance_connection_name(self.connection.instance_connection_name.clone())
            .ip_type(self.connection.ip_type)
            .enable_iam_auth(self.connection.enable_iam_auth)
            .credential_source(source)
            .safety_margin_seconds(self.credentials.safety_margin_seconds)
            .directory(Arc::new(directory));
        if let Some(scopes) = &self.credentials.scopes {
            builder = builder.scopes(scopes.clone());
        }
        builder
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    pub async fn build_conninfo_provider(&self, client: &Client) -> Result<ConnInfoProvider> {
        self.connector_builder(client)
            .build_conninfo(self.connection.conninfo.clone())
            .await
    }
}
