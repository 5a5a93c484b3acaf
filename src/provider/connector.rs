use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::token_supplier::TokenSupplier;
use crate::conninfo::{ConnParams, KEY_HOST, KEY_PASSWORD};
use crate::errors::Result;
use crate::instance::{InstanceDirectory, InstanceIdentifier, InstanceResolver, IpType, SqlAdminDirectory};
use crate::provider::conninfo_provider::ConnInfoProvider;
use crate::provider::hook::ConnectHook;
use crate::sources::CredentialSource;
use crate::utils::constants::SCOPE_SQLSERVICE_ADMIN;

/// Produces the overrides injected into every connection attempt.
///
/// The host is resolved once when the connector is built; a token is fetched
/// on every call to [`Connector::overrides`].
#[derive(Debug, Clone)]
pub struct Connector {
    host: Option<Arc<str>>,
    token_supplier: Option<TokenSupplier>,
}

impl Connector {
    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::default()
    }

    /// Resolved instance address, if an instance was configured.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn iam_auth_enabled(&self) -> bool {
        self.token_supplier.is_some()
    }

    pub fn token_supplier(&self) -> Option<&TokenSupplier> {
        self.token_supplier.as_ref()
    }

    /// Parameters for one connection attempt.
    pub async fn overrides(&self) -> Result<ConnParams> {
        let mut overrides = ConnParams::new();
        if let Some(token_supplier) = &self.token_supplier {
            overrides.set(KEY_PASSWORD, token_supplier.get_token().await?);
        }
        if let Some(host) = &self.host {
            overrides.set(KEY_HOST, host.to_string());
        }
        debug!("connection overrides: {}", overrides);
        Ok(overrides)
    }

    pub fn conninfo_provider(self, conninfo: impl Into<String>) -> ConnInfoProvider {
        ConnInfoProvider::new(conninfo, self)
    }

    pub fn connect_hook(self) -> ConnectHook {
        ConnectHook::new(self)
    }
}

/// Construction surface shared by both provider flavors.
#[derive(Debug)]
pub struct ConnectorBuilder {
    instance_connection_name: Option<String>,
    ip_type: IpType,
    token_supplier: Option<TokenSupplier>,
    enable_iam_auth: bool,
    directory: Option<Arc<dyn InstanceDirectory>>,
    credential_source: Option<Arc<dyn CredentialSource>>,
    scopes: Option<Vec<String>>,
    safety_margin_seconds: Option<u64>,
    client: Option<Client>,
}

impl Default for ConnectorBuilder {
    fn default() -> Self {
        Self {
            instance_connection_name: None,
            ip_type: IpType::default(),
            token_supplier: None,
            enable_iam_auth: true,
            directory: None,
            credential_source: None,
            scopes: None,
            safety_margin_seconds: None,
            client: None,
        }
    }
}

impl ConnectorBuilder {
    /// `project:region:instance` whose address replaces the base host.
    pub fn instance_connection_name(mut self, name: impl Into<String>) -> Self {
        self.instance_connection_name = Some(name.into());
        self
    }

    pub fn maybe_instance_connection_name(mut self, name: Option<String>) -> Self {
        self.instance_connection_name = name.filter(|n| !n.is_empty());
        self
    }

    pub fn ip_type(mut self, ip_type: IpType) -> Self {
        self.ip_type = ip_type;
        self
    }

    /// Shared supplier; ignored when IAM auth is disabled.
    pub fn token_supplier(mut self, token_supplier: TokenSupplier) -> Self {
        self.token_supplier = Some(token_supplier);
        self
    }

    pub fn enable_iam_auth(mut self, enable: bool) -> Self {
        self.enable_iam_auth = enable;
        self
    }

    /// Where instance metadata comes from. Defaults to the SQL Admin API.
    pub fn directory(mut self, directory: Arc<dyn InstanceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Credential source for the default token supplier.
    pub fn credential_source(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.credential_source = Some(source);
        self
    }

    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    pub fn safety_margin_seconds(mut self, seconds: Option<u64>) -> Self {
        self.safety_margin_seconds = seconds;
        self
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Resolve the instance host now, failing fast on a bad identifier,
    /// unreachable metadata or a missing address type.
    pub async fn build(self) -> Result<Connector> {
        let client = self.client.unwrap_or_default();

        let token_supplier = if self.enable_iam_auth {
            Some(self.token_supplier.unwrap_or_else(|| {
                let mut builder = TokenSupplier::builder()
                    .maybe_safety_margin_seconds(self.safety_margin_seconds);
                if let Some(scopes) = self.scopes {
                    builder = builder.scopes(scopes);
                }
                if let Some(source) = self.credential_source.clone() {
                    builder = builder.source(source);
                }
                builder.build()
            }))
        } else {
            debug!("IAM authentication disabled, no token will be injected");
            None
        };

        let host = match self.instance_connection_name {
            Some(name) => {
                let id: InstanceIdentifier = name.parse()?;
                let directory = self.directory.unwrap_or_else(|| {
                    let directory = match self.credential_source {
                        Some(source) => SqlAdminDirectory::with_token_supplier(
                            client.clone(),
                            TokenSupplier::builder()
                                .scopes([SCOPE_SQLSERVICE_ADMIN])
                                .source(source)
                                .build(),
                        ),
                        None => SqlAdminDirectory::new(client.clone()),
                    };
                    Arc::new(directory) as Arc<dyn InstanceDirectory>
                });
                let resolver = InstanceResolver::fetch(id, directory.as_ref()).await?;
                let host = resolver.get_host(self.ip_type)?;
                info!("resolved {} address {} for instance '{}'", self.ip_type, host, resolver.id());
                Some(Arc::from(host))
            }
            None => None,
        };

        Ok(Connector {
            host,
            token_supplier,
        })
    }
}
