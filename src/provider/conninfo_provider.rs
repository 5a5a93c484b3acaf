use std::sync::Arc;
use tracing::{debug, warn};

use crate::conninfo::ConnParams;
use crate::errors::Result;
use crate::observability::metrics::{get_metrics, FLAVOR_CONNINFO, OUTCOME_FAILED, OUTCOME_OK};
use crate::provider::connector::{Connector, ConnectorBuilder};

/// Dynamic conninfo callback for pools that ask for a fresh connection
/// string before each physical connect.
///
/// ```no_run
/// # async fn run() -> cloudsql_iam_connector::Result<()> {
/// use cloudsql_iam_connector::ConnInfoProvider;
///
/// let provider = ConnInfoProvider::builder()
///     .instance_connection_name("my-project:us-central1:my-instance")
///     .build_conninfo("postgresql://sa%40my-project.iam@/postgres")
///     .await?;
/// let conninfo = provider.conninfo().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnInfoProvider {
    conninfo: Arc<str>,
    connector: Connector,
}

impl ConnInfoProvider {
    pub fn new(conninfo: impl Into<String>, connector: Connector) -> Self {
        Self {
            conninfo: Arc::from(conninfo.into()),
            connector,
        }
    }

    pub fn builder() -> ConnectorBuilder {
        Connector::builder()
    }

    pub fn base_conninfo(&self) -> &str {
        &self.conninfo
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Base conninfo merged with a fresh token and the resolved host.
    pub async fn conninfo(&self) -> Result<String> {
        self.params().await.map(|params| params.to_conninfo())
    }

    /// Same as [`ConnInfoProvider::conninfo`], as structured parameters.
    pub async fn params(&self) -> Result<ConnParams> {
        let metrics = get_metrics().await;
        let result = self.merge().await;
        let outcome = if result.is_ok() { OUTCOME_OK } else { OUTCOME_FAILED };
        metrics
            .provider_invocations
            .with_label_values(&[FLAVOR_CONNINFO, outcome])
            .inc();
        result
    }

    async fn merge(&self) -> Result<ConnParams> {
        let mut params = ConnParams::parse(&self.conninfo).inspect_err(|err| warn!("{}", err))?;
        let overrides = self.connector.overrides().await?;
        params.merge(&overrides);
        debug!("conninfo: {}", params);
        Ok(params)
    }
}

impl ConnectorBuilder {
    /// Build the connector and wrap it around `conninfo`.
    pub async fn build_conninfo(self, conninfo: impl Into<String>) -> Result<ConnInfoProvider> {
        Ok(self.build().await?.conninfo_provider(conninfo))
    }
}
