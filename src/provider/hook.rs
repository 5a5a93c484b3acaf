use tracing::debug;

use crate::conninfo::ConnParams;
use crate::errors::Result;
use crate::observability::metrics::{get_metrics, FLAVOR_HOOK, OUTCOME_FAILED, OUTCOME_OK};
use crate::provider::connector::{Connector, ConnectorBuilder};

/// "Before connect" handler: writes `password` and `host` straight into the
/// parameters a pool or ORM is about to connect with.
#[derive(Debug, Clone)]
pub struct ConnectHook {
    connector: Connector,
}

impl ConnectHook {
    pub fn new(connector: Connector) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Inject overrides into `params`. On error `params` is left untouched.
    pub async fn before_connect(&self, params: &mut ConnParams) -> Result<()> {
        let metrics = get_metrics().await;
        match self.connector.overrides().await {
            Ok(overrides) => {
                params.merge(&overrides);
                debug!("before connect: {}", params);
                metrics.provider_invocations.with_label_values(&[FLAVOR_HOOK, OUTCOME_OK]).inc();
                Ok(())
            }
            Err(err) => {
                metrics.provider_invocations.with_label_values(&[FLAVOR_HOOK, OUTCOME_FAILED]).inc();
                Err(err)
            }
        }
    }
}

impl ConnectorBuilder {
    pub async fn build_hook(self) -> Result<ConnectHook> {
        Ok(self.build().await?.connect_hook())
    }
}
