use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::cache::token_supplier::TokenSupplier;
use crate::errors::{ConnectorError, Result};
use crate::instance::identifier::InstanceIdentifier;
use crate::instance::resolver::{InstanceDirectory, InstanceMetadata};
use crate::observability::metrics::{get_metrics, OUTCOME_FAILED, OUTCOME_OK};
use crate::utils::constants::{SCOPE_SQLSERVICE_ADMIN, SQL_ADMIN_API_VERSION, SQL_ADMIN_ENDPOINT_DEFAULT};

/// Cloud SQL Admin API `instances.get`.
#[derive(Debug, Clone)]
pub struct SqlAdminDirectory {
    endpoint: String,
    client: Client,
    token_supplier: TokenSupplier,
}

impl SqlAdminDirectory {
    /// Application Default Credentials scoped to `sqlservice.admin`.
    pub fn new(client: Client) -> Self {
        let token_supplier = TokenSupplier::builder()
            .scopes([SCOPE_SQLSERVICE_ADMIN])
            .build();
        Self::with_token_supplier(client, token_supplier)
    }

    pub fn with_token_supplier(client: Client, token_supplier: TokenSupplier) -> Self {
        Self {
            endpoint: SQL_ADMIN_ENDPOINT_DEFAULT.to_owned(),
            client,
            token_supplier,
        }
    }

    pub fn endpoint(mut self, endpoint: impl AsRef<str>) -> Self {
        self.endpoint = endpoint.as_ref().trim_end_matches('/').to_owned();
        self
    }

    pub fn instance_url(&self, id: &InstanceIdentifier) -> String {
        format!(
            "{}/sql/{}/projects/{}/instances/{}",
            self.endpoint, SQL_ADMIN_API_VERSION, id.project, id.instance
        )
    }

    async fn request(&self, id: &InstanceIdentifier) -> Result<InstanceMetadata> {
        let credential = self
            .token_supplier
            .get_credential()
            .await
            .map_err(|err| ConnectorError::metadata(id, err))?;

        let url = self.instance_url(id);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, credential.authorization())
            .send()
            .await
            .map_err(|err| ConnectorError::metadata(id, err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ConnectorError::metadata(id, err))?;
        if !status.is_success() {
            return Err(ConnectorError::metadata(
                id,
                format!("SQL Admin API returned {}: {}", status, body.trim()),
            ));
        }

        InstanceMetadata::from_json(&body)
            .map_err(|err| ConnectorError::metadata(id, format!("malformed response: {}", err)))
    }
}

#[async_trait]
impl InstanceDirectory for SqlAdminDirectory {
    async fn fetch_metadata(&self, id: &InstanceIdentifier) -> Result<InstanceMetadata> {
        let metrics = get_metrics().await;
        self.request(id)
            .await
            .inspect(|_| {
                metrics.metadata_fetches.with_label_values(&[OUTCOME_OK]).inc();
            })
            .inspect_err(|err| {
                metrics.metadata_fetches.with_label_values(&[OUTCOME_FAILED]).inc();
                error!("{}", err);
            })
    }
}
