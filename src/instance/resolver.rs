use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use tracing::{debug, info};

use crate::errors::{ConnectorError, Result};
use crate::instance::identifier::{InstanceIdentifier, IpType};

/// One entry of `ipAddresses` with a recognised type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpMapping {
    pub ip_type: IpType,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIpMapping {
    #[serde(rename = "type", default)]
    ip_type: Option<String>,
    #[serde(default)]
    ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstanceMetadata {
    #[serde(default)]
    ip_addresses: Vec<RawIpMapping>,
    #[serde(default)]
    connection_name: Option<String>,
    #[serde(default)]
    database_version: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

/// Snapshot of a SQL Admin `instances.get` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceMetadata {
    pub addresses: Vec<IpMapping>,
    pub connection_name: Option<String>,
    pub database_version: Option<String>,
    pub region: Option<String>,
}

impl InstanceMetadata {
    /// Decode the API JSON. Address types other than PRIMARY / PRIVATE are dropped.
    pub fn from_json(body: &str) -> std::result::Result<Self, serde_json::Error> {
        let raw: RawInstanceMetadata = serde_json::from_str(body)?;
        let addresses = raw
            .ip_addresses
            .into_iter()
            .filter_map(|entry| {
                let ip_type = entry.ip_type.as_deref().and_then(IpType::from_api_name);
                match (ip_type, entry.ip_address) {
                    (Some(ip_type), Some(address)) => Some(IpMapping { ip_type, address }),
                    (_, address) => {
                        debug!("ignoring address {:?} of type {:?}", address, entry.ip_type);
                        None
                    }
                }
            })
            .collect();
        Ok(Self {
            addresses,
            connection_name: raw.connection_name,
            database_version: raw.database_version,
            region: raw.region,
        })
    }

    pub fn with_address(mut self, ip_type: IpType, address: impl Into<String>) -> Self {
        self.addresses.push(IpMapping {
            ip_type,
            address: address.into(),
        });
        self
    }

    pub fn address(&self, ip_type: IpType) -> Option<&str> {
        self.addresses
            .iter()
            .find(|mapping| mapping.ip_type == ip_type)
            .map(|mapping| mapping.address.as_str())
    }
}

/// Looks up instance metadata.
#[async_trait]
pub trait InstanceDirectory: Send + Sync + Debug {
    async fn fetch_metadata(&self, id: &InstanceIdentifier) -> Result<InstanceMetadata>;
}

/// Resolves instance addresses from a snapshot fetched once at construction.
#[derive(Debug, Clone)]
pub struct InstanceResolver {
    id: InstanceIdentifier,
    metadata: InstanceMetadata,
}

impl InstanceResolver {
    /// Parse `connection_name`, then fetch its metadata.
    ///
    /// A malformed name fails before `directory` is contacted.
    pub async fn new(connection_name: &str, directory: &dyn InstanceDirectory) -> Result<Self> {
        let id: InstanceIdentifier = connection_name.parse()?;
        Self::fetch(id, directory).await
    }

    pub async fn fetch(id: InstanceIdentifier, directory: &dyn InstanceDirectory) -> Result<Self> {
        let metadata = directory.fetch_metadata(&id).await?;
        info!(
            "fetched metadata for instance '{}': {} address(es), version {:?}",
            id,
            metadata.addresses.len(),
            metadata.database_version
        );
        Ok(Self { id, metadata })
    }

    pub fn from_metadata(id: InstanceIdentifier, metadata: InstanceMetadata) -> Self {
        Self { id, metadata }
    }

    pub fn id(&self) -> &InstanceIdentifier {
        &self.id
    }

    pub fn project(&self) -> &str {
        &self.id.project
    }

    pub fn instance(&self) -> &str {
        &self.id.instance
    }

    pub fn metadata(&self) -> &InstanceMetadata {
        &self.metadata
    }

    /// First address of `ip_type` in the snapshot.
    pub fn get_host(&self, ip_type: IpType) -> Result<String> {
        self.metadata
            .address(ip_type)
            .map(str::to_owned)
            .ok_or_else(|| ConnectorError::AddressNotFound {
                ip_type,
                instance: self.id.to_string(),
            })
    }
}
