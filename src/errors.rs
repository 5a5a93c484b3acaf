use thiserror::Error;

use crate::instance::IpType;

pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Failures surfaced by the connector. Nothing here is retried internally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectorError {
    /// The instance connection name is not `project:region:instance`.
    #[error("invalid instance connection name '{value}': expected 'project:region:instance'")]
    InvalidIdentifier { value: String },

    /// The SQL Admin API lookup failed (transport, auth or non-2xx).
    #[error("failed to fetch metadata for instance '{instance}': {reason}")]
    MetadataFetch { instance: String, reason: String },

    /// The metadata snapshot has no address of the requested type.
    #[error("no IP address found for type {} ({}) on instance '{instance}'", .ip_type, .ip_type.api_name())]
    AddressNotFound { ip_type: IpType, instance: String },

    /// Credential discovery, token minting or refresh failed.
    #[error("failed to resolve credentials: {0}")]
    AuthResolution(String),

    /// The base connection string could not be parsed.
    #[error("invalid connection string: {0}")]
    InvalidConninfo(String),

    /// Configuration file is missing, unreadable or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ConnectorError {
    pub(crate) fn auth(reason: impl std::fmt::Display) -> Self {
        ConnectorError::AuthResolution(reason.to_string())
    }

    pub(crate) fn metadata(instance: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        ConnectorError::MetadataFetch {
            instance: instance.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn conninfo(reason: impl std::fmt::Display) -> Self {
        ConnectorError::InvalidConninfo(reason.to_string())
    }
}
