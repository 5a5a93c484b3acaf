use serde::Deserialize;

use crate::instance::IpType;
use crate::utils::constants::SQL_ADMIN_ENDPOINT_DEFAULT;

/// ================================
/// Connection
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    /// base conninfo; host / password may be placeholders
    pub conninfo: String,
    pub instance_connection_name: Option<String>,
    #[serde(default)]
    pub ip_type: IpType,
    #[serde(default = "default_enable_iam_auth")]
    pub enable_iam_auth: bool,
}

/// ================================
/// Credentials
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CredentialsConfig {
    pub scopes: Option<Vec<String>>,
    pub safety_margin_seconds: Option<u64>,
    /// credentials JSON (any gcloud `type`), bypasses ADC discovery
    pub credentials_file: Option<String>,
}

/// ================================
/// SQL Admin API
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SqlAdminConfig {
    #[serde(default = "default_sql_admin_endpoint")]
    pub endpoint: String,
}

impl Default for SqlAdminConfig {
    fn default() -> Self {
        Self {
            endpoint: default_sql_admin_endpoint(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_enable_iam_auth() -> bool {
    true
}

fn default_sql_admin_endpoint() -> String {
    SQL_ADMIN_ENDPOINT_DEFAULT.to_string()
}
