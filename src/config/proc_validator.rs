//! Configuration validation with aggregated errors.
//! Every check runs before any network call so a broken config fails fast.

use tracing::error;

use crate::config::settings::{ConnectionConfig, CredentialsConfig, LoggingConfig};
use crate::config::types::ConnectorConfig;
use crate::conninfo::ConnParams;
use crate::instance::InstanceIdentifier;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_connector_config(cfg: &ConnectorConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_connection(&cfg.connection, &mut errors);
    validate_credentials(&cfg.credentials, &mut errors);
    if let Some(logging) = &cfg.logging {
        validate_logging(logging, &mut errors);
    }
    if !cfg.sql_admin.endpoint.starts_with("http://") && !cfg.sql_admin.endpoint.starts_with("https://") {
        errors.push(format!("sql_admin.endpoint '{}' must be an http(s) URL", cfg.sql_admin.endpoint));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        for err in &errors {
            error!("config validation: {}", err);
        }
        Err(errors)
    }
}

fn validate_connection(connection: &ConnectionConfig, errors: &mut Vec<String>) {
    if connection.conninfo.trim().is_empty() {
        errors.push("connection.conninfo must not be empty".to_string());
    } else if let Err(err) = ConnParams::parse(&connection.conninfo) {
        errors.push(format!("connection.conninfo: {}", err));
    }

    if let Some(name) = &connection.instance_connection_name {
        if let Err(err) = name.parse::<InstanceIdentifier>() {
            errors.push(format!("connection.instance_connection_name: {}", err));
        }
    }
}

fn validate_credentials(credentials: &CredentialsConfig, errors: &mut Vec<String>) {
    if credentials.scopes.as_ref().is_some_and(|scopes| scopes.iter().any(|s| s.trim().is_empty())) {
        errors.push("credentials.scopes must not contain empty entries".to_string());
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' must be one of {:?}",
            logging.level, LOG_LEVELS
        ));
    }
}
