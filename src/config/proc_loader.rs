use std::path::Path;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::types::ConnectorConfig;
use crate::errors::{ConnectorError, Result};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ConnectorConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|err| {
        ConnectorError::Config(format!("cannot read {}: {}", path.display(), err))
    })?;

    parse_config(&expand_env_vars(&content))
}

pub fn parse_config(content: &str) -> Result<ConnectorConfig> {
    let config: ConnectorConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))
        .map_err(|e| ConnectorError::Config(e.to_string()))?;

    debug!("validating config ...");
    proc_validator::validate_connector_config(&config)
        .map_err(|errors| ConnectorError::Config(errors.join("; ")))?;

    Ok(config)
}

/// Replace `${VAR}` and `${VAR:default}` with environment values.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    let re = ENV_VAR.get_or_init(|| {
        Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("env var pattern is valid")
    });
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
