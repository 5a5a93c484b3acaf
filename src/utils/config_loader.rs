use std::path::Path;

use crate::config::proc_loader::file_to_config;
use crate::config::types::ConnectorConfig;
use crate::errors::{ConnectorError, Result};

pub async fn run(config_path: &str) -> Result<ConnectorConfig> {
    let path = Path::new(config_path);
    file_to_config(path).await.map_err(|e| match e {
        ConnectorError::Config(reason) => ConnectorError::Config(format!("Invalid config format: {}", reason)),
        other => other,
    })
}
