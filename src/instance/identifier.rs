use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::errors::ConnectorError;

/// Which address of an instance to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IpType {
    #[default]
    Public,
    Private,
}

impl IpType {
    /// Value of `ipAddresses[].type` in the SQL Admin API.
    pub fn api_name(&self) -> &'static str {
        match self {
            IpType::Public => "PRIMARY",
            IpType::Private => "PRIVATE",
        }
    }

    pub fn from_api_name(value: &str) -> Option<Self> {
        match value {
            "PRIMARY" => Some(IpType::Public),
            "PRIVATE" => Some(IpType::Private),
            _ => None,
        }
    }
}

impl fmt::Display for IpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpType::Public => f.write_str("public"),
            IpType::Private => f.write_str("private"),
        }
    }
}

impl FromStr for IpType {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "primary" => Ok(IpType::Public),
            "private" => Ok(IpType::Private),
            other => Err(ConnectorError::Config(format!(
                "unknown ip type '{}', expected 'public' or 'private'",
                other
            ))),
        }
    }
}

/// `project:region:instance`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceIdentifier {
    pub project: String,
    pub region: String,
    pub instance: String,
}

impl FromStr for InstanceIdentifier {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConnectorError::InvalidIdentifier { value: s.to_owned() };
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [project, region, instance]
                if !project.is_empty() && !region.is_empty() && !instance.is_empty() =>
            {
                Ok(Self {
                    project: (*project).to_owned(),
                    region: (*region).to_owned(),
                    instance: (*instance).to_owned(),
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for InstanceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.project, self.region, self.instance)
    }
}
