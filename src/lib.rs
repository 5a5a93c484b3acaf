//! # Cloud SQL IAM connector
//!
//! Injects short-lived Google Cloud IAM access tokens and Cloud SQL instance
//! addresses into PostgreSQL connection parameters right before a pool or ORM
//! opens a physical connection.
//!
//! Modules:
//! - `cache` — credential freshness and the token supplier
//! - `sources`: Application Default Credentials (via google-cloud-auth) and static tokens
//! - `instance` — instance identifiers, metadata snapshots, SQL Admin API
//! - `conninfo` — libpq connection string parsing, merging and rendering
//! - `provider` — conninfo callback and before-connect hook
//! - `config` — YAML configuration used by the `cloudsql-conninfo` binary

pub mod cache;
pub mod config;
pub mod conninfo;
pub mod errors;
pub mod helpers;
pub mod instance;
pub mod observability;
pub mod provider;
pub mod sources;
pub mod tests;
pub mod utils;


pub use crate::cache::{Credential, Freshness, TokenSupplier};
pub use crate::conninfo::{make_conninfo, ConnParams};
pub use crate::errors::{ConnectorError, Result};
pub use crate::instance::{InstanceDirectory, InstanceIdentifier, InstanceResolver, IpType};
pub use crate::provider::{ConnInfoProvider, ConnectHook, Connector, ConnectorBuilder};
pub use crate::sources::CredentialSource;
