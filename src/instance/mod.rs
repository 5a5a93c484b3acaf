//! Cloud SQL instance lookup: identifiers, metadata snapshots and the
//! SQL Admin API client.

pub mod identifier;
pub mod resolver;
pub mod sqladmin;

pub use identifier::{InstanceIdentifier, IpType};
pub use resolver::{InstanceDirectory, InstanceMetadata, InstanceResolver, IpMapping};
pub use sqladmin::SqlAdminDirectory;
