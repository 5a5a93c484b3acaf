//! Connection parameter providers.
//!
//! [`Connector`] computes the per-attempt overrides (IAM token as `password`,
//! resolved instance address as `host`). [`ConnInfoProvider`] and
//! [`ConnectHook`] adapt it to the two hook shapes pools and ORMs expose:
//! "give me a conninfo string" and "edit these parameters before connecting".

pub mod connector;
pub mod conninfo_provider;
pub mod hook;

pub use connector::{Connector, ConnectorBuilder};
pub use conninfo_provider::ConnInfoProvider;
pub use hook::ConnectHook;
