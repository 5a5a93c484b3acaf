pub mod credential;
pub mod token_supplier;

pub use credential::{Credential, Freshness};
pub use token_supplier::{TokenSupplier, TokenSupplierBuilder};
