#[cfg(test)]
pub mod common;

mod conninfo_providers;
