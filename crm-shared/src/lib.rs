//! # CRM Shared Library
//!
//! This crate contains the domain types, data access and business helpers used
//! by the CRM API server.
//!
//! ## Module Organization
//!
//! - `auth`: Token issuance, revocation, password hashing and ownership checks
//! - `db`: Connection pool and migrations
//! - `models`: Database models and their SQL operations
//! - `stats`: Dashboard and report aggregation
//! - `export`: CSV/JSON export rendering

pub mod auth;
pub mod db;
pub mod export;
pub mod models;
pub mod stats;

/// Current version of the CRM shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
