//! # CRM API Server Library
//!
//! HTTP surface of the CRM: configuration, error mapping, the router and
//! its handlers. Domain logic lives in `crm-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors rejecting with `ApiError`
//! - `middleware`: Response middleware
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
