/// API route handlers, one module per resource
///
/// - `health`: liveness and database status
/// - `auth`: register, login, refresh, logout, current user
/// - `profile`: profile read/update and password change
/// - `customers`, `leads`, `sales`, `tasks`: record CRUD
/// - `activities`: activity log
/// - `notifications`: in-app notifications
/// - `dashboard`, `statistics`: aggregated reports
/// - `search`: cross-record search
/// - `export`: CSV/JSON downloads
///
/// Handlers that act on a single record load it, run the ownership check
/// and only then read or mutate it.

pub mod activities;
pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod leads;
pub mod notifications;
pub mod profile;
pub mod sales;
pub mod search;
pub mod statistics;
pub mod tasks;

use crate::error::{ApiError, ApiResult};
use crm_shared::auth::{authorization::Owned, middleware::AuthContext};

/// Unwraps a loaded record and checks that `auth` owns it
///
/// Missing records are 404, records of another user 403.
pub(crate) fn owned<T: Owned>(record: Option<T>, auth: &AuthContext, what: &str) -> ApiResult<T> {
    let record = record.ok_or_else(|| ApiError::NotFound(format!("{} not found", what)))?;
    record.ensure_owned_by(auth)?;
    Ok(record)
}
