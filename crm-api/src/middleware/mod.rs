/// Middleware for the API server
///
/// - `security`: security response headers
///
/// Bearer-token authentication lives in [`crate::app`] as a `from_fn` layer
/// over [`crm_shared::auth::middleware::authenticate_request`].

pub mod security;
