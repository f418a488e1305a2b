/// Global search
///
/// # Endpoint
///
/// ```text
/// GET /api/search?q=acme
/// Authorization: Bearer <access_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "customers": [...],
///   "leads": [...],
///   "sales": [...],
///   "total": 3
/// }
/// ```
///
/// At most five results per kind. Matching is a case-insensitive substring
/// test on customer and lead name, email and company, and on sale
/// description.
///
/// # Errors
///
/// - `400 Bad Request`: `q` missing or shorter than two characters

use crate::{app::AppState, error::ApiResult};
use crate::extract::{Json, Query};
use axum::{extract::State, Extension};
use crm_shared::{
    auth::middleware::AuthContext,
    models::search::{search as search_records, SearchResults},
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResults>> {
    let results = search_records(&state.db, auth.user_id, &params.q).await?;
    Ok(Json(results))
}
