/// Lead endpoints
///
/// # Endpoints
///
/// - `GET /api/leads?status=new` - List own leads
/// - `POST /api/leads` - Create a lead
/// - `GET /api/leads/:id` - Get a lead
/// - `PUT /api/leads/:id` - Replace a lead's editable fields
/// - `DELETE /api/leads/:id` - Delete a lead
/// - `POST /api/leads/:id/convert` - Turn a lead into a customer

use super::owned;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use crate::extract::{Json, Path, Query};
use axum::{extract::State, http::StatusCode, Extension};
use crm_shared::{
    auth::middleware::AuthContext,
    models::{
        activity::{kinds, Activity, NewActivity},
        customer::Customer,
        lead::{Lead, LeadFilter, LeadInput, LeadStatus},
        notification::{NewNotification, Notification, NotificationKind},
    },
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

const ENTITY: &str = "lead";

#[derive(Debug, Serialize)]
pub struct ListLeadsResponse {
    pub leads: Vec<Lead>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ConvertLeadResponse {
    pub lead: Lead,
    pub customer: Customer,
}

pub async fn list_leads(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<LeadFilter>,
) -> ApiResult<Json<ListLeadsResponse>> {
    let leads = Lead::list_by_owner(&state.db, auth.user_id, &filter).await?;

    Ok(Json(ListLeadsResponse {
        total: leads.len(),
        leads,
    }))
}

/// Create a lead
///
/// # Endpoint
///
/// ```text
/// POST /api/leads
/// Content-Type: application/json
///
/// {
///   "name": "Bruno Lima",
///   "email": "bruno@example.com",
///   "source": "referral"
/// }
/// ```
///
/// `status` defaults to `new`.
pub async fn create_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<LeadInput>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    req.validate()?;

    let lead = Lead::create(&state.db, auth.user_id, req).await?;

    tracing::info!(user_id = %auth.user_id, lead_id = %lead.id, "Lead created");

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(kinds::LEAD_CREATED, format!("Lead {} created", lead.name))
            .entity(ENTITY, lead.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(lead)))
}

pub async fn get_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Lead>> {
    let lead = owned(Lead::find_by_id(&state.db, id).await?, &auth, "Lead")?;
    Ok(Json(lead))
}

/// Replace a lead
///
/// A status change is written to the activity log.
///
/// # Errors
///
/// - `403 Forbidden`: Lead belongs to another user
/// - `404 Not Found`: No such lead
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<LeadInput>,
) -> ApiResult<Json<Lead>> {
    req.validate()?;
    let existing = owned(Lead::find_by_id(&state.db, id).await?, &auth, "Lead")?;

    let lead = owned(Lead::update(&state.db, existing.id, req).await?, &auth, "Lead")?;

    if existing.status != lead.status {
        Activity::record_quietly(
            &state.db,
            auth.user_id,
            NewActivity::new(
                kinds::LEAD_STATUS_CHANGED,
                format!(
                    "Lead {} moved from {} to {}",
                    lead.name,
                    existing.status.as_str(),
                    lead.status.as_str()
                ),
            )
            .entity(ENTITY, lead.id)
            .metadata(json!({
                "from": existing.status.as_str(),
                "to": lead.status.as_str(),
            })),
        )
        .await;
    }

    Ok(Json(lead))
}

/// Delete a lead
///
/// # Response
///
/// `204 No Content`
pub async fn delete_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let lead = owned(Lead::find_by_id(&state.db, id).await?, &auth, "Lead")?;

    Lead::delete(&state.db, lead.id).await?;

    tracing::info!(user_id = %auth.user_id, lead_id = %lead.id, "Lead deleted");

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(kinds::LEAD_DELETED, format!("Lead {} deleted", lead.name))
            .entity(ENTITY, lead.id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Convert a lead into a customer
///
/// Creates an active customer with source `lead` from the lead's contact
/// data and marks the lead `converted`, in one transaction.
///
/// # Endpoint
///
/// ```text
/// POST /api/leads/:id/convert
/// Authorization: Bearer <access_token>
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "lead": { "id": "uuid", "status": "converted", "customer_id": "uuid", ... },
///   "customer": { "id": "uuid", "source": "lead", "lead_id": "uuid", ... }
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Lead belongs to another user
/// - `404 Not Found`: No such lead
/// - `409 Conflict`: Lead was already converted
pub async fn convert_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ConvertLeadResponse>)> {
    let lead = owned(Lead::find_by_id(&state.db, id).await?, &auth, "Lead")?;

    if lead.status == LeadStatus::Converted {
        return Err(ApiError::Conflict("Lead already converted".to_string()));
    }

    let (lead, customer) = lead
        .convert(&state.db)
        .await?
        .ok_or_else(|| ApiError::Conflict("Lead already converted".to_string()))?;

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(
            kinds::LEAD_CONVERTED,
            format!("Lead {} converted to customer", lead.name),
        )
        .entity(ENTITY, lead.id)
        .metadata(json!({ "customer_id": customer.id })),
    )
    .await;
    Notification::notify_quietly(
        &state.db,
        auth.user_id,
        NewNotification::new(
            NotificationKind::Success,
            "Lead converted",
            format!("{} is now a customer", customer.name),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ConvertLeadResponse { lead, customer })))
}
