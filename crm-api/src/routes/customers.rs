/// Customer endpoints
///
/// # Endpoints
///
/// - `GET /api/customers?status=active` - List own customers, newest first
/// - `POST /api/customers` - Create a customer
/// - `GET /api/customers/:id` - Get a customer
/// - `PUT /api/customers/:id` - Replace a customer's editable fields
/// - `DELETE /api/customers/:id` - Delete a customer

use super::owned;
use crate::{app::AppState, error::ApiResult};
use crate::extract::{Json, Path, Query};
use axum::{extract::State, http::StatusCode, Extension};
use crm_shared::{
    auth::middleware::AuthContext,
    models::{
        activity::{kinds, Activity, NewActivity},
        customer::{Customer, CustomerFilter, CustomerInput},
    },
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

const ENTITY: &str = "customer";

#[derive(Debug, Serialize)]
pub struct ListCustomersResponse {
    pub customers: Vec<Customer>,
    pub total: usize,
}

/// List customers
///
/// # Endpoint
///
/// ```text
/// GET /api/customers?status=active
/// Authorization: Bearer <access_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "customers": [{ "id": "uuid", "name": "Acme", "status": "active", ... }],
///   "total": 1
/// }
/// ```
pub async fn list_customers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<CustomerFilter>,
) -> ApiResult<Json<ListCustomersResponse>> {
    let customers = Customer::list_by_owner(&state.db, auth.user_id, &filter).await?;

    Ok(Json(ListCustomersResponse {
        total: customers.len(),
        customers,
    }))
}

/// Create a customer
///
/// # Endpoint
///
/// ```text
/// POST /api/customers
/// Content-Type: application/json
///
/// {
///   "name": "Acme",
///   "email": "contact@acme.com",
///   "status": "active",
///   "source": "website",
///   "tags": ["vip"]
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Missing name or malformed email
pub async fn create_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    req.validate()?;

    let customer = Customer::create(&state.db, auth.user_id, req).await?;

    tracing::info!(user_id = %auth.user_id, customer_id = %customer.id, "Customer created");

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(
            kinds::CUSTOMER_CREATED,
            format!("Customer {} created", customer.name),
        )
        .entity(ENTITY, customer.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(customer)))
}

/// Get a customer
///
/// # Errors
///
/// - `403 Forbidden`: Customer belongs to another user
/// - `404 Not Found`: No such customer
pub async fn get_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Customer>> {
    let customer = owned(Customer::find_by_id(&state.db, id).await?, &auth, "Customer")?;
    Ok(Json(customer))
}

/// Replace a customer
///
/// Every editable field is overwritten; omitted optional fields become null.
///
/// # Errors
///
/// - `403 Forbidden`: Customer belongs to another user
/// - `404 Not Found`: No such customer
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    req.validate()?;
    let existing = owned(Customer::find_by_id(&state.db, id).await?, &auth, "Customer")?;

    let customer = owned(Customer::update(&state.db, existing.id, req).await?, &auth, "Customer")?;

    let mut activity = NewActivity::new(
        kinds::CUSTOMER_UPDATED,
        format!("Customer {} updated", customer.name),
    )
    .entity(ENTITY, customer.id);
    if existing.status != customer.status {
        activity = activity.metadata(json!({
            "from": existing.status.as_str(),
            "to": customer.status.as_str(),
        }));
    }
    Activity::record_quietly(&state.db, auth.user_id, activity).await;

    Ok(Json(customer))
}

/// Delete a customer
///
/// Sales of the customer are deleted with it.
///
/// # Response
///
/// `204 No Content`
pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let customer = owned(Customer::find_by_id(&state.db, id).await?, &auth, "Customer")?;

    Customer::delete(&state.db, customer.id).await?;

    tracing::info!(user_id = %auth.user_id, customer_id = %customer.id, "Customer deleted");

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(
            kinds::CUSTOMER_DELETED,
            format!("Customer {} deleted", customer.name),
        )
        .entity(ENTITY, customer.id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
