/// Sale endpoints
///
/// # Endpoints
///
/// - `GET /api/sales?status=paid&customer_id=uuid` - List own sales with customer summaries
/// - `POST /api/sales` - Create a sale
/// - `GET /api/sales/:id` - Get a sale
/// - `PUT /api/sales/:id` - Replace a sale's editable fields
/// - `DELETE /api/sales/:id` - Delete a sale
///
/// A sale can only reference a customer owned by the same user.

use super::owned;
use crate::{app::AppState, error::ApiResult};
use crate::extract::{Json, Path, Query};
use axum::{extract::State, http::StatusCode, Extension};
use crm_shared::{
    auth::middleware::AuthContext,
    models::{
        activity::{kinds, Activity, NewActivity},
        customer::Customer,
        notification::{NewNotification, Notification, NotificationKind},
        sale::{totals_by_status, Sale, SaleFilter, SaleInput, SaleStatus, SaleWithCustomer, StatusTotal},
    },
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

const ENTITY: &str = "sale";

#[derive(Debug, Serialize)]
pub struct ListSalesResponse {
    pub sales: Vec<SaleWithCustomer>,
    pub total: usize,

    /// Count and amount per status over the listed sales
    pub totals: BTreeMap<&'static str, StatusTotal>,
}

/// List sales
///
/// # Endpoint
///
/// ```text
/// GET /api/sales?status=paid
/// Authorization: Bearer <access_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "sales": [{
///     "id": "uuid", "amount": 1500.0, "status": "paid", ...,
///     "customer": { "id": "uuid", "name": "Acme", "email": "contact@acme.com" }
///   }],
///   "total": 1,
///   "totals": {
///     "canceled": { "count": 0, "amount": 0.0 },
///     "paid": { "count": 1, "amount": 1500.0 },
///     "pending": { "count": 0, "amount": 0.0 }
///   }
/// }
/// ```
pub async fn list_sales(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<SaleFilter>,
) -> ApiResult<Json<ListSalesResponse>> {
    let sales = Sale::list_with_customers(&state.db, auth.user_id, &filter).await?;
    let totals = totals_by_status(sales.iter().map(|s| &s.sale));

    Ok(Json(ListSalesResponse {
        total: sales.len(),
        sales,
        totals,
    }))
}

/// Create a sale
///
/// # Endpoint
///
/// ```text
/// POST /api/sales
/// Content-Type: application/json
///
/// {
///   "customer_id": "uuid",
///   "description": "Annual plan",
///   "amount": 1500.0,
///   "status": "pending",
///   "sale_date": "2025-03-10T12:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Customer belongs to another user
/// - `404 Not Found`: No such customer
/// - `422 Unprocessable Entity`: Missing description or negative amount
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SaleInput>,
) -> ApiResult<(StatusCode, Json<SaleWithCustomer>)> {
    req.validate()?;
    let customer = owned(
        Customer::find_by_id(&state.db, req.customer_id).await?,
        &auth,
        "Customer",
    )?;

    let sale = Sale::create(&state.db, auth.user_id, req).await?;

    tracing::info!(user_id = %auth.user_id, sale_id = %sale.id, amount = sale.amount, "Sale created");

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(
            kinds::SALE_CREATED,
            format!("Sale of {:.2} to {}", sale.amount, customer.name),
        )
        .entity(ENTITY, sale.id)
        .metadata(json!({ "amount": sale.amount, "customer_id": customer.id })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(SaleWithCustomer {
            sale,
            customer: Some(customer.summary()),
        }),
    ))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SaleWithCustomer>> {
    let sale = owned(Sale::find_by_id(&state.db, id).await?, &auth, "Sale")?;
    let customer = Customer::find_by_id(&state.db, sale.customer_id).await?;

    Ok(Json(SaleWithCustomer {
        sale,
        customer: customer.as_ref().map(Customer::summary),
    }))
}

/// Replace a sale
///
/// Omitting `sale_date` keeps the stored date. Moving a sale to `paid`
/// creates a notification.
///
/// # Errors
///
/// - `403 Forbidden`: Sale or new customer belongs to another user
/// - `404 Not Found`: No such sale or customer
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SaleInput>,
) -> ApiResult<Json<SaleWithCustomer>> {
    req.validate()?;
    let existing = owned(Sale::find_by_id(&state.db, id).await?, &auth, "Sale")?;
    let customer = owned(
        Customer::find_by_id(&state.db, req.customer_id).await?,
        &auth,
        "Customer",
    )?;

    let sale = owned(Sale::update(&state.db, existing.id, req).await?, &auth, "Sale")?;

    if existing.status != sale.status {
        Activity::record_quietly(
            &state.db,
            auth.user_id,
            NewActivity::new(
                kinds::SALE_STATUS_CHANGED,
                format!(
                    "Sale to {} moved from {} to {}",
                    customer.name,
                    existing.status.as_str(),
                    sale.status.as_str()
                ),
            )
            .entity(ENTITY, sale.id)
            .metadata(json!({
                "from": existing.status.as_str(),
                "to": sale.status.as_str(),
            })),
        )
        .await;

        if sale.status == SaleStatus::Paid {
            Notification::notify_quietly(
                &state.db,
                auth.user_id,
                NewNotification::new(
                    NotificationKind::Success,
                    "Sale paid",
                    format!("{} paid {:.2}", customer.name, sale.amount),
                ),
            )
            .await;
        }
    }

    Ok(Json(SaleWithCustomer {
        sale,
        customer: Some(customer.summary()),
    }))
}

/// Delete a sale
///
/// # Response
///
/// `204 No Content`
pub async fn delete_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let sale = owned(Sale::find_by_id(&state.db, id).await?, &auth, "Sale")?;

    Sale::delete(&state.db, sale.id).await?;

    tracing::info!(user_id = %auth.user_id, sale_id = %sale.id, "Sale deleted");

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(kinds::SALE_DELETED, format!("Sale {} deleted", sale.description))
            .entity(ENTITY, sale.id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
