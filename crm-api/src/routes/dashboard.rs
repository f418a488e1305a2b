/// Dashboard endpoints
///
/// - `GET /api/dashboard/stats` - Header counters
/// - `GET /api/dashboard/sales-chart` - Paid sales for the last six months
///
/// Both load the caller's records and aggregate them on every request.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use crm_shared::{
    auth::middleware::AuthContext,
    models::{
        customer::{Customer, CustomerFilter},
        lead::{Lead, LeadFilter},
        sale::{Sale, SaleFilter},
    },
    stats::{self, ChartPoint, DashboardStats},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SalesChartResponse {
    pub points: Vec<ChartPoint>,
}

/// Dashboard counters
///
/// # Response
///
/// ```json
/// {
///   "total_customers": 12,
///   "open_leads": 5,
///   "sales_this_month": 4200.0,
///   "conversion_rate": 38,
///   "sales_growth": -12,
///   "generated_at": "2025-03-14T10:00:00Z"
/// }
/// ```
///
/// `conversion_rate` and `sales_growth` are whole percentages; growth is 0
/// when the previous month had no paid sales.
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardStats>> {
    let (customer_filter, lead_filter, sale_filter) = (
        CustomerFilter::default(),
        LeadFilter::default(),
        SaleFilter::default(),
    );
    let (customers, leads, sales) = tokio::try_join!(
        Customer::list_by_owner(&state.db, auth.user_id, &customer_filter),
        Lead::list_by_owner(&state.db, auth.user_id, &lead_filter),
        Sale::list_by_owner(&state.db, auth.user_id, &sale_filter),
    )?;

    Ok(Json(stats::dashboard_stats(&customers, &leads, &sales, Utc::now())))
}

/// Sales chart
///
/// # Response
///
/// ```json
/// {
///   "points": [
///     { "month": "Oct", "year": 2024, "label": "Oct 2024", "amount": 0 },
///     { "month": "Mar", "year": 2025, "label": "Mar 2025", "amount": 4200 }
///   ]
/// }
/// ```
pub async fn sales_chart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<SalesChartResponse>> {
    let sales = Sale::list_by_owner(&state.db, auth.user_id, &SaleFilter::default()).await?;

    Ok(Json(SalesChartResponse {
        points: stats::sales_chart(&sales, Utc::now()),
    }))
}
