/// Statistics report
///
/// # Endpoint
///
/// ```text
/// GET /api/statistics
/// Authorization: Bearer <access_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "customers": { "total": 10, "active": 8, "inactive": 2, "active_rate": 80.0 },
///   "leads": { "total": 4, "by_status": { "new": 3, "converted": 1 }, "by_source": { "website": 4 }, "conversion_rate": 25.0 },
///   "sales": { "total": 6, "total_revenue": 9000.0, "revenue_this_month": 1500.0, "average_ticket": 2250.0,
///              "by_status": { "paid": 4, "pending": 2 }, "by_month": { "2025-03": 3000.0 } },
///   "tasks": { "total": 7, "pending": 3, "completed": 4, "overdue": 1 }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use crm_shared::{
    auth::middleware::AuthContext,
    models::{
        customer::{Customer, CustomerFilter},
        lead::{Lead, LeadFilter},
        sale::{Sale, SaleFilter},
        task::{Task, TaskFilter},
    },
    stats::{statistics_report, StatisticsReport},
};

pub async fn statistics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<StatisticsReport>> {
    let owner = auth.user_id;
    let customer_filter = CustomerFilter::default();
    let lead_filter = LeadFilter::default();
    let sale_filter = SaleFilter::default();
    let task_filter = TaskFilter::default();

    let (customers, leads, sales, tasks) = tokio::try_join!(
        Customer::list_by_owner(&state.db, owner, &customer_filter),
        Lead::list_by_owner(&state.db, owner, &lead_filter),
        Sale::list_by_owner(&state.db, owner, &sale_filter),
        Task::list_by_owner(&state.db, owner, &task_filter),
    )?;

    tracing::debug!(
        user_id = %owner,
        customers = customers.len(),
        leads = leads.len(),
        sales = sales.len(),
        tasks = tasks.len(),
        "Building statistics report"
    );

    Ok(Json(statistics_report(&customers, &leads, &sales, &tasks, Utc::now())))
}
