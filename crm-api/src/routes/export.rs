/// Data export
///
/// # Endpoint
///
/// ```text
/// GET /api/export?type=sales&format=csv&from=2025-01-01&to=2025-03-31&status=paid
/// Authorization: Bearer <access_token>
/// ```
///
/// - `type`: `customers` (default), `leads`, `sales`, `tasks` or `full-report`
/// - `format`: `csv` (default) or `json`
/// - `from` / `to`: inclusive creation-date range, `YYYY-MM-DD`
/// - `status`: record status; `all` or absent means any
///
/// # Response
///
/// A download with `Content-Disposition: attachment; filename="sales_2025-03-14.csv"`.
/// An empty CSV export is the text `No data found`.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown type or format
/// - `422 Unprocessable Entity`: `from` is after `to`

use crate::{app::AppState, error::ApiResult};
use crate::extract::Query;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{NaiveDate, Utc};
use crm_shared::{
    auth::middleware::AuthContext,
    export::{
        render_full_report, render_rows, to_rows, ExportFile, ExportFilter, ExportFormat,
        ExportKind, FullReport,
    },
    models::{
        activity::{kinds, Activity, NewActivity},
        customer::{Customer, CustomerFilter},
        lead::{Lead, LeadFilter},
        sale::{Sale, SaleFilter},
        task::{Task, TaskFilter},
    },
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<String>,
    pub format: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
}

impl ExportParams {
    /// Missing `type` means customers; missing `format` means CSV
    fn kind_and_format(&self) -> ApiResult<(ExportKind, ExportFormat)> {
        let kind = match self.kind.as_deref() {
            Some(kind) => kind.parse()?,
            None => ExportKind::default(),
        };
        let format = match self.format.as_deref() {
            Some(format) => format.parse()?,
            None => ExportFormat::default(),
        };
        Ok((kind, format))
    }
}

async fn build_export(
    state: &AppState,
    owner: Uuid,
    kind: ExportKind,
    format: ExportFormat,
    filter: &ExportFilter,
    today: NaiveDate,
) -> ApiResult<ExportFile> {
    let db = &state.db;

    let file = match kind {
        ExportKind::Customers => {
            let records = Customer::list_by_owner(db, owner, &CustomerFilter::default()).await?;
            render_rows(kind, format, to_rows(&records, filter)?, today)?
        }
        ExportKind::Leads => {
            let records = Lead::list_by_owner(db, owner, &LeadFilter::default()).await?;
            render_rows(kind, format, to_rows(&records, filter)?, today)?
        }
        ExportKind::Sales => {
            let records = Sale::list_by_owner(db, owner, &SaleFilter::default()).await?;
            render_rows(kind, format, to_rows(&records, filter)?, today)?
        }
        ExportKind::Tasks => {
            let records = Task::list_by_owner(db, owner, &TaskFilter::default()).await?;
            render_rows(kind, format, to_rows(&records, filter)?, today)?
        }
        ExportKind::FullReport => {
            let customer_filter = CustomerFilter::default();
            let lead_filter = LeadFilter::default();
            let sale_filter = SaleFilter::default();
            let task_filter = TaskFilter::default();

            let (customers, leads, sales, tasks) = tokio::try_join!(
                Customer::list_by_owner(db, owner, &customer_filter),
                Lead::list_by_owner(db, owner, &lead_filter),
                Sale::list_by_owner(db, owner, &sale_filter),
                Task::list_by_owner(db, owner, &task_filter),
            )?;

            let report = FullReport {
                customers: to_rows(&customers, filter)?,
                leads: to_rows(&leads, filter)?,
                sales: to_rows(&sales, filter)?,
                tasks: to_rows(&tasks, filter)?,
            };
            render_full_report(format, &report, today)?
        }
    };

    Ok(file)
}

pub async fn export(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let (kind, format) = params.kind_and_format()?;
    let filter = ExportFilter::new(params.from, params.to, params.status)?;

    let file = build_export(
        &state,
        auth.user_id,
        kind,
        format,
        &filter,
        Utc::now().date_naive(),
    )
    .await?;

    tracing::info!(
        user_id = %auth.user_id,
        kind = %kind,
        format = format.extension(),
        rows = file.rows,
        "Export generated"
    );

    Activity::record_quietly(
        &state.db,
        auth.user_id,
        NewActivity::new(kinds::EXPORT, format!("Exported {} ({})", kind, format.extension()))
            .metadata(json!({
                "type": kind.as_str(),
                "format": format.extension(),
                "rows": file.rows,
            })),
    )
    .await;

    let disposition = format!("attachment; filename=\"{}\"", file.filename);

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    )
        .into_response())
}
