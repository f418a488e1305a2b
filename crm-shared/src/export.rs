/// CSV/JSON export rendering
///
/// Records are filtered, flattened to JSON objects (field order follows the
/// struct) and rendered either as a JSON document or as CSV.
///
/// CSV rules:
///
/// - header is the union of keys across all rows, in first-seen order
/// - `null` becomes an empty cell; strings are written as-is
/// - nested arrays/objects are written as JSON text
/// - quoting follows RFC 4180
/// - an empty result renders as `No data found`
///
/// # Example
///
/// ```
/// use crm_shared::export::{render_csv, EMPTY_EXPORT};
/// use serde_json::json;
///
/// let rows = vec![json!({"name": "Acme, Inc", "tags": ["a"]}), json!({"city": null})];
/// let csv = render_csv(&rows).unwrap();
/// assert_eq!(csv, "name,tags,city\n\"Acme, Inc\",\"[\"\"a\"\"]\",\n,,\n");
///
/// assert_eq!(render_csv(&[]).unwrap(), EMPTY_EXPORT);
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::customer::Customer;
use crate::models::lead::Lead;
use crate::models::sale::Sale;
use crate::models::task::Task;

/// Body written when nothing matched
pub const EMPTY_EXPORT: &str = "No data found";

/// Leading column added to full-report CSV rows
pub const RECORD_TYPE_COLUMN: &str = "record_type";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unknown export type: {0}")]
    UnknownKind(String),

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    #[error("Start date must not be after end date")]
    InvalidDateRange,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export buffer error: {0}")]
    Buffer(String),
}

/// What to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportKind {
    #[default]
    Customers,
    Leads,
    Sales,
    Tasks,
    FullReport,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Customers => "customers",
            ExportKind::Leads => "leads",
            ExportKind::Sales => "sales",
            ExportKind::Tasks => "tasks",
            ExportKind::FullReport => "full-report",
        }
    }
}

impl FromStr for ExportKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customers" => Ok(ExportKind::Customers),
            "leads" => Ok(ExportKind::Leads),
            "sales" => Ok(ExportKind::Sales),
            "tasks" => Ok(ExportKind::Tasks),
            "full-report" => Ok(ExportKind::FullReport),
            other => Err(ExportError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Row filter: creation date range (inclusive) and status
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub from: Option<NaiveDate>,

    /// Covers the whole day, up to 23:59:59.999
    pub to: Option<NaiveDate>,

    /// `None` or `all` means any status
    pub status: Option<String>,
}

impl ExportFilter {
    pub fn new(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        status: Option<String>,
    ) -> Result<Self, ExportError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ExportError::InvalidDateRange);
            }
        }

        let status = status.filter(|s| !s.is_empty() && s != "all");
        Ok(Self { from, to, status })
    }

    pub fn matches<R: ExportRecord>(&self, record: &R) -> bool {
        let day = record.created_at().date_naive();

        if self.from.map(|from| day < from).unwrap_or(false) {
            return false;
        }
        if self.to.map(|to| day > to).unwrap_or(false) {
            return false;
        }

        match &self.status {
            Some(wanted) => record.status_str() == wanted,
            None => true,
        }
    }
}

/// A record that can be exported
pub trait ExportRecord: Serialize {
    fn created_at(&self) -> DateTime<Utc>;
    fn status_str(&self) -> &'static str;
}

impl ExportRecord for Customer {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn status_str(&self) -> &'static str {
        self.status.as_str()
    }
}

impl ExportRecord for Lead {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn status_str(&self) -> &'static str {
        self.status.as_str()
    }
}

impl ExportRecord for Sale {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn status_str(&self) -> &'static str {
        self.status.as_str()
    }
}

impl ExportRecord for Task {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn status_str(&self) -> &'static str {
        self.status.as_str()
    }
}

/// Applies `filter` and flattens matching records to JSON objects
pub fn to_rows<R: ExportRecord>(records: &[R], filter: &ExportFilter) -> Result<Vec<Value>, ExportError> {
    records
        .iter()
        .filter(|r| filter.matches(*r))
        .map(|r| serde_json::to_value(r).map_err(ExportError::from))
        .collect()
}

/// Rows of every kind, already filtered
#[derive(Debug, Clone, Default, Serialize)]
pub struct FullReport {
    pub customers: Vec<Value>,
    pub leads: Vec<Value>,
    pub sales: Vec<Value>,
    pub tasks: Vec<Value>,
}

impl FullReport {
    pub fn len(&self) -> usize {
        self.customers.len() + self.leads.len() + self.sales.len() + self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rows in one list, each prefixed with a `record_type` column
    pub fn tagged_rows(&self) -> Vec<Value> {
        let sections = [
            ("customer", &self.customers),
            ("lead", &self.leads),
            ("sale", &self.sales),
            ("task", &self.tasks),
        ];

        sections
            .iter()
            .flat_map(|(tag, rows)| rows.iter().map(move |row| tag_row(tag, row)))
            .collect()
    }
}

fn tag_row(tag: &str, row: &Value) -> Value {
    let mut tagged = Map::new();
    tagged.insert(RECORD_TYPE_COLUMN.to_string(), Value::String(tag.to_string()));
    if let Value::Object(fields) = row {
        for (key, value) in fields {
            tagged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(tagged)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Renders object rows as CSV
pub fn render_csv(rows: &[Value]) -> Result<String, ExportError> {
    if rows.is_empty() {
        return Ok(EMPTY_EXPORT.to_string());
    }

    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        if let Value::Object(fields) = row {
            for key in fields.keys() {
                if !headers.contains(&key.as_str()) {
                    headers.push(key.as_str());
                }
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);

    writer.write_record(&headers)?;
    for row in rows {
        let values: Vec<String> = headers.iter().map(|h| cell(row.get(*h))).collect();
        writer.write_record(&values)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}

/// Rendered export ready to be sent as a download
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
    pub rows: usize,
}

/// `<kind>_<YYYY-MM-DD>.<ext>`
pub fn filename(kind: ExportKind, format: ExportFormat, today: NaiveDate) -> String {
    format!("{}_{}.{}", kind, today.format("%Y-%m-%d"), format.extension())
}

/// Renders rows of a single kind
pub fn render_rows(
    kind: ExportKind,
    format: ExportFormat,
    rows: Vec<Value>,
    today: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let count = rows.len();
    let body = match format {
        ExportFormat::Csv => render_csv(&rows)?,
        ExportFormat::Json => serde_json::to_string_pretty(&rows)?,
    };

    Ok(ExportFile {
        filename: filename(kind, format, today),
        content_type: format.content_type(),
        body,
        rows: count,
    })
}

/// Renders the full report
pub fn render_full_report(
    format: ExportFormat,
    report: &FullReport,
    today: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let body = match format {
        ExportFormat::Csv => render_csv(&report.tagged_rows())?,
        ExportFormat::Json => serde_json::to_string_pretty(report)?,
    };

    Ok(ExportFile {
        filename: filename(ExportKind::FullReport, format, today),
        content_type: format.content_type(),
        body,
        rows: report.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::customer::{CustomerStatus, RecordSource};
    use chrono::TimeZone;
    use serde_json::json;
    use uuid::Uuid;

    fn customer(name: &str, status: CustomerStatus, created: DateTime<Utc>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: name.to_string(),
            email: None,
            phone: None,
            company: None,
            job_title: None,
            street: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            status,
            source: RecordSource::Website,
            notes: None,
            tags: vec!["vip".to_string()],
            lead_id: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_kind_and_format() {
        assert_eq!("full-report".parse::<ExportKind>().unwrap(), ExportKind::FullReport);
        assert!("invoices".parse::<ExportKind>().is_err());
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_filename() {
        assert_eq!(
            filename(ExportKind::Sales, ExportFormat::Csv, date(2025, 3, 7)),
            "sales_2025-03-07.csv"
        );
        assert_eq!(
            filename(ExportKind::FullReport, ExportFormat::Json, date(2025, 3, 7)),
            "full-report_2025-03-07.json"
        );
    }

    #[test]
    fn test_filter_date_range_is_inclusive() {
        let filter = ExportFilter::new(Some(date(2025, 3, 1)), Some(date(2025, 3, 31)), None).unwrap();
        let last_moment = Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap();
        let first_moment = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();

        assert!(filter.matches(&customer("a", CustomerStatus::Active, last_moment)));
        assert!(filter.matches(&customer("b", CustomerStatus::Active, first_moment)));
        assert!(!filter.matches(&customer("c", CustomerStatus::Active, after)));
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        let result = ExportFilter::new(Some(date(2025, 4, 1)), Some(date(2025, 3, 1)), None);
        assert!(matches!(result, Err(ExportError::InvalidDateRange)));
    }

    #[test]
    fn test_filter_status_all_means_any() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let any = ExportFilter::new(None, None, Some("all".to_string())).unwrap();
        assert!(any.status.is_none());

        let inactive = ExportFilter::new(None, None, Some("inactive".to_string())).unwrap();
        assert!(any.matches(&customer("a", CustomerStatus::Active, created)));
        assert!(!inactive.matches(&customer("a", CustomerStatus::Active, created)));
        assert!(inactive.matches(&customer("b", CustomerStatus::Inactive, created)));
    }

    #[test]
    fn test_to_rows_keeps_field_order() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let rows = to_rows(
            &[customer("Acme", CustomerStatus::Active, created)],
            &ExportFilter::default(),
        )
        .unwrap();

        let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "id");
        assert_eq!(keys[2], "name");
    }

    #[test]
    fn test_render_csv_escaping_and_union() {
        let rows = vec![
            json!({"name": "Quote \"Q\"", "amount": 10.5, "active": true}),
            json!({"name": "Line\nbreak", "notes": null, "meta": {"k": 1}}),
        ];

        let csv = render_csv(&rows).unwrap();
        let expected = "name,amount,active,notes,meta\n\
                        \"Quote \"\"Q\"\"\",10.5,true,,\n\
                        \"Line\nbreak\",,,,\"{\"\"k\"\":1}\"\n";
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_render_csv_empty() {
        assert_eq!(render_csv(&[]).unwrap(), "No data found");
    }

    #[test]
    fn test_full_report_tagged_rows() {
        let report = FullReport {
            customers: vec![json!({"name": "Acme"})],
            leads: vec![],
            sales: vec![json!({"amount": 5})],
            tasks: vec![],
        };

        let csv = render_full_report(ExportFormat::Csv, &report, date(2025, 1, 2)).unwrap();
        assert_eq!(csv.body, "record_type,name,amount\ncustomer,Acme,\nsale,,5\n");
        assert_eq!(csv.rows, 2);
        assert_eq!(csv.filename, "full-report_2025-01-02.csv");

        let json = render_full_report(ExportFormat::Json, &report, date(2025, 1, 2)).unwrap();
        let parsed: Value = serde_json::from_str(&json.body).unwrap();
        assert_eq!(parsed["customers"][0]["name"], "Acme");
        assert!(parsed["tasks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_render_rows_json() {
        let file = render_rows(
            ExportKind::Leads,
            ExportFormat::Json,
            vec![json!({"name": "Lead"})],
            date(2025, 1, 2),
        )
        .unwrap();

        assert_eq!(file.content_type, "application/json");
        assert_eq!(file.rows, 1);
        assert!(file.body.contains("\"Lead\""));
    }
}
