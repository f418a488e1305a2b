/// Dashboard and report aggregation
///
/// Every function here is a single linear pass over an already loaded record
/// set. Nothing is cached; callers load the owner's records and aggregate on
/// each request. `now` is always passed in so results are reproducible.
///
/// Months are calendar months in UTC, compared by `year * 12 + month` index.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use crm_shared::stats::{dashboard_stats, sales_chart};
///
/// let now = Utc::now();
/// let stats = dashboard_stats(&[], &[], &[], now);
/// assert_eq!(stats.total_customers, 0);
/// assert_eq!(sales_chart(&[], now).len(), 6);
/// ```

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::models::customer::{Customer, CustomerStatus};
use crate::models::lead::{Lead, LeadStatus};
use crate::models::sale::{Sale, SaleStatus};
use crate::models::task::{Task, TaskStatus};

/// Months shown on the sales chart
pub const CHART_MONTHS: i32 = 6;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn month_index(date: DateTime<Utc>) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// `part / whole` as a percentage, 0 when `whole` is 0
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_paid(sale: &Sale) -> bool {
    sale.status == SaleStatus::Paid
}

/// Counters for the dashboard header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_customers: usize,

    /// Leads neither converted nor lost
    pub open_leads: usize,

    /// Paid sales dated in the current month
    pub sales_this_month: f64,

    /// Converted leads over all leads, whole percent
    pub conversion_rate: i64,

    /// Change of paid sales versus the previous month, whole percent
    pub sales_growth: i64,

    pub generated_at: DateTime<Utc>,
}

pub fn dashboard_stats(
    customers: &[Customer],
    leads: &[Lead],
    sales: &[Sale],
    now: DateTime<Utc>,
) -> DashboardStats {
    let current = month_index(now);

    let open_leads = leads.iter().filter(|l| l.status.is_open()).count();
    let converted = leads
        .iter()
        .filter(|l| l.status == LeadStatus::Converted)
        .count();

    let mut this_month = 0.0;
    let mut previous_month = 0.0;
    for sale in sales.iter().filter(|s| is_paid(s)) {
        let index = month_index(sale.sale_date);
        if index == current {
            this_month += sale.amount;
        } else if index == current - 1 {
            previous_month += sale.amount;
        }
    }

    let sales_growth = if previous_month > 0.0 {
        ((this_month - previous_month) / previous_month * 100.0).round() as i64
    } else {
        0
    };

    DashboardStats {
        total_customers: customers.len(),
        open_leads,
        sales_this_month: this_month,
        conversion_rate: percentage(converted, leads.len()).round() as i64,
        sales_growth,
        generated_at: now,
    }
}

/// One bar of the sales chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Three-letter month, e.g. `Mar`
    pub month: &'static str,
    pub year: i32,

    /// `Mar 2025`
    pub label: String,

    /// Paid amount, rounded to a whole number
    pub amount: i64,
}

/// Paid sales per month for the last [`CHART_MONTHS`] months, oldest first
pub fn sales_chart(sales: &[Sale], now: DateTime<Utc>) -> Vec<ChartPoint> {
    let current = month_index(now);
    let first = current - (CHART_MONTHS - 1);

    let mut sums = vec![0.0_f64; CHART_MONTHS as usize];
    for sale in sales.iter().filter(|s| is_paid(s)) {
        let index = month_index(sale.sale_date);
        if (first..=current).contains(&index) {
            sums[(index - first) as usize] += sale.amount;
        }
    }

    sums.into_iter()
        .enumerate()
        .map(|(offset, amount)| {
            let index = first + offset as i32;
            let year = index.div_euclid(12);
            let month = MONTH_LABELS[index.rem_euclid(12) as usize];
            ChartPoint {
                month,
                year,
                label: format!("{} {}", month, year),
                amount: amount.round() as i64,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub active_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleStats {
    pub total: usize,

    /// Sum of paid sales
    pub total_revenue: f64,

    /// Paid sales dated in the current month
    pub revenue_this_month: f64,

    /// Revenue per paid sale
    pub average_ticket: f64,

    pub by_status: BTreeMap<String, usize>,

    /// `YYYY-MM` -> amount across all statuses
    pub by_month: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
}

/// Full statistics page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub customers: CustomerStats,
    pub leads: LeadStats,
    pub sales: SaleStats,
    pub tasks: TaskStats,
}

pub fn customer_stats(customers: &[Customer]) -> CustomerStats {
    let active = customers
        .iter()
        .filter(|c| c.status == CustomerStatus::Active)
        .count();

    CustomerStats {
        total: customers.len(),
        active,
        inactive: customers.len() - active,
        active_rate: round2(percentage(active, customers.len())),
    }
}

pub fn lead_stats(leads: &[Lead]) -> LeadStats {
    let mut by_status = BTreeMap::new();
    let mut by_source = BTreeMap::new();

    for lead in leads {
        *by_status.entry(lead.status.as_str().to_string()).or_insert(0) += 1;
        *by_source.entry(lead.source.as_str().to_string()).or_insert(0) += 1;
    }

    let converted = by_status
        .get(LeadStatus::Converted.as_str())
        .copied()
        .unwrap_or(0);

    LeadStats {
        total: leads.len(),
        by_status,
        by_source,
        conversion_rate: round2(percentage(converted, leads.len())),
    }
}

pub fn sale_stats(sales: &[Sale], now: DateTime<Utc>) -> SaleStats {
    let current = month_index(now);
    let mut total_revenue = 0.0;
    let mut revenue_this_month = 0.0;
    let mut paid_count = 0usize;
    let mut by_status = BTreeMap::new();
    let mut by_month = BTreeMap::new();

    for sale in sales {
        if is_paid(sale) {
            paid_count += 1;
            total_revenue += sale.amount;
            if month_index(sale.sale_date) == current {
                revenue_this_month += sale.amount;
            }
        }

        *by_status.entry(sale.status.as_str().to_string()).or_insert(0) += 1;
        *by_month
            .entry(sale.sale_date.format("%Y-%m").to_string())
            .or_insert(0.0) += sale.amount;
    }

    let average_ticket = if paid_count > 0 {
        round2(total_revenue / paid_count as f64)
    } else {
        0.0
    };

    SaleStats {
        total: sales.len(),
        total_revenue,
        revenue_this_month,
        average_ticket,
        by_status,
        by_month,
    }
}

pub fn task_stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count();

    TaskStats {
        total: tasks.len(),
        pending: tasks.len() - completed,
        completed,
        overdue,
    }
}

pub fn statistics_report(
    customers: &[Customer],
    leads: &[Lead],
    sales: &[Sale],
    tasks: &[Task],
    now: DateTime<Utc>,
) -> StatisticsReport {
    StatisticsReport {
        customers: customer_stats(customers),
        leads: lead_stats(leads),
        sales: sale_stats(sales, now),
        tasks: task_stats(tasks, now),
    }
}
