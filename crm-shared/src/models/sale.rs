/// Sale model and database operations
///
/// Amounts are stored as `DOUBLE PRECISION`; the schema rejects negatives.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sales (
///     id UUID PRIMARY KEY,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     customer_id UUID NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
///     description TEXT NOT NULL,
///     amount DOUBLE PRECISION NOT NULL CHECK (amount >= 0),
///     status sale_status NOT NULL DEFAULT 'pending',
///     sale_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::customer::CustomerSummary;
use crate::auth::authorization::Owned;

const SALE_COLUMNS: &str =
    "id, owner_id, customer_id, description, amount, status, sale_date, created_at, updated_at";

/// Payment status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    #[default]
    Pending,
    Paid,
    Canceled,
}

impl SaleStatus {
    pub const ALL: [SaleStatus; 3] = [SaleStatus::Pending, SaleStatus::Paid, SaleStatus::Canceled];

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Paid => "paid",
            SaleStatus::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub customer_id: Uuid,
    pub description: String,
    pub amount: f64,
    pub status: SaleStatus,
    pub sale_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Sale {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Sale joined with a summary of its customer
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithCustomer {
    #[serde(flatten)]
    pub sale: Sale,

    /// Absent if the customer row could not be joined
    pub customer: Option<CustomerSummary>,
}

#[derive(sqlx::FromRow)]
struct SaleRow {
    #[sqlx(flatten)]
    sale: Sale,
    customer_name: Option<String>,
    customer_email: Option<String>,
}

impl From<SaleRow> for SaleWithCustomer {
    fn from(row: SaleRow) -> Self {
        let customer = row.customer_name.map(|name| CustomerSummary {
            id: row.sale.customer_id,
            name,
            email: row.customer_email,
        });

        SaleWithCustomer {
            sale: row.sale,
            customer,
        }
    }
}

/// Editable sale fields
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaleInput {
    pub customer_id: Uuid,

    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub amount: f64,

    #[serde(default)]
    pub status: SaleStatus,

    /// Defaults to now
    pub sale_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub customer_id: Option<Uuid>,
}

/// Count and amount of sales in one status
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusTotal {
    pub count: usize,
    pub amount: f64,
}

/// Per-status totals over a list of sales
pub fn totals_by_status<'a, I>(sales: I) -> BTreeMap<&'static str, StatusTotal>
where
    I: IntoIterator<Item = &'a Sale>,
{
    let mut totals: BTreeMap<&'static str, StatusTotal> = SaleStatus::ALL
        .iter()
        .map(|s| (s.as_str(), StatusTotal::default()))
        .collect();

    for sale in sales {
        let entry = totals.entry(sale.status.as_str()).or_default();
        entry.count += 1;
        entry.amount += sale.amount;
    }

    totals
}

impl Sale {
    pub async fn create(pool: &PgPool, owner_id: Uuid, data: SaleInput) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO sales (id, owner_id, customer_id, description, amount, status, sale_date) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW())) RETURNING {}",
            SALE_COLUMNS
        );

        sqlx::query_as::<_, Sale>(&query)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(data.customer_id)
            .bind(data.description.trim().to_string())
            .bind(data.amount)
            .bind(data.status)
            .bind(data.sale_date)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM sales WHERE id = $1", SALE_COLUMNS);

        sqlx::query_as::<_, Sale>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the owner's sales, newest first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &SaleFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM sales \
             WHERE owner_id = $1 \
               AND ($2::sale_status IS NULL OR status = $2) \
               AND ($3::uuid IS NULL OR customer_id = $3) \
             ORDER BY created_at DESC",
            SALE_COLUMNS
        );

        sqlx::query_as::<_, Sale>(&query)
            .bind(owner_id)
            .bind(filter.status)
            .bind(filter.customer_id)
            .fetch_all(pool)
            .await
    }

    /// Like [`Sale::list_by_owner`], with each customer's summary joined in
    pub async fn list_with_customers(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &SaleFilter,
    ) -> Result<Vec<SaleWithCustomer>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT s.id, s.owner_id, s.customer_id, s.description, s.amount, s.status,
                   s.sale_date, s.created_at, s.updated_at,
                   c.name AS customer_name, c.email AS customer_email
            FROM sales s
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE s.owner_id = $1
              AND ($2::sale_status IS NULL OR s.status = $2)
              AND ($3::uuid IS NULL OR s.customer_id = $3)
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(filter.status)
        .bind(filter.customer_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(SaleWithCustomer::from).collect())
    }

    /// Replaces every editable field
    pub async fn update(pool: &PgPool, id: Uuid, data: SaleInput) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE sales SET customer_id = $2, description = $3, amount = $4, status = $5, \
                 sale_date = COALESCE($6, sale_date), updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            SALE_COLUMNS
        );

        sqlx::query_as::<_, Sale>(&query)
            .bind(id)
            .bind(data.customer_id)
            .bind(data.description.trim().to_string())
            .bind(data.amount)
            .bind(data.status)
            .bind(data.sale_date)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive substring match on the description
    pub async fn search(
        pool: &PgPool,
        owner_id: Uuid,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM sales WHERE owner_id = $1 AND description ILIKE $2 \
             ORDER BY created_at DESC LIMIT $3",
            SALE_COLUMNS
        );

        sqlx::query_as::<_, Sale>(&query)
            .bind(owner_id)
            .bind(super::like_pattern(term))
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(status: SaleStatus, amount: f64) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            description: "Consultoria".to_string(),
            amount,
            status,
            sale_date: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_by_status() {
        let sales = vec![
            sale(SaleStatus::Paid, 100.0),
            sale(SaleStatus::Paid, 50.5),
            sale(SaleStatus::Pending, 20.0),
        ];

        let totals = totals_by_status(&sales);
        assert_eq!(totals["paid"], StatusTotal { count: 2, amount: 150.5 });
        assert_eq!(totals["pending"], StatusTotal { count: 1, amount: 20.0 });
        assert_eq!(totals["canceled"], StatusTotal::default());
    }

    #[test]
    fn test_sale_with_customer_flattens() {
        let s = sale(SaleStatus::Paid, 10.0);
        let customer_id = s.customer_id;
        let row = SaleRow {
            sale: s,
            customer_name: Some("Acme".to_string()),
            customer_email: None,
        };

        let json = serde_json::to_value(SaleWithCustomer::from(row)).unwrap();
        assert_eq!(json["status"], "paid");
        assert_eq!(json["customer"]["name"], "Acme");
        assert_eq!(json["customer"]["id"], customer_id.to_string());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let input = SaleInput {
            customer_id: Uuid::new_v4(),
            description: "Desconto".to_string(),
            amount: -1.0,
            status: SaleStatus::Pending,
            sale_date: None,
        };
        assert!(input.validate().is_err());
    }
}
