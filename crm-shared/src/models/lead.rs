/// Lead model and database operations
///
/// A lead is a prospective customer. Converting it creates a [`Customer`]
/// linked back to the lead and marks the lead `converted`, atomically.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE leads (
///     id UUID PRIMARY KEY,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     email TEXT, phone TEXT, company TEXT,
///     status lead_status NOT NULL DEFAULT 'new',
///     source record_source NOT NULL DEFAULT 'other',
///     notes TEXT,
///     customer_id UUID REFERENCES customers(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::customer::{Customer, CustomerInput, CustomerStatus, RecordSource};
use crate::auth::authorization::Owned;

const LEAD_COLUMNS: &str =
    "id, owner_id, name, email, phone, company, status, source, notes, customer_id, created_at, updated_at";

/// Lead pipeline status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    /// Still in the pipeline (neither converted nor lost)
    pub fn is_open(&self) -> bool {
        !matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: LeadStatus,
    pub source: RecordSource,
    pub notes: Option<String>,

    /// Customer created by conversion
    pub customer_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Lead {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Editable lead fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LeadInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub company: Option<String>,

    #[serde(default)]
    pub status: LeadStatus,

    #[serde(default)]
    pub source: RecordSource,

    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
}

impl Lead {
    pub async fn create(pool: &PgPool, owner_id: Uuid, data: LeadInput) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO leads (id, owner_id, name, email, phone, company, status, source, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            LEAD_COLUMNS
        );

        sqlx::query_as::<_, Lead>(&query)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(data.name.trim().to_string())
            .bind(data.email.map(|e| e.trim().to_lowercase()))
            .bind(data.phone)
            .bind(data.company)
            .bind(data.status)
            .bind(data.source)
            .bind(data.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM leads WHERE id = $1", LEAD_COLUMNS);

        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the owner's leads, newest first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &LeadFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM leads \
             WHERE owner_id = $1 AND ($2::lead_status IS NULL OR status = $2) \
             ORDER BY created_at DESC",
            LEAD_COLUMNS
        );

        sqlx::query_as::<_, Lead>(&query)
            .bind(owner_id)
            .bind(filter.status)
            .fetch_all(pool)
            .await
    }

    /// Replaces every editable field
    pub async fn update(pool: &PgPool, id: Uuid, data: LeadInput) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE leads SET name = $2, email = $3, phone = $4, company = $5, status = $6, \
                 source = $7, notes = $8, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            LEAD_COLUMNS
        );

        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .bind(data.name.trim().to_string())
            .bind(data.email.map(|e| e.trim().to_lowercase()))
            .bind(data.phone)
            .bind(data.company)
            .bind(data.status)
            .bind(data.source)
            .bind(data.notes)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Converts the lead into an active customer
    ///
    /// Both writes happen in one transaction: either the customer exists and
    /// the lead is `converted` pointing at it, or nothing changed. The lead row
    /// stays locked until commit, so concurrent conversions of one lead create
    /// one customer. Returns `None` if the lead is already converted or gone.
    pub async fn convert(&self, pool: &PgPool) -> Result<Option<(Lead, Customer)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let lock = format!(
            "SELECT {} FROM leads WHERE id = $1 AND status <> 'converted' FOR UPDATE",
            LEAD_COLUMNS
        );
        let Some(current) = sqlx::query_as::<_, Lead>(&lock)
            .bind(self.id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let customer = Customer::create_from_lead(
            &mut tx,
            current.owner_id,
            current.customer_input(),
            current.id,
        )
        .await?;

        let query = format!(
            "UPDATE leads SET status = 'converted', customer_id = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            LEAD_COLUMNS
        );

        let lead = sqlx::query_as::<_, Lead>(&query)
            .bind(self.id)
            .bind(customer.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(lead_id = %lead.id, customer_id = %customer.id, "Lead converted");
        Ok(Some((lead, customer)))
    }

    /// Customer fields carried over by conversion
    pub fn customer_input(&self) -> CustomerInput {
        CustomerInput {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
            status: CustomerStatus::Active,
            source: RecordSource::Lead,
            notes: self.notes.clone(),
            ..Default::default()
        }
    }

    /// Case-insensitive substring match on name, email and company
    pub async fn search(
        pool: &PgPool,
        owner_id: Uuid,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM leads \
             WHERE owner_id = $1 \
               AND (name ILIKE $2 OR email ILIKE $2 OR company ILIKE $2) \
             ORDER BY created_at DESC LIMIT $3",
            LEAD_COLUMNS
        );

        sqlx::query_as::<_, Lead>(&query)
            .bind(owner_id)
            .bind(super::like_pattern(term))
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
