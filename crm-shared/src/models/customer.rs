/// Customer model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE customers (
///     id UUID PRIMARY KEY,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     email TEXT, phone TEXT, company TEXT, job_title TEXT,
///     street TEXT, city TEXT, state TEXT, postal_code TEXT, country TEXT,
///     status customer_status NOT NULL DEFAULT 'active',
///     source record_source NOT NULL DEFAULT 'other',
///     notes TEXT,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     lead_id UUID REFERENCES leads(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::Owned;

const CUSTOMER_COLUMNS: &str = "id, owner_id, name, email, phone, company, job_title, street, \
     city, state, postal_code, country, status, source, notes, tags, lead_id, created_at, updated_at";

/// Customer status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "customer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
        }
    }
}

/// Acquisition channel, shared by customers and leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Website,
    Referral,
    SocialMedia,
    Event,
    Lead,
    #[default]
    Other,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Website => "website",
            RecordSource::Referral => "referral",
            RecordSource::SocialMedia => "social_media",
            RecordSource::Event => "event",
            RecordSource::Lead => "lead",
            RecordSource::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub status: CustomerStatus,
    pub source: RecordSource,
    pub notes: Option<String>,
    pub tags: Vec<String>,

    /// Lead this customer was converted from
    pub lead_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Customer {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Editable customer fields, used for both create and full replace
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,

    #[serde(default)]
    pub status: CustomerStatus,

    #[serde(default)]
    pub source: RecordSource,

    pub notes: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Filters for listing customers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerFilter {
    pub status: Option<CustomerStatus>,
}

/// Compact customer reference embedded in other responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

impl Customer {
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        data: CustomerInput,
    ) -> Result<Self, sqlx::Error> {
        Self::insert(pool, owner_id, data, None).await
    }

    /// Inserts inside an open transaction, linking to the lead it came from
    pub async fn create_from_lead(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        data: CustomerInput,
        lead_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        Self::insert(&mut **tx, owner_id, data, Some(lead_id)).await
    }

    async fn insert<'e, E>(
        executor: E,
        owner_id: Uuid,
        data: CustomerInput,
        lead_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO customers (id, owner_id, name, email, phone, company, job_title, street, \
                 city, state, postal_code, country, status, source, notes, tags, lead_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {}",
            CUSTOMER_COLUMNS
        );

        sqlx::query_as::<_, Customer>(&query)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(data.name.trim().to_string())
            .bind(data.email.map(|e| e.trim().to_lowercase()))
            .bind(data.phone)
            .bind(data.company)
            .bind(data.job_title)
            .bind(data.street)
            .bind(data.city)
            .bind(data.state)
            .bind(data.postal_code)
            .bind(data.country)
            .bind(data.status)
            .bind(data.source)
            .bind(data.notes)
            .bind(data.tags)
            .bind(lead_id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS);

        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the owner's customers, newest first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &CustomerFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM customers \
             WHERE owner_id = $1 AND ($2::customer_status IS NULL OR status = $2) \
             ORDER BY created_at DESC",
            CUSTOMER_COLUMNS
        );

        sqlx::query_as::<_, Customer>(&query)
            .bind(owner_id)
            .bind(filter.status)
            .fetch_all(pool)
            .await
    }

    /// Replaces every editable field
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: CustomerInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE customers SET name = $2, email = $3, phone = $4, company = $5, job_title = $6, \
                 street = $7, city = $8, state = $9, postal_code = $10, country = $11, \
                 status = $12, source = $13, notes = $14, tags = $15, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            CUSTOMER_COLUMNS
        );

        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .bind(data.name.trim().to_string())
            .bind(data.email.map(|e| e.trim().to_lowercase()))
            .bind(data.phone)
            .bind(data.company)
            .bind(data.job_title)
            .bind(data.street)
            .bind(data.city)
            .bind(data.state)
            .bind(data.postal_code)
            .bind(data.country)
            .bind(data.status)
            .bind(data.source)
            .bind(data.notes)
            .bind(data.tags)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive substring match on name, email and company
    pub async fn search(
        pool: &PgPool,
        owner_id: Uuid,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM customers \
             WHERE owner_id = $1 \
               AND (name ILIKE $2 OR email ILIKE $2 OR company ILIKE $2) \
             ORDER BY created_at DESC LIMIT $3",
            CUSTOMER_COLUMNS
        );

        sqlx::query_as::<_, Customer>(&query)
            .bind(owner_id)
            .bind(super::like_pattern(term))
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub fn summary(&self) -> CustomerSummary {
        CustomerSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_serialization() {
        assert_eq!(
            serde_json::to_value(RecordSource::SocialMedia).unwrap(),
            "social_media"
        );
        let parsed: RecordSource = serde_json::from_str("\"referral\"").unwrap();
        assert_eq!(parsed, RecordSource::Referral);
    }

    #[test]
    fn test_input_defaults() {
        let input: CustomerInput = serde_json::from_str(r#"{"name":"Acme Ltda"}"#).unwrap();
        assert_eq!(input.status, CustomerStatus::Active);
        assert_eq!(input.source, RecordSource::Other);
        assert!(input.tags.is_empty());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_input_validation() {
        let input = CustomerInput {
            name: String::new(),
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
    }
}
