/// Global search across customers, leads and sales
///
/// Matching is a case-insensitive substring test. Each kind returns at most
/// [`RESULTS_PER_KIND`] rows, newest first.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::customer::Customer;
use super::lead::Lead;
use super::sale::Sale;

pub const MIN_QUERY_LENGTH: usize = 2;
pub const RESULTS_PER_KIND: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search query must be at least {MIN_QUERY_LENGTH} characters")]
    QueryTooShort,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub customers: Vec<Customer>,
    pub leads: Vec<Lead>,
    pub sales: Vec<Sale>,
    pub total: usize,
}

/// Trims the query and checks its length
pub fn normalize_query(query: &str) -> Result<&str, SearchError> {
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_LENGTH {
        return Err(SearchError::QueryTooShort);
    }
    Ok(trimmed)
}

/// Searches every kind the owner has
pub async fn search(pool: &PgPool, owner_id: Uuid, query: &str) -> Result<SearchResults, SearchError> {
    let term = normalize_query(query)?;

    let (customers, leads, sales) = tokio::try_join!(
        Customer::search(pool, owner_id, term, RESULTS_PER_KIND),
        Lead::search(pool, owner_id, term, RESULTS_PER_KIND),
        Sale::search(pool, owner_id, term, RESULTS_PER_KIND),
    )?;

    let total = customers.len() + leads.len() + sales.len();
    tracing::debug!(owner_id = %owner_id, total, "Search completed");

    Ok(SearchResults {
        customers,
        leads,
        sales,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  acme ").unwrap(), "acme");
        assert_eq!(normalize_query("ab").unwrap(), "ab");
        assert!(matches!(normalize_query("a"), Err(SearchError::QueryTooShort)));
        assert!(matches!(normalize_query("   "), Err(SearchError::QueryTooShort)));
    }

    #[test]
    fn test_query_too_short_message() {
        assert_eq!(
            SearchError::QueryTooShort.to_string(),
            "Search query must be at least 2 characters"
        );
    }
}
