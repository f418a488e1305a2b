/// Database models and their SQL operations
///
/// - `user`: accounts, credentials and preferences
/// - `customer`: customers (and the shared `RecordSource` enum)
/// - `lead`: prospects and lead conversion
/// - `sale`: sales with per-status totals
/// - `task`: to-dos with completion tracking
/// - `activity`: append-only activity log
/// - `notification`: in-app notifications
/// - `search`: cross-entity search
///
/// Every record except `User` has an `owner_id`; handlers load a record and
/// then run the ownership check before returning or mutating it.

pub mod activity;
pub mod customer;
pub mod lead;
pub mod notification;
pub mod sale;
pub mod search;
pub mod task;
pub mod user;

/// `%term%` for ILIKE, with LIKE metacharacters escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("acme"), "%acme%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
