/// Record ownership checks
///
/// Every business record carries the id of the user who created it. Only that
/// user may read, change or delete it; roles do not widen this.
///
/// Handlers load the record first (404 if absent), then call
/// [`require_owner`] (403 if it belongs to someone else).
///
/// # Example
///
/// ```
/// use crm_shared::auth::authorization::{require_owner, AuthzError};
/// use crm_shared::auth::middleware::AuthContext;
/// use crm_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let user_id = Uuid::new_v4();
/// let auth = AuthContext {
///     user_id,
///     email: "ana@example.com".into(),
///     role: UserRole::User,
///     token: String::new(),
///     expires_at: 0,
/// };
///
/// assert!(require_owner(user_id, &auth).is_ok());
/// assert!(matches!(require_owner(Uuid::new_v4(), &auth), Err(AuthzError::NotOwner)));
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Record belongs to another user
    #[error("Not authorized to access this resource")]
    NotOwner,

    /// Account has been deactivated
    #[error("User account is inactive")]
    Inactive,
}

/// Checks that the authenticated user owns a record
pub fn require_owner(owner_id: Uuid, auth: &AuthContext) -> Result<(), AuthzError> {
    if owner_id == auth.user_id {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %auth.user_id,
            owner_id = %owner_id,
            "Ownership check failed"
        );
        Err(AuthzError::NotOwner)
    }
}

/// Marker for records that belong to a single user
pub trait Owned {
    fn owner_id(&self) -> Uuid;

    /// Checks that `auth` owns this record
    fn ensure_owned_by(&self, auth: &AuthContext) -> Result<(), AuthzError> {
        require_owner(self.owner_id(), auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn context(user_id: Uuid) -> AuthContext {
        AuthContext {
            user_id,
            email: "ana@example.com".to_string(),
            role: UserRole::Admin,
            token: String::new(),
            expires_at: 0,
        }
    }

    struct Record(Uuid);

    impl Owned for Record {
        fn owner_id(&self) -> Uuid {
            self.0
        }
    }

    #[test]
    fn test_require_owner() {
        let user_id = Uuid::new_v4();
        assert!(require_owner(user_id, &context(user_id)).is_ok());
    }

    #[test]
    fn test_admin_role_does_not_bypass_ownership() {
        let auth = context(Uuid::new_v4());
        assert!(matches!(
            require_owner(Uuid::new_v4(), &auth),
            Err(AuthzError::NotOwner)
        ));
    }

    #[test]
    fn test_owned_trait() {
        let user_id = Uuid::new_v4();
        let record = Record(user_id);

        assert!(record.ensure_owned_by(&context(user_id)).is_ok());
        assert!(record.ensure_owned_by(&context(Uuid::new_v4())).is_err());
    }
}
