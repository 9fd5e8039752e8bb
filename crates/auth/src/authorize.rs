use serde::Serialize;
use thiserror::Error;

use shopdesk_core::UserId;

use crate::permissions::{self, Permission};
use crate::Role;

/// An authenticated principal, as derived from verified token claims.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Role → permission policy.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![permissions::ALL],
        Role::Customer => vec![
            permissions::ORDERS_PLACE,
            permissions::ORDERS_READ_OWN,
            permissions::CUSTOMERS_SELF,
            permissions::INVOICES_READ_OWN,
        ],
    }
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = permissions_for(principal.role)
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_wildcard() {
        let admin = Principal::new(UserId::new(), Role::Admin);
        assert!(authorize(&admin, &permissions::SETTINGS_MANAGE).is_ok());
        assert!(authorize(&admin, &Permission::new("anything.at_all")).is_ok());
    }

    #[test]
    fn customer_limited_to_own_data() {
        let customer = Principal::new(UserId::new(), Role::Customer);
        assert!(authorize(&customer, &permissions::ORDERS_PLACE).is_ok());
        assert!(authorize(&customer, &permissions::INVOICES_READ_OWN).is_ok());

        let err = authorize(&customer, &permissions::ORDERS_MANAGE).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("orders.manage".to_string()));
    }
}
