//! API-side authorization guard.
//!
//! Checks run in handlers before any workflow is invoked, keeping the
//! domain crates and the store auth-agnostic.

use shopdesk_auth::{Permission, authorize};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Require `permission` for the current principal.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), ApiError> {
    authorize(principal.principal(), permission)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use shopdesk_auth::{Role, permissions};
    use shopdesk_core::UserId;

    use super::*;

    #[test]
    fn customers_cannot_manage_catalog() {
        let shopper = PrincipalContext::new(UserId::new(), Role::Customer);
        let err = require(&shopper, &permissions::CATALOG_MANAGE).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let admin = PrincipalContext::new(UserId::new(), Role::Admin);
        assert!(require(&admin, &permissions::CATALOG_MANAGE).is_ok());
    }
}
