//! API-side authorization guards.
//!
//! Checks run in the handlers before anything is dispatched, so domain
//! aggregates and infra stay auth-agnostic.

use tablefront_auth::{AuthzError, Permission, authorize, authorize_owner};
use tablefront_core::UserId;

use crate::context::PrincipalContext;

/// Require a permission.
pub fn require(principal: &PrincipalContext, permission: &'static str) -> Result<(), AuthzError> {
    authorize(principal.principal(), &Permission::new(permission))
}

/// Require a permission on a resource owned by `owner_id` (admins bypass
/// ownership).
pub fn require_owner(
    principal: &PrincipalContext,
    permission: &'static str,
    owner_id: UserId,
) -> Result<(), AuthzError> {
    authorize_owner(principal.principal(), &Permission::new(permission), owner_id)
}

/// Only the user themselves, or an admin.
pub fn require_self(principal: &PrincipalContext, user_id: UserId) -> Result<(), AuthzError> {
    if principal.is_admin() || principal.user_id() == user_id {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}
