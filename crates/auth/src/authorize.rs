use std::collections::HashSet;

use thiserror::Error;

use tablefront_core::UserId;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: not the owner of this resource")]
    NotOwner,
}

/// Check a permission against the principal's effective permissions.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains(Permission::WILDCARD) || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Permission check plus resource ownership; admins bypass ownership.
pub fn authorize_owner(
    principal: &Principal,
    required: &Permission,
    owner_id: UserId,
) -> Result<(), AuthzError> {
    authorize(principal, required)?;
    if principal.is_admin() || principal.user_id == owner_id {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}
