use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier carried in tokens.
///
/// Roles stay opaque strings on the wire; `permissions_for` is the policy
/// that maps the known ones to permissions. Unknown roles grant nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const CUSTOMER: &'static str = "customer";
    pub const RESTAURANT_OWNER: &'static str = "restaurant_owner";
    pub const ADMIN: &'static str = "admin";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn customer() -> Self {
        Self::new(Self::CUSTOMER)
    }

    pub fn restaurant_owner() -> Self {
        Self::new(Self::RESTAURANT_OWNER)
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role → permission policy.
pub fn permissions_for(role: &Role) -> Vec<Permission> {
    match role.as_str() {
        Role::ADMIN => vec![Permission::wildcard()],
        Role::RESTAURANT_OWNER => vec![
            Permission::new(Permission::RESTAURANTS_REGISTER),
            Permission::new(Permission::RESTAURANTS_MANAGE),
            Permission::new(Permission::ORDERS_READ),
            Permission::new(Permission::ORDERS_FULFIL),
            Permission::new(Permission::NOTIFICATIONS_READ),
        ],
        Role::CUSTOMER => vec![
            Permission::new(Permission::ORDERS_PLACE),
            Permission::new(Permission::ORDERS_READ),
            Permission::new(Permission::FAVORITES_MANAGE),
            Permission::new(Permission::RESTAURANTS_RATE),
            Permission::new(Permission::NOTIFICATIONS_READ),
        ],
        _ => vec![],
    }
}
