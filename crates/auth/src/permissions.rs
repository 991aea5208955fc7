use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Opaque strings of the form `<area>.<action>`. `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: &'static str = "*";

    pub const ORDERS_PLACE: &'static str = "orders.place";
    pub const ORDERS_READ: &'static str = "orders.read";
    pub const ORDERS_FULFIL: &'static str = "orders.fulfil";
    pub const RESTAURANTS_REGISTER: &'static str = "restaurants.register";
    pub const RESTAURANTS_MANAGE: &'static str = "restaurants.manage";
    pub const RESTAURANTS_RATE: &'static str = "restaurants.rate";
    pub const RESTAURANTS_APPROVE: &'static str = "admin.restaurants.approve";
    pub const USERS_MANAGE: &'static str = "admin.users.manage";
    pub const ANALYTICS_READ: &'static str = "admin.analytics.read";
    pub const FAVORITES_MANAGE: &'static str = "favorites.manage";
    pub const NOTIFICATIONS_READ: &'static str = "notifications.read";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn wildcard() -> Self {
        Self::new(Self::WILDCARD)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
