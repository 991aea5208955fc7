use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tablefront_core::{DomainError, DomainResult, Entity, Money};

/// Identifier of a line inside an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderItemId(pub Uuid);

impl OrderItemId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OrderItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-supplied reference to the menu entry an item was ordered from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(pub Uuid);

/// Order line: a snapshot of the menu entry's name and price at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    id: OrderItemId,
    menu_item_id: MenuItemId,
    menu_item_name: String,
    unit_price: Money,
    quantity: u32,
    special_notes: Option<String>,
}

impl Entity for OrderItem {
    type Id = OrderItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl OrderItem {
    pub fn new(
        id: OrderItemId,
        menu_item_id: MenuItemId,
        menu_item_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
        special_notes: Option<String>,
    ) -> DomainResult<Self> {
        let item = Self {
            id,
            menu_item_id,
            menu_item_name: menu_item_name.into().trim().to_string(),
            unit_price,
            quantity,
            special_notes: special_notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        };
        item.validate()?;
        Ok(item)
    }

    /// Re-check invariants (items may arrive deserialized).
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity < 1 {
            return Err(DomainError::validation(format!(
                "quantity for '{}' must be at least 1",
                self.menu_item_name
            )));
        }
        if self.menu_item_name.trim().is_empty() {
            return Err(DomainError::validation("menu item name must not be empty"));
        }
        Ok(())
    }

    pub fn menu_item_id(&self) -> MenuItemId {
        self.menu_item_id
    }

    pub fn menu_item_name(&self) -> &str {
        &self.menu_item_name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn special_notes(&self) -> Option<&str> {
        self.special_notes.as_deref()
    }

    /// `unit_price × quantity`.
    pub fn subtotal(&self) -> DomainResult<Money> {
        self.unit_price.multiply(self.quantity)
    }
}
