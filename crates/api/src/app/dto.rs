use chrono::{DateTime, Utc};
use serde::Deserialize;

use tablefront_accounts::User;
use tablefront_core::{AggregateRoot, Entity, Money};
use tablefront_infra::NewOrderItem;
use tablefront_orders::{MenuItemId, Order, OrderItem};
use tablefront_restaurants::Restaurant;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRestaurantRequest {
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: Option<String>,
    pub cuisine_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateRestaurantRequest {
    pub rating: f32,
}

#[derive(Debug, Deserialize)]
pub struct BlockRestaurantRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ListRestaurantsQuery {
    pub status: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub menu_item_id: MenuItemId,
    pub name: String,
    /// `{"amount": "4.50", "currency": "EUR"}`
    pub unit_price: Money,
    pub quantity: u32,
    pub notes: Option<String>,
}

impl From<OrderItemRequest> for NewOrderItem {
    fn from(value: OrderItemRequest) -> Self {
        NewOrderItem {
            menu_item_id: value.menu_item_id,
            name: value.name,
            unit_price: value.unit_price,
            quantity: value.quantity,
            notes: value.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: String,
    pub items: Vec<OrderItemRequest>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub expected_version: Option<u64>,
    pub estimated_pickup_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub restaurant_id: Option<String>,
    pub order_number: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn user_to_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id().to_string(),
        "email": user.email().map(|e| e.as_str()),
        "full_name": user.full_name(),
        "phone": user.phone(),
        "role": user.role().as_str(),
        "is_active": user.is_active(),
        "favorites": user.favorites().iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        "created_at": user.created_at().map(|t| t.to_rfc3339()),
        "version": user.version(),
    })
}

pub fn restaurant_to_json(restaurant: &Restaurant) -> serde_json::Value {
    serde_json::json!({
        "id": restaurant.id_typed().to_string(),
        "owner_id": restaurant.owner_id().map(|id| id.to_string()),
        "name": restaurant.name(),
        "email": restaurant.email().map(|e| e.as_str()),
        "address": restaurant.address(),
        "phone": restaurant.phone(),
        "cuisine_type": restaurant.cuisine_type(),
        "rating": restaurant.rating(),
        "status": restaurant.status().as_str(),
        "is_open": restaurant.is_open(),
        "is_active": restaurant.is_active(),
        "blocked_reason": restaurant.blocked_reason(),
        "accepting_orders": restaurant.can_accept_orders(),
        "version": restaurant.version(),
    })
}

fn order_item_to_json(item: &OrderItem) -> serde_json::Value {
    serde_json::json!({
        "id": item.id().0.to_string(),
        "menu_item_id": item.menu_item_id().0.to_string(),
        "name": item.menu_item_name(),
        "unit_price": item.unit_price(),
        "quantity": item.quantity(),
        "notes": item.special_notes(),
        "subtotal": item.subtotal().ok(),
    })
}

pub fn order_to_json(order: &Order) -> serde_json::Value {
    serde_json::json!({
        "id": order.id_typed().to_string(),
        "order_number": order.order_number().map(|n| n.as_str()),
        "user_id": order.user_id().map(|id| id.to_string()),
        "restaurant_id": order.restaurant_id().map(|id| id.to_string()),
        "status": order.status().as_str(),
        "total_amount": order.total_amount(),
        "special_instructions": order.special_instructions(),
        "items": order.items().iter().map(order_item_to_json).collect::<Vec<_>>(),
        "estimated_pickup_time": order.estimated_pickup_time().map(|t| t.to_rfc3339()),
        "actual_pickup_time": order.actual_pickup_time().map(|t| t.to_rfc3339()),
        "created_at": order.created_at().map(|t| t.to_rfc3339()),
        "version": order.version(),
    })
}
