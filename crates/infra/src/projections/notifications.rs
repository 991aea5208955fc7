//! Per-user notifications built from order and restaurant events.
//!
//! Redelivered envelopes are harmless: a notification is keyed by the event
//! that produced it and its recipient, and is only stored once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use tablefront_core::UserId;
use tablefront_events::EventEnvelope;
use tablefront_orders::{Order, OrderCreated, OrderEvent, OrderId, OrderStatus, OrderStatusChanged};
use tablefront_restaurants::{Restaurant, RestaurantBlocked, RestaurantEvent, RestaurantId};

use crate::read_model::ReadModelStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sent to the customer who placed the order.
    OrderPlaced,
    /// Sent to the restaurant owner.
    OrderReceived,
    OrderStatusChanged,
    OrderCancelled,
    RestaurantApproved,
    RestaurantBlocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub order_id: Option<OrderId>,
    pub restaurant_id: Option<RestaurantId>,
    /// Event the notification was derived from.
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Projection keeping every user's notification inbox.
#[derive(Debug)]
pub struct NotificationsProjection<S> {
    store: S,
}

impl<S> NotificationsProjection<S>
where
    S: ReadModelStore<UserId, Vec<Notification>>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), anyhow::Error> {
        match envelope.aggregate_type() {
            Order::AGGREGATE_TYPE => {
                let event: OrderEvent = envelope.decode()?;
                self.apply_order_event(envelope, event);
            }
            Restaurant::AGGREGATE_TYPE => {
                let event: RestaurantEvent = envelope.decode()?;
                self.apply_restaurant_event(envelope, event);
            }
            _ => {}
        }
        Ok(())
    }

    /// Notifications for one user, newest first.
    pub fn for_user(&self, user_id: UserId) -> Vec<Notification> {
        let mut inbox = self.store.get(&user_id).unwrap_or_default();
        inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        inbox
    }

    /// Drop all inboxes before a replay.
    pub fn reset(&self) {
        self.store.clear();
    }

    fn apply_order_event(&self, envelope: &EventEnvelope<JsonValue>, event: OrderEvent) {
        match event {
            OrderEvent::OrderCreated(e) => self.apply_order_created(envelope, e),
            OrderEvent::OrderStatusChanged(e) => self.apply_status_changed(envelope, e),
            OrderEvent::OrderItemAdded(_) => {}
        }
    }

    fn apply_order_created(&self, envelope: &EventEnvelope<JsonValue>, e: OrderCreated) {
        self.notify(
            envelope,
            e.user_id,
            NotificationKind::OrderPlaced,
            format!("Your order {} has been placed ({})", e.order_number, e.total_amount),
            Some(e.order_id),
            Some(e.restaurant_id),
        );
        self.notify(
            envelope,
            e.restaurant_owner_id,
            NotificationKind::OrderReceived,
            format!(
                "New order {} with {} line(s), total {}",
                e.order_number, e.item_count, e.total_amount
            ),
            Some(e.order_id),
            Some(e.restaurant_id),
        );
    }

    fn apply_status_changed(&self, envelope: &EventEnvelope<JsonValue>, e: OrderStatusChanged) {
        let message = match (e.new_status, e.estimated_pickup_time) {
            (OrderStatus::Confirmed, Some(pickup)) => format!(
                "Your order {} is now {}, estimated pickup at {}",
                e.order_number,
                e.new_status,
                pickup.format("%H:%M")
            ),
            _ => format!("Your order {} is now {}", e.order_number, e.new_status),
        };
        self.notify(
            envelope,
            e.user_id,
            NotificationKind::OrderStatusChanged,
            message,
            Some(e.order_id),
            Some(e.restaurant_id),
        );

        if e.new_status == OrderStatus::Cancelled {
            self.notify(
                envelope,
                e.restaurant_owner_id,
                NotificationKind::OrderCancelled,
                format!("Order {} was cancelled", e.order_number),
                Some(e.order_id),
                Some(e.restaurant_id),
            );
        }
    }

    fn apply_restaurant_event(&self, envelope: &EventEnvelope<JsonValue>, event: RestaurantEvent) {
        match event {
            RestaurantEvent::RestaurantApproved(e) => self.notify(
                envelope,
                e.owner_id,
                NotificationKind::RestaurantApproved,
                "Your restaurant has been approved and can now accept orders".to_string(),
                None,
                Some(e.restaurant_id),
            ),
            RestaurantEvent::RestaurantBlocked(RestaurantBlocked {
                restaurant_id,
                owner_id,
                reason,
                ..
            }) => self.notify(
                envelope,
                owner_id,
                NotificationKind::RestaurantBlocked,
                format!("Your restaurant has been blocked: {reason}"),
                None,
                Some(restaurant_id),
            ),
            _ => {}
        }
    }

    fn notify(
        &self,
        envelope: &EventEnvelope<JsonValue>,
        user_id: UserId,
        kind: NotificationKind,
        message: String,
        order_id: Option<OrderId>,
        restaurant_id: Option<RestaurantId>,
    ) {
        let mut inbox = self.store.get(&user_id).unwrap_or_default();
        let event_id = envelope.event_id();
        if inbox.iter().any(|n| n.event_id == event_id && n.kind == kind) {
            return;
        }

        inbox.push(Notification {
            id: Uuid::now_v7(),
            user_id,
            kind,
            message,
            order_id,
            restaurant_id,
            event_id,
            created_at: envelope.occurred_on(),
        });
        self.store.upsert(user_id, inbox);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tablefront_core::AggregateId;
    use tablefront_restaurants::RestaurantStatus;

    use super::*;
    use crate::read_model::InMemoryReadModelStore;

    fn blocked_envelope(owner_id: UserId) -> EventEnvelope<JsonValue> {
        let restaurant_id = RestaurantId::new(AggregateId::new());
        let event = RestaurantEvent::RestaurantBlocked(RestaurantBlocked {
            restaurant_id,
            owner_id,
            previous_status: RestaurantStatus::Approved,
            reason: "hygiene inspection failed".to_string(),
            occurred_at: Utc::now(),
        });
        EventEnvelope::from_typed(restaurant_id.0, Restaurant::AGGREGATE_TYPE, 3, &event).unwrap()
    }

    #[test]
    fn owner_is_told_why_the_restaurant_was_blocked() {
        let projection = NotificationsProjection::new(InMemoryReadModelStore::new());
        let owner_id = UserId::new();

        projection.apply_envelope(&blocked_envelope(owner_id)).unwrap();

        let inbox = projection.for_user(owner_id);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::RestaurantBlocked);
        assert!(inbox[0].message.contains("hygiene inspection failed"));
    }

    #[test]
    fn redelivery_does_not_duplicate() {
        let projection = NotificationsProjection::new(InMemoryReadModelStore::new());
        let owner_id = UserId::new();
        let envelope = blocked_envelope(owner_id);

        projection.apply_envelope(&envelope).unwrap();
        projection.apply_envelope(&envelope).unwrap();

        assert_eq!(projection.for_user(owner_id).len(), 1);
    }

    #[test]
    fn unrelated_aggregates_are_ignored() {
        let projection = NotificationsProjection::new(InMemoryReadModelStore::new());
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            AggregateId::new(),
            "accounts.user",
            1,
            "accounts.user.registered",
            Utc::now(),
            serde_json::json!({ "anything": true }),
        );

        projection.apply_envelope(&envelope).unwrap();
        assert!(projection.for_user(UserId::new()).is_empty());
    }
}
