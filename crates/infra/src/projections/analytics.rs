//! Admin dashboard counters.
//!
//! Counts are derived purely from published events; a rebuild replays the
//! bus history through a fresh `AnalyticsProjection`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use tablefront_accounts::{User, UserEvent};
use tablefront_core::Money;
use tablefront_events::{EventEnvelope, Projection, ProjectionError, ProjectionRunner};
use tablefront_orders::{Order, OrderEvent, OrderStatus};
use tablefront_restaurants::{Restaurant, RestaurantEvent, RestaurantStatus};

/// Point-in-time view of the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_orders: u64,
    pub orders_by_status: BTreeMap<String, u64>,
    /// Completed-order revenue: restaurant id → currency code → amount.
    pub revenue_by_restaurant: BTreeMap<String, BTreeMap<String, Money>>,
    pub restaurants_by_status: BTreeMap<String, u64>,
    pub registered_users: u64,
    pub active_users: u64,
}

#[derive(Debug, Default)]
pub struct AnalyticsProjection {
    snapshot: AnalyticsSnapshot,
}

impl AnalyticsProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &AnalyticsSnapshot {
        &self.snapshot
    }

    fn apply_order(&mut self, event: OrderEvent) {
        match event {
            OrderEvent::OrderCreated(_) => {
                self.snapshot.total_orders += 1;
                increment(&mut self.snapshot.orders_by_status, OrderStatus::Pending.as_str());
            }
            OrderEvent::OrderStatusChanged(e) => {
                decrement(&mut self.snapshot.orders_by_status, e.previous_status.as_str());
                increment(&mut self.snapshot.orders_by_status, e.new_status.as_str());

                if e.new_status == OrderStatus::Completed {
                    let per_currency = self
                        .snapshot
                        .revenue_by_restaurant
                        .entry(e.restaurant_id.to_string())
                        .or_default();
                    let currency = e.total_amount.currency();
                    let current = per_currency
                        .get(currency.code())
                        .copied()
                        .unwrap_or_else(|| Money::zero(currency));
                    match current.add(&e.total_amount) {
                        Ok(sum) => {
                            per_currency.insert(currency.code().to_string(), sum);
                        }
                        Err(err) => warn!(error = %err, "revenue overflow; amount skipped"),
                    }
                }
            }
            OrderEvent::OrderItemAdded(_) => {}
        }
    }

    fn apply_restaurant(&mut self, event: RestaurantEvent) {
        let counts = &mut self.snapshot.restaurants_by_status;
        match event {
            RestaurantEvent::RestaurantRegistered(_) => {
                increment(counts, RestaurantStatus::Pending.as_str());
            }
            RestaurantEvent::RestaurantApproved(e) => {
                decrement(counts, e.previous_status.as_str());
                increment(counts, RestaurantStatus::Approved.as_str());
            }
            RestaurantEvent::RestaurantBlocked(e) => {
                decrement(counts, e.previous_status.as_str());
                increment(counts, RestaurantStatus::Blocked.as_str());
            }
            _ => {}
        }
    }

    fn apply_user(&mut self, event: UserEvent) {
        match event {
            UserEvent::UserRegistered(_) => {
                self.snapshot.registered_users += 1;
                self.snapshot.active_users += 1;
            }
            UserEvent::UserDeactivated(_) => {
                self.snapshot.active_users = self.snapshot.active_users.saturating_sub(1);
            }
            _ => {}
        }
    }
}

fn increment(counts: &mut BTreeMap<String, u64>, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

fn decrement(counts: &mut BTreeMap<String, u64>, key: &str) {
    if let Some(count) = counts.get_mut(key) {
        *count = count.saturating_sub(1);
    }
}

impl Projection for AnalyticsProjection {
    type Ev = JsonValue;

    fn apply(&mut self, envelope: &EventEnvelope<JsonValue>) {
        let decoded = match envelope.aggregate_type() {
            Order::AGGREGATE_TYPE => envelope.decode::<OrderEvent>().map(|e| self.apply_order(e)),
            Restaurant::AGGREGATE_TYPE => envelope
                .decode::<RestaurantEvent>()
                .map(|e| self.apply_restaurant(e)),
            User::AGGREGATE_TYPE => envelope.decode::<UserEvent>().map(|e| self.apply_user(e)),
            _ => Ok(()),
        };

        if let Err(err) = decoded {
            warn!(
                event_type = envelope.event_type(),
                error = %err,
                "analytics projection could not decode event"
            );
        }
    }
}

/// Thread-safe handle shared by the bus worker and the HTTP layer.
#[derive(Debug)]
pub struct AnalyticsReadModel {
    runner: Mutex<ProjectionRunner<AnalyticsProjection>>,
}

impl Default for AnalyticsReadModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsReadModel {
    pub fn new() -> Self {
        Self {
            runner: Mutex::new(ProjectionRunner::new(AnalyticsProjection::new())),
        }
    }

    /// Apply one envelope; stale or redelivered envelopes are rejected.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let mut runner = self.runner.lock().unwrap_or_else(|p| p.into_inner());
        runner.apply(envelope)
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        let runner = self.runner.lock().unwrap_or_else(|p| p.into_inner());
        runner.projection().snapshot().clone()
    }

    /// Envelopes applied since start (or the last rebuild).
    pub fn applied(&self) -> u64 {
        let runner = self.runner.lock().unwrap_or_else(|p| p.into_inner());
        runner.cursor().applied()
    }

    /// Replace the counters with a rebuild from `history`.
    ///
    /// On error the current counters are kept.
    pub fn rebuild<'a>(
        &self,
        history: impl IntoIterator<Item = &'a EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        let mut rebuilt = ProjectionRunner::new(AnalyticsProjection::new());
        rebuilt.run(history)?;
        let mut runner = self.runner.lock().unwrap_or_else(|p| p.into_inner());
        *runner = rebuilt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tablefront_accounts::{UserDeactivated, UserRegistered, UserRole};
    use tablefront_core::{Email, UserId};

    use super::*;

    fn user_envelopes(user_id: UserId) -> Vec<EventEnvelope<JsonValue>> {
        let registered = UserEvent::UserRegistered(UserRegistered {
            user_id,
            email: Email::parse("kim@example.com").unwrap(),
            full_name: "Kim".to_string(),
            phone: None,
            role: UserRole::Customer,
            occurred_at: Utc::now(),
        });
        let deactivated = UserEvent::UserDeactivated(UserDeactivated {
            user_id,
            occurred_at: Utc::now(),
        });
        let id = user_id.into();
        vec![
            EventEnvelope::from_typed(id, User::AGGREGATE_TYPE, 1, &registered).unwrap(),
            EventEnvelope::from_typed(id, User::AGGREGATE_TYPE, 2, &deactivated).unwrap(),
        ]
    }

    #[test]
    fn users_are_counted_and_deactivations_reduce_active() {
        let analytics = AnalyticsReadModel::new();
        for envelope in user_envelopes(UserId::new()) {
            analytics.apply_envelope(&envelope).unwrap();
        }

        let snapshot = analytics.snapshot();
        assert_eq!(snapshot.registered_users, 1);
        assert_eq!(snapshot.active_users, 0);
    }

    #[test]
    fn redelivered_envelope_is_rejected_and_not_counted() {
        let analytics = AnalyticsReadModel::new();
        let envelopes = user_envelopes(UserId::new());
        analytics.apply_envelope(&envelopes[0]).unwrap();

        let err = analytics.apply_envelope(&envelopes[0]).unwrap_err();
        match err {
            ProjectionError::NonMonotonicSequence { last, found, .. } => {
                assert_eq!((last, found), (1, 1));
            }
        }
        assert_eq!(analytics.snapshot().registered_users, 1);
    }

    #[test]
    fn rebuild_replaces_the_counters() {
        let analytics = AnalyticsReadModel::new();
        let first = user_envelopes(UserId::new());
        analytics.apply_envelope(&first[0]).unwrap();

        let history: Vec<_> = user_envelopes(UserId::new())
            .into_iter()
            .chain(user_envelopes(UserId::new()))
            .collect();
        analytics.rebuild(&history).unwrap();

        let snapshot = analytics.snapshot();
        assert_eq!(snapshot.registered_users, 2);
        assert_eq!(snapshot.active_users, 0);
        assert_eq!(analytics.applied(), 4);
    }
}
