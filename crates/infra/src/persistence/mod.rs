//! Repository adapters.
//!
//! Every aggregate is stored whole (JSON state + version), keyed by
//! `(aggregate_type, aggregate_id)`. An optional unique key per aggregate type
//! backs the order-number and email uniqueness rules.

pub mod in_memory;
pub mod postgres;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use tablefront_accounts::User;
use tablefront_core::{AggregateId, AggregateRoot};
use tablefront_orders::Order;
use tablefront_restaurants::Restaurant;

pub use in_memory::{InMemoryOrderRepository, InMemoryRepository, InMemoryRestaurantRepository, InMemoryUserRepository};
pub use postgres::{
    migrate, PostgresOrderRepository, PostgresRepository, PostgresRestaurantRepository, PostgresUserRepository,
};

/// Storage metadata for an aggregate type.
pub trait StoredAggregate:
    AggregateRoot + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const AGGREGATE_TYPE: &'static str;

    fn aggregate_id(id: &Self::Id) -> AggregateId;

    /// Value that must be unique among stored aggregates of this type.
    fn unique_key(&self) -> Option<String> {
        None
    }

    fn storage_uuid(id: &Self::Id) -> Uuid {
        *Self::aggregate_id(id).as_uuid()
    }
}

impl StoredAggregate for Order {
    const AGGREGATE_TYPE: &'static str = Order::AGGREGATE_TYPE;

    fn aggregate_id(id: &Self::Id) -> AggregateId {
        id.0
    }

    fn unique_key(&self) -> Option<String> {
        self.order_number().map(|n| n.as_str().to_string())
    }
}

impl StoredAggregate for Restaurant {
    const AGGREGATE_TYPE: &'static str = Restaurant::AGGREGATE_TYPE;

    fn aggregate_id(id: &Self::Id) -> AggregateId {
        id.0
    }
}

impl StoredAggregate for User {
    const AGGREGATE_TYPE: &'static str = User::AGGREGATE_TYPE;

    fn aggregate_id(id: &Self::Id) -> AggregateId {
        AggregateId::from(*id)
    }

    fn unique_key(&self) -> Option<String> {
        self.email().map(|e| e.as_str().to_string())
    }
}

/// Newest first, ties broken by id for a stable order.
pub(crate) fn newest_first<A, F>(items: &mut [A], created_at: F)
where
    A: StoredAggregate,
    F: Fn(&A) -> Option<chrono::DateTime<chrono::Utc>>,
{
    items.sort_by(|a, b| {
        created_at(b)
            .cmp(&created_at(a))
            .then_with(|| A::storage_uuid(b.id()).cmp(&A::storage_uuid(a.id())))
    });
}
