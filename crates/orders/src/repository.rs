use std::sync::Arc;

use async_trait::async_trait;

use tablefront_core::{Repository, RepositoryResult, UserId};
use tablefront_restaurants::RestaurantId;

use crate::number::OrderNumber;
use crate::order::Order;
use crate::status::OrderStatus;

/// Uniqueness check used by the order number generator.
#[async_trait]
pub trait OrderNumberLookup: Send + Sync {
    async fn exists_by_order_number(&self, order_number: &OrderNumber) -> RepositoryResult<bool>;
}

#[async_trait]
impl<L> OrderNumberLookup for Arc<L>
where
    L: OrderNumberLookup + ?Sized,
{
    async fn exists_by_order_number(&self, order_number: &OrderNumber) -> RepositoryResult<bool> {
        (**self).exists_by_order_number(order_number).await
    }
}

/// Order persistence port.
///
/// Implementations must also reject a second order carrying an order number
/// that is already stored.
#[async_trait]
pub trait OrderRepository: Repository<Order> + OrderNumberLookup {
    async fn find_by_order_number(&self, order_number: &OrderNumber)
    -> RepositoryResult<Option<Order>>;

    /// Orders placed by a customer, newest first.
    async fn find_by_user_id(&self, user_id: UserId) -> RepositoryResult<Vec<Order>>;

    /// Orders received by a restaurant, newest first.
    async fn find_by_restaurant_id(&self, restaurant_id: RestaurantId)
    -> RepositoryResult<Vec<Order>>;

    async fn find_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>>;
}
