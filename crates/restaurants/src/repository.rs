use async_trait::async_trait;

use tablefront_core::{Repository, RepositoryResult, UserId};

use crate::restaurant::{Restaurant, RestaurantStatus};

/// Restaurant persistence port with the finders the ordering flows need.
#[async_trait]
pub trait RestaurantRepository: Repository<Restaurant> {
    async fn find_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Restaurant>>;

    async fn find_by_status(&self, status: RestaurantStatus) -> RepositoryResult<Vec<Restaurant>>;

    /// Restaurants for which `can_accept_orders()` currently holds.
    async fn find_accepting_orders(&self) -> RepositoryResult<Vec<Restaurant>>;
}
