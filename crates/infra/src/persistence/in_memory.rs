use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use tablefront_accounts::{User, UserRepository};
use tablefront_core::{Email, ExpectedVersion, Repository, RepositoryError, RepositoryResult, UserId};
use tablefront_orders::{Order, OrderNumber, OrderNumberLookup, OrderRepository, OrderStatus};
use tablefront_restaurants::{Restaurant, RestaurantId, RestaurantRepository, RestaurantStatus};

use super::{StoredAggregate, newest_first};

pub type InMemoryOrderRepository = InMemoryRepository<Order>;
pub type InMemoryRestaurantRepository = InMemoryRepository<Restaurant>;
pub type InMemoryUserRepository = InMemoryRepository<User>;

/// In-memory aggregate store for tests/dev.
///
/// Same contract as the Postgres adapter: whole-state upsert, optimistic
/// version check, unique key enforcement.
#[derive(Debug)]
pub struct InMemoryRepository<A>
where
    A: StoredAggregate,
{
    inner: RwLock<HashMap<A::Id, A>>,
}

impl<A> InMemoryRepository<A>
where
    A: StoredAggregate,
{
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_all(&self) -> RepositoryResult<Vec<A>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }

    fn filtered(&self, keep: impl Fn(&A) -> bool) -> RepositoryResult<Vec<A>> {
        Ok(self.read_all()?.into_iter().filter(|a| keep(a)).collect())
    }
}

impl<A> Default for InMemoryRepository<A>
where
    A: StoredAggregate,
{
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Backend("in-memory repository lock poisoned".to_string())
}

#[async_trait]
impl<A> Repository<A> for InMemoryRepository<A>
where
    A: StoredAggregate,
{
    async fn find_by_id(&self, id: &A::Id) -> RepositoryResult<Option<A>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(id).cloned())
    }

    async fn save(&self, aggregate: &A, expected: ExpectedVersion) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let id = aggregate.id();

        let current = map.get(id).map(|a| a.version()).unwrap_or(0);
        if !expected.matches(current) {
            return Err(RepositoryError::Conflict(format!(
                "{} {:?}: expected version {expected:?}, found {current}",
                A::AGGREGATE_TYPE,
                id
            )));
        }

        if let Some(key) = aggregate.unique_key() {
            let taken = map
                .iter()
                .any(|(other_id, other)| other_id != id && other.unique_key().as_deref() == Some(key.as_str()));
            if taken {
                return Err(RepositoryError::Duplicate(format!(
                    "{} with key '{key}' already exists",
                    A::AGGREGATE_TYPE
                )));
            }
        }

        map.insert(id.clone(), aggregate.clone());
        Ok(())
    }

    async fn delete(&self, id: &A::Id) -> RepositoryResult<bool> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(id).is_some())
    }
}

#[async_trait]
impl OrderNumberLookup for InMemoryRepository<Order> {
    async fn exists_by_order_number(&self, order_number: &OrderNumber) -> RepositoryResult<bool> {
        Ok(self.find_by_order_number(order_number).await?.is_some())
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository<Order> {
    async fn find_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> RepositoryResult<Option<Order>> {
        Ok(self
            .filtered(|o| o.order_number() == Some(order_number))?
            .into_iter()
            .next())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> RepositoryResult<Vec<Order>> {
        let mut orders = self.filtered(|o| o.user_id() == Some(user_id))?;
        newest_first(&mut orders, Order::created_at);
        Ok(orders)
    }

    async fn find_by_restaurant_id(
        &self,
        restaurant_id: RestaurantId,
    ) -> RepositoryResult<Vec<Order>> {
        let mut orders = self.filtered(|o| o.restaurant_id() == Some(restaurant_id))?;
        newest_first(&mut orders, Order::created_at);
        Ok(orders)
    }

    async fn find_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        let mut orders = self.filtered(|o| o.status() == status)?;
        newest_first(&mut orders, Order::created_at);
        Ok(orders)
    }
}

#[async_trait]
impl RestaurantRepository for InMemoryRepository<Restaurant> {
    async fn find_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Restaurant>> {
        let mut restaurants = self.filtered(|r| r.owner_id() == Some(owner_id))?;
        newest_first(&mut restaurants, Restaurant::created_at);
        Ok(restaurants)
    }

    async fn find_by_status(&self, status: RestaurantStatus) -> RepositoryResult<Vec<Restaurant>> {
        let mut restaurants = self.filtered(|r| r.status() == status)?;
        newest_first(&mut restaurants, Restaurant::created_at);
        Ok(restaurants)
    }

    async fn find_accepting_orders(&self) -> RepositoryResult<Vec<Restaurant>> {
        let mut restaurants = self.filtered(Restaurant::can_accept_orders)?;
        newest_first(&mut restaurants, Restaurant::created_at);
        Ok(restaurants)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository<User> {
    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>> {
        Ok(self.filtered(|u| u.email() == Some(email))?.into_iter().next())
    }
}
