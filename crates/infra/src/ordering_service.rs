//! Command execution pipeline for the ordering platform.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load aggregate state (or start from `empty(id)`)
//!   ↓
//! 2. Decide (`handle`, pure) and evolve (`apply`, +1 version per event)
//!   ↓
//! 3. Save the whole aggregate, expecting the version that was loaded
//!   ↓
//! 4. Publish one envelope per event (after the save succeeded)
//! ```
//!
//! Publication is fire-and-forget: a bus failure is logged and the command
//! still succeeds, since its state change is already committed. Rejected
//! commands publish nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

use tablefront_accounts::{
    AddFavorite, DeactivateUser, RegisterUser, RemoveFavorite, User, UserCommand, UserRepository,
    UserRole,
};
use tablefront_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, Email, ExpectedVersion, Money, Repository,
    RepositoryError, UserId,
};
use tablefront_events::{Event, EventBus, EventEnvelope, execute};
use tablefront_orders::{
    AddOrderItem, Clock, CreateOrder, MenuItemId, Order, OrderCommand, OrderId, OrderItem,
    OrderItemId, OrderNumber, OrderNumberError, OrderNumberGenerator, OrderRepository, OrderStatus,
    SystemClock, UpdateOrderStatus,
};
use tablefront_restaurants::{
    ApproveRestaurant, BlockRestaurant, CloseRestaurant, DeactivateRestaurant, OpenRestaurant,
    RateRestaurant, ReactivateRestaurant, RegisterRestaurant, Restaurant, RestaurantCommand,
    RestaurantId, RestaurantRepository, RestaurantStatus,
};

use crate::persistence::StoredAggregate;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("not found")]
    NotFound,

    /// Stale version, either caller-supplied or detected by the store.
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    /// A uniqueness rule (order number, email) was violated.
    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("gave up after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error("unauthorized")]
    Unauthorized,

    #[error("storage failure: {0}")]
    Backend(String),

    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvalidState(msg) => DispatchError::InvalidState(msg),
            DomainError::InvalidTransition { from, to } => {
                DispatchError::InvalidTransition { from, to }
            }
            DomainError::InvalidId(msg) => DispatchError::InvalidId(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::ConcurrentModification(msg) => DispatchError::ConcurrentModification(msg),
            DomainError::ExhaustedRetries { attempts } => {
                DispatchError::ExhaustedRetries { attempts }
            }
            DomainError::Unauthorized => DispatchError::Unauthorized,
        }
    }
}

impl From<RepositoryError> for DispatchError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(msg) => DispatchError::ConcurrentModification(msg),
            RepositoryError::Duplicate(msg) => DispatchError::Duplicate(msg),
            RepositoryError::Serialization(msg) => DispatchError::Serialization(msg),
            RepositoryError::Backend(msg) => DispatchError::Backend(msg),
        }
    }
}

impl From<OrderNumberError> for DispatchError {
    fn from(value: OrderNumberError) -> Self {
        match value {
            OrderNumberError::Domain(err) => err.into(),
            OrderNumberError::Lookup(err) => err.into(),
        }
    }
}

/// One requested order line; the name and price are a snapshot of the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub notes: Option<String>,
}

impl NewOrderItem {
    fn into_item(self) -> Result<OrderItem, DomainError> {
        OrderItem::new(
            OrderItemId::new(),
            self.menu_item_id,
            self.name,
            self.unit_price,
            self.quantity,
            self.notes,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub items: Vec<NewOrderItem>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOrderStatus {
    pub order_id: OrderId,
    pub new_status: OrderStatus,
    pub expected_version: Option<u64>,
    pub estimated_pickup_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRestaurant {
    pub owner_id: UserId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: Option<String>,
    pub cuisine_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Identity the profile belongs to (the token subject); `None` allocates
    /// a fresh id.
    pub user_id: Option<UserId>,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

/// Outcome of an order command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub order_number: Option<OrderNumber>,
    pub status: OrderStatus,
    pub total_amount: Option<Money>,
    pub item_count: usize,
    pub estimated_pickup_time: Option<chrono::DateTime<chrono::Utc>>,
    pub version: u64,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id_typed(),
            order_number: order.order_number().cloned(),
            status: order.status(),
            total_amount: order.total_amount(),
            item_count: order.items().len(),
            estimated_pickup_time: order.estimated_pickup_time(),
            version: order.version(),
        }
    }
}

/// Application service running every ordering-platform command.
///
/// Repositories are injected as trait objects so the same service runs on the
/// in-memory adapters (tests, dev) and on Postgres.
pub struct OrderingService<B> {
    orders: Arc<dyn OrderRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
    users: Arc<dyn UserRepository>,
    bus: B,
    order_numbers: OrderNumberGenerator<Arc<dyn OrderRepository>>,
    clock: Arc<dyn Clock>,
}

impl<B> core::fmt::Debug for OrderingService<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderingService")
            .field("order_numbers", &self.order_numbers)
            .finish_non_exhaustive()
    }
}

impl<B> OrderingService<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        restaurants: Arc<dyn RestaurantRepository>,
        users: Arc<dyn UserRepository>,
        bus: B,
    ) -> Self {
        let order_numbers = OrderNumberGenerator::new(orders.clone());
        Self {
            orders,
            restaurants,
            users,
            bus,
            order_numbers,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock used to stamp commands.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_order_numbers(
        mut self,
        order_numbers: OrderNumberGenerator<Arc<dyn OrderRepository>>,
    ) -> Self {
        self.order_numbers = order_numbers;
        self
    }

    pub fn with_max_order_number_attempts(mut self, max_attempts: u32) -> Self {
        self.order_numbers = self.order_numbers.with_max_attempts(max_attempts);
        self
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn order_repository(&self) -> &Arc<dyn OrderRepository> {
        &self.orders
    }

    // ─────────────────────────────────────────────────────────────────────
    // Orders
    // ─────────────────────────────────────────────────────────────────────

    /// Place an order for an active user at a restaurant accepting orders.
    pub async fn create_order(&self, request: PlaceOrder) -> Result<OrderSummary, DispatchError> {
        let user = self.load_user(request.user_id).await?;
        user.ensure_can_order()?;

        let restaurant = self.load_restaurant(request.restaurant_id).await?;
        let accepting = restaurant.accepting_orders()?;

        let items = request
            .items
            .into_iter()
            .map(NewOrderItem::into_item)
            .collect::<Result<Vec<_>, _>>()?;

        let order_number = self.order_numbers.generate().await?;
        let order_id = OrderId::new(AggregateId::new());
        let command = OrderCommand::CreateOrder(CreateOrder {
            order_id,
            order_number,
            user_id: request.user_id,
            restaurant: accepting,
            items,
            special_instructions: request.special_instructions,
            occurred_at: self.clock.now(),
        });

        let order = self
            .dispatch(&*self.orders, order_id, command, Order::empty)
            .await?;
        Ok(OrderSummary::from(&order))
    }

    pub async fn add_order_item(
        &self,
        order_id: OrderId,
        item: NewOrderItem,
    ) -> Result<OrderSummary, DispatchError> {
        let command = OrderCommand::AddOrderItem(AddOrderItem {
            order_id,
            item: item.into_item()?,
            occurred_at: self.clock.now(),
        });
        let order = self
            .dispatch(&*self.orders, order_id, command, Order::empty)
            .await?;
        Ok(OrderSummary::from(&order))
    }

    pub async fn update_order_status(
        &self,
        request: ChangeOrderStatus,
    ) -> Result<OrderSummary, DispatchError> {
        let command = OrderCommand::UpdateOrderStatus(UpdateOrderStatus {
            order_id: request.order_id,
            new_status: request.new_status,
            expected_version: request.expected_version,
            estimated_pickup_time: request.estimated_pickup_time,
            occurred_at: self.clock.now(),
        });
        let order = self
            .dispatch(&*self.orders, request.order_id, command, Order::empty)
            .await?;
        Ok(OrderSummary::from(&order))
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DispatchError> {
        self.orders
            .find_by_id(&order_id)
            .await?
            .ok_or(DispatchError::NotFound)
    }

    pub async fn find_order_by_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Order, DispatchError> {
        self.orders
            .find_by_order_number(order_number)
            .await?
            .ok_or(DispatchError::NotFound)
    }

    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, DispatchError> {
        Ok(self.orders.find_by_user_id(user_id).await?)
    }

    pub async fn orders_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Order>, DispatchError> {
        Ok(self.orders.find_by_restaurant_id(restaurant_id).await?)
    }

    pub async fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, DispatchError> {
        Ok(self.orders.find_by_status(status).await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Restaurants
    // ─────────────────────────────────────────────────────────────────────

    /// Owner self-registration; the restaurant starts out `PENDING`.
    pub async fn register_restaurant(
        &self,
        request: NewRestaurant,
    ) -> Result<Restaurant, DispatchError> {
        let restaurant_id = RestaurantId::new(AggregateId::new());
        let command = RestaurantCommand::RegisterRestaurant(RegisterRestaurant {
            restaurant_id,
            owner_id: request.owner_id,
            name: request.name,
            email: request.email,
            address: request.address,
            phone: request.phone,
            cuisine_type: request.cuisine_type,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.restaurants, restaurant_id, command, Restaurant::empty)
            .await
    }

    pub async fn approve_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DispatchError> {
        let command = RestaurantCommand::ApproveRestaurant(ApproveRestaurant {
            restaurant_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.restaurants, restaurant_id, command, Restaurant::empty)
            .await
    }

    pub async fn block_restaurant(
        &self,
        restaurant_id: RestaurantId,
        reason: impl Into<String>,
    ) -> Result<Restaurant, DispatchError> {
        let command = RestaurantCommand::BlockRestaurant(BlockRestaurant {
            restaurant_id,
            reason: reason.into(),
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.restaurants, restaurant_id, command, Restaurant::empty)
            .await
    }

    pub async fn open_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DispatchError> {
        let command = RestaurantCommand::OpenRestaurant(OpenRestaurant {
            restaurant_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.restaurants, restaurant_id, command, Restaurant::empty)
            .await
    }

    pub async fn close_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DispatchError> {
        let command = RestaurantCommand::CloseRestaurant(CloseRestaurant {
            restaurant_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.restaurants, restaurant_id, command, Restaurant::empty)
            .await
    }

    pub async fn deactivate_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DispatchError> {
        let command = RestaurantCommand::DeactivateRestaurant(DeactivateRestaurant {
            restaurant_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.restaurants, restaurant_id, command, Restaurant::empty)
            .await
    }

    pub async fn reactivate_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DispatchError> {
        let command = RestaurantCommand::ReactivateRestaurant(ReactivateRestaurant {
            restaurant_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.restaurants, restaurant_id, command, Restaurant::empty)
            .await
    }

    pub async fn rate_restaurant(
        &self,
        restaurant_id: RestaurantId,
        rating: f32,
    ) -> Result<Restaurant, DispatchError> {
        let command = RestaurantCommand::RateRestaurant(RateRestaurant {
            restaurant_id,
            rating,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.restaurants, restaurant_id, command, Restaurant::empty)
            .await
    }

    pub async fn get_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DispatchError> {
        self.load_restaurant(restaurant_id).await
    }

    pub async fn restaurants_by_owner(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<Restaurant>, DispatchError> {
        Ok(self.restaurants.find_by_owner(owner_id).await?)
    }

    pub async fn restaurants_by_status(
        &self,
        status: RestaurantStatus,
    ) -> Result<Vec<Restaurant>, DispatchError> {
        Ok(self.restaurants.find_by_status(status).await?)
    }

    pub async fn accepting_restaurants(&self) -> Result<Vec<Restaurant>, DispatchError> {
        Ok(self.restaurants.find_accepting_orders().await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    pub async fn register_user(&self, request: NewUser) -> Result<User, DispatchError> {
        let email = Email::parse(&request.email)?;
        if self.users.exists_by_email(&email).await? {
            return Err(DispatchError::Duplicate(format!(
                "a user with email '{email}' already exists"
            )));
        }

        let user_id = request.user_id.unwrap_or_default();
        let command = UserCommand::RegisterUser(RegisterUser {
            user_id,
            email: email.as_str().to_string(),
            full_name: request.full_name,
            phone: request.phone,
            role: request.role,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.users, user_id, command, User::empty).await
    }

    pub async fn deactivate_user(&self, user_id: UserId) -> Result<User, DispatchError> {
        let command = UserCommand::DeactivateUser(DeactivateUser {
            user_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.users, user_id, command, User::empty).await
    }

    /// Favorites may only point at registered restaurants.
    pub async fn add_favorite(
        &self,
        user_id: UserId,
        restaurant_id: RestaurantId,
    ) -> Result<User, DispatchError> {
        self.load_restaurant(restaurant_id).await?;
        let command = UserCommand::AddFavorite(AddFavorite {
            user_id,
            restaurant_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.users, user_id, command, User::empty).await
    }

    pub async fn remove_favorite(
        &self,
        user_id: UserId,
        restaurant_id: RestaurantId,
    ) -> Result<User, DispatchError> {
        let command = UserCommand::RemoveFavorite(RemoveFavorite {
            user_id,
            restaurant_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(&*self.users, user_id, command, User::empty).await
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, DispatchError> {
        self.load_user(user_id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<User, DispatchError> {
        let email = Email::parse(email)?;
        self.users
            .find_by_email(&email)
            .await?
            .ok_or(DispatchError::NotFound)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pipeline
    // ─────────────────────────────────────────────────────────────────────

    async fn load_user(&self, user_id: UserId) -> Result<User, DispatchError> {
        self.users
            .find_by_id(&user_id)
            .await?
            .filter(User::is_registered)
            .ok_or(DispatchError::NotFound)
    }

    async fn load_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant, DispatchError> {
        self.restaurants
            .find_by_id(&restaurant_id)
            .await?
            .filter(Restaurant::is_registered)
            .ok_or(DispatchError::NotFound)
    }

    /// Load, decide, evolve, save, then publish.
    ///
    /// Returns the aggregate as committed. A command that decides no events
    /// (an idempotent no-op) saves and publishes nothing.
    async fn dispatch<A, R>(
        &self,
        repository: &R,
        id: A::Id,
        command: A::Command,
        make_aggregate: impl FnOnce(A::Id) -> A,
    ) -> Result<A, DispatchError>
    where
        A: StoredAggregate + Aggregate<Error = DomainError>,
        A::Event: Event + Serialize,
        R: Repository<A> + ?Sized,
    {
        let mut aggregate = match repository.find_by_id(&id).await? {
            Some(existing) => existing,
            None => make_aggregate(id),
        };
        let loaded_version = aggregate.version();

        let events = execute(&mut aggregate, &command)?;
        if events.is_empty() {
            return Ok(aggregate);
        }

        repository
            .save(&aggregate, ExpectedVersion::Exact(loaded_version))
            .await?;

        info!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %A::storage_uuid(aggregate.id()),
            version = aggregate.version(),
            events = events.len(),
            "command committed"
        );

        self.publish_committed(&aggregate, loaded_version, &events);
        Ok(aggregate)
    }

    fn publish_committed<A>(&self, aggregate: &A, loaded_version: u64, events: &[A::Event])
    where
        A: StoredAggregate + Aggregate,
        A::Event: Event + Serialize,
    {
        let aggregate_id = A::aggregate_id(aggregate.id());

        for (offset, event) in (1u64..).zip(events) {
            let sequence_number = loaded_version + offset;
            let envelope = match EventEnvelope::from_typed(
                aggregate_id,
                A::AGGREGATE_TYPE,
                sequence_number,
                event,
            ) {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(
                        event_type = event.event_type(),
                        %aggregate_id,
                        error = %err,
                        "failed to serialize committed event; not published"
                    );
                    continue;
                }
            };

            if let Err(err) = self.bus.publish(envelope) {
                warn!(
                    event_type = event.event_type(),
                    %aggregate_id,
                    sequence_number,
                    error = ?err,
                    "failed to publish committed event"
                );
            }
        }
    }
}
