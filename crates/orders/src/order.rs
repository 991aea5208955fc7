use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tablefront_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, Money, UserId,
};
use tablefront_events::Event;
use tablefront_restaurants::{AcceptingRestaurant, RestaurantId};

use crate::item::OrderItem;
use crate::number::OrderNumber;
use crate::status::OrderStatus;

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for OrderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Aggregate root: Order (owns its items).
///
/// `total_amount` is never supplied by callers; it is recomputed from the
/// items whenever they change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: Option<OrderNumber>,
    user_id: Option<UserId>,
    restaurant_id: Option<RestaurantId>,
    restaurant_owner_id: Option<UserId>,
    status: OrderStatus,
    total_amount: Option<Money>,
    special_instructions: Option<String>,
    items: Vec<OrderItem>,
    estimated_pickup_time: Option<DateTime<Utc>>,
    actual_pickup_time: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    pub const AGGREGATE_TYPE: &'static str = "orders.order";

    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            order_number: None,
            user_id: None,
            restaurant_id: None,
            restaurant_owner_id: None,
            status: OrderStatus::Pending,
            total_amount: None,
            special_instructions: None,
            items: Vec::new(),
            estimated_pickup_time: None,
            actual_pickup_time: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> Option<&OrderNumber> {
        self.order_number.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.restaurant_id
    }

    pub fn restaurant_owner_id(&self) -> Option<UserId> {
        self.restaurant_owner_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Option<Money> {
        self.total_amount
    }

    pub fn special_instructions(&self) -> Option<&str> {
        self.special_instructions.as_deref()
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn estimated_pickup_time(&self) -> Option<DateTime<Utc>> {
        self.estimated_pickup_time
    }

    pub fn actual_pickup_time(&self) -> Option<DateTime<Utc>> {
        self.actual_pickup_time
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_modifiable(&self) -> bool {
        self.created && self.status == OrderStatus::Pending
    }

    /// Sum of item subtotals; fails on mixed currencies or an empty list.
    pub fn compute_total(items: &[OrderItem]) -> Result<Money, DomainError> {
        let first = items
            .first()
            .ok_or_else(|| DomainError::validation("an order needs at least one item"))?;
        let currency = first.unit_price().currency();

        items.iter().try_fold(Money::zero(currency), |acc, item| {
            if item.unit_price().currency() != currency {
                return Err(DomainError::validation(format!(
                    "all items must be priced in {currency}, '{}' is in {}",
                    item.menu_item_name(),
                    item.unit_price().currency()
                )));
            }
            acc.add(&item.subtotal()?)
        })
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder.
///
/// Carries the restaurant's acceptance proof rather than the restaurant id,
/// so the command cannot be built for a restaurant that failed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub restaurant: AcceptingRestaurant,
    pub items: Vec<OrderItem>,
    pub special_instructions: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddOrderItem (only while Pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOrderItem {
    pub order_id: OrderId,
    pub item: OrderItem,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateOrderStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderStatus {
    pub order_id: OrderId,
    pub new_status: OrderStatus,
    /// Version the caller last saw; checked before any decision.
    pub expected_version: Option<u64>,
    /// Only accepted together with a move to `Confirmed`.
    pub estimated_pickup_time: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCommand {
    CreateOrder(CreateOrder),
    AddOrderItem(AddOrderItem),
    UpdateOrderStatus(UpdateOrderStatus),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub restaurant_owner_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    /// Number of order lines.
    pub item_count: usize,
    pub special_instructions: Option<String>,
    pub estimated_pickup_time: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemAdded {
    pub order_id: OrderId,
    pub item: OrderItem,
    pub new_total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub restaurant_owner_id: UserId,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub total_amount: Money,
    pub estimated_pickup_time: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    OrderItemAdded(OrderItemAdded),
    OrderStatusChanged(OrderStatusChanged),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "orders.order.created",
            OrderEvent::OrderItemAdded(_) => "orders.order.item_added",
            OrderEvent::OrderStatusChanged(_) => "orders.order.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(e) => e.occurred_at,
            OrderEvent::OrderItemAdded(e) => e.occurred_at,
            OrderEvent::OrderStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.order_number = Some(e.order_number.clone());
                self.user_id = Some(e.user_id);
                self.restaurant_id = Some(e.restaurant_id);
                self.restaurant_owner_id = Some(e.restaurant_owner_id);
                self.status = OrderStatus::Pending;
                self.items = e.items.clone();
                self.total_amount = Some(e.total_amount);
                self.special_instructions = e.special_instructions.clone();
                self.estimated_pickup_time = e.estimated_pickup_time;
                self.actual_pickup_time = None;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::OrderItemAdded(e) => {
                self.items.push(e.item.clone());
                self.total_amount = Some(e.new_total);
            }
            OrderEvent::OrderStatusChanged(e) => {
                self.status = e.new_status;
                if e.estimated_pickup_time.is_some() {
                    self.estimated_pickup_time = e.estimated_pickup_time;
                }
                if e.new_status == OrderStatus::Completed {
                    self.actual_pickup_time = Some(e.occurred_at);
                }
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::CreateOrder(cmd) => self.handle_create(cmd),
            OrderCommand::AddOrderItem(cmd) => self.handle_add_item(cmd),
            OrderCommand::UpdateOrderStatus(cmd) => self.handle_update_status(cmd),
        }
    }
}

impl Order {
    fn ensure_created(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invalid_state("order already exists"));
        }

        for item in &cmd.items {
            item.validate()?;
        }
        let total_amount = Order::compute_total(&cmd.items)?;

        Ok(vec![OrderEvent::OrderCreated(OrderCreated {
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            user_id: cmd.user_id,
            restaurant_id: cmd.restaurant.restaurant_id(),
            restaurant_owner_id: cmd.restaurant.owner_id(),
            items: cmd.items.clone(),
            total_amount,
            item_count: cmd.items.len(),
            special_instructions: cmd
                .special_instructions
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            estimated_pickup_time: None,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_item(&self, cmd: &AddOrderItem) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;

        if !self.is_modifiable() {
            return Err(DomainError::invalid_state(format!(
                "items can only be added while the order is PENDING (currently {})",
                self.status
            )));
        }

        cmd.item.validate()?;
        let mut items = self.items.clone();
        items.push(cmd.item.clone());
        let new_total = Order::compute_total(&items)?;

        Ok(vec![OrderEvent::OrderItemAdded(OrderItemAdded {
            order_id: cmd.order_id,
            item: cmd.item.clone(),
            new_total,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(
        &self,
        cmd: &UpdateOrderStatus,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;

        if let Some(expected) = cmd.expected_version {
            ExpectedVersion::Exact(expected).check(self.version)?;
        }

        if !self.status.can_transition_to(cmd.new_status) {
            return Err(DomainError::invalid_transition(self.status, cmd.new_status));
        }

        if let Some(pickup) = cmd.estimated_pickup_time {
            if cmd.new_status != OrderStatus::Confirmed {
                return Err(DomainError::validation(
                    "an estimated pickup time can only be given when confirming",
                ));
            }
            if pickup <= cmd.occurred_at {
                return Err(DomainError::validation(
                    "estimated pickup time must be in the future",
                ));
            }
        }

        let (order_number, user_id, restaurant_id, restaurant_owner_id, total_amount) = match (
            &self.order_number,
            self.user_id,
            self.restaurant_id,
            self.restaurant_owner_id,
            self.total_amount,
        ) {
            (Some(n), Some(u), Some(r), Some(o), Some(t)) => (n.clone(), u, r, o, t),
            _ => return Err(DomainError::invalid_state("order is missing creation data")),
        };

        Ok(vec![OrderEvent::OrderStatusChanged(OrderStatusChanged {
            order_id: cmd.order_id,
            order_number,
            user_id,
            restaurant_id,
            restaurant_owner_id,
            previous_status: self.status,
            new_status: cmd.new_status,
            total_amount,
            estimated_pickup_time: cmd.estimated_pickup_time,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use tablefront_core::Currency;
    use tablefront_restaurants::{
        ApproveRestaurant, OpenRestaurant, RegisterRestaurant, Restaurant, RestaurantCommand,
    };
    use uuid::Uuid;

    use crate::item::{MenuItemId, OrderItemId};

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_order_number() -> OrderNumber {
        OrderNumber::parse("ORD-20260101120000-042").unwrap()
    }

    fn accepting_restaurant() -> AcceptingRestaurant {
        let id = RestaurantId::new(AggregateId::new());
        let mut r = Restaurant::empty(id);
        let commands = [
            RestaurantCommand::RegisterRestaurant(RegisterRestaurant {
                restaurant_id: id,
                owner_id: UserId::new(),
                name: "Chez Lea".to_string(),
                email: "owner@chezlea.fr".to_string(),
                address: "1 rue de la Paix".to_string(),
                phone: None,
                cuisine_type: None,
                occurred_at: test_time(),
            }),
            RestaurantCommand::ApproveRestaurant(ApproveRestaurant {
                restaurant_id: id,
                occurred_at: test_time(),
            }),
            RestaurantCommand::OpenRestaurant(OpenRestaurant {
                restaurant_id: id,
                occurred_at: test_time(),
            }),
        ];
        for cmd in &commands {
            for ev in r.handle(cmd).unwrap() {
                r.apply(&ev);
            }
        }
        r.accepting_orders().unwrap()
    }

    fn item(amount: &str, currency: &str, quantity: u32) -> OrderItem {
        OrderItem::new(
            OrderItemId::new(),
            MenuItemId(Uuid::now_v7()),
            "Dish",
            Money::parse(amount, currency).unwrap(),
            quantity,
            None,
        )
        .unwrap()
    }

    fn create_cmd(order_id: OrderId, items: Vec<OrderItem>) -> OrderCommand {
        OrderCommand::CreateOrder(CreateOrder {
            order_id,
            order_number: test_order_number(),
            user_id: UserId::new(),
            restaurant: accepting_restaurant(),
            items,
            special_instructions: Some("  no onions ".to_string()),
            occurred_at: test_time(),
        })
    }

    fn created_order() -> Order {
        let order_id = test_order_id();
        let mut order = Order::empty(order_id);
        let events = order
            .handle(&create_cmd(
                order_id,
                vec![item("5.00", "EUR", 2), item("3.50", "EUR", 1)],
            ))
            .unwrap();
        order.apply(&events[0]);
        order
    }

    fn status_cmd(order: &Order, new_status: OrderStatus) -> OrderCommand {
        OrderCommand::UpdateOrderStatus(UpdateOrderStatus {
            order_id: order.id_typed(),
            new_status,
            expected_version: None,
            estimated_pickup_time: None,
            occurred_at: test_time(),
        })
    }

    fn order_in(status: OrderStatus) -> Order {
        let path: &[OrderStatus] = match status {
            OrderStatus::Pending => &[],
            OrderStatus::Confirmed => &[OrderStatus::Confirmed],
            OrderStatus::Ready => &[OrderStatus::Confirmed, OrderStatus::Ready],
            OrderStatus::Completed => &[
                OrderStatus::Confirmed,
                OrderStatus::Ready,
                OrderStatus::Completed,
            ],
            OrderStatus::Cancelled => &[OrderStatus::Cancelled],
        };
        let mut order = created_order();
        for next in path {
            let events = order.handle(&status_cmd(&order, *next)).unwrap();
            order.apply(&events[0]);
        }
        assert_eq!(order.status(), status);
        order
    }

    #[test]
    fn create_order_computes_total_from_items() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);

        let events = order
            .handle(&create_cmd(
                order_id,
                vec![item("5.00", "EUR", 2), item("3.50", "EUR", 1)],
            ))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            OrderEvent::OrderCreated(e) => {
                assert_eq!(e.order_id, order_id);
                assert_eq!(e.total_amount, Money::parse("13.50", "EUR").unwrap());
                assert_eq!(e.total_amount.to_string(), "13.50 EUR");
                assert_eq!(e.item_count, 2);
                assert_eq!(e.special_instructions.as_deref(), Some("no onions"));
            }
            _ => panic!("Expected OrderCreated event"),
        }
    }

    #[test]
    fn created_order_is_pending_at_version_one() {
        let order = created_order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.version(), 1);
        assert_eq!(order.total_amount().unwrap().to_string(), "13.50 EUR");
        assert!(order.created_at().is_some());
    }

    #[test]
    fn empty_item_list_is_rejected() {
        let order_id = test_order_id();
        let err = Order::empty(order_id)
            .handle(&create_cmd(order_id, vec![]))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn mixed_currencies_are_rejected() {
        let order_id = test_order_id();
        let err = Order::empty(order_id)
            .handle(&create_cmd(
                order_id,
                vec![item("5.00", "EUR", 1), item("5.00", "USD", 1)],
            ))
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("EUR")),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn creating_twice_is_invalid_state() {
        let order = created_order();
        let err = order
            .handle(&create_cmd(order.id_typed(), vec![item("1", "EUR", 1)]))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn all_status_pairs_follow_the_transition_table() {
        let mut legal = 0;
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let order = order_in(from);
                let result = order.handle(&status_cmd(&order, to));

                if from.can_transition_to(to) {
                    legal += 1;
                    match result.unwrap().as_slice() {
                        [OrderEvent::OrderStatusChanged(e)] => {
                            assert_eq!(e.previous_status, from);
                            assert_eq!(e.new_status, to);
                        }
                        other => panic!("Expected one OrderStatusChanged, got {other:?}"),
                    }
                } else {
                    match result {
                        Err(DomainError::InvalidTransition { from: f, to: t }) => {
                            assert_eq!(f, from.to_string());
                            assert_eq!(t, to.to_string());
                        }
                        other => panic!("Expected InvalidTransition {from}->{to}, got {other:?}"),
                    }
                }
            }
        }
        assert_eq!(legal, 5);
    }

    #[test]
    fn confirmed_cannot_jump_to_completed() {
        let order = order_in(OrderStatus::Confirmed);
        let err = order
            .handle(&status_cmd(&order, OrderStatus::Completed))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_transition(OrderStatus::Confirmed, OrderStatus::Completed)
        );
    }

    #[test]
    fn completion_records_actual_pickup_time() {
        let order = order_in(OrderStatus::Completed);
        assert!(order.actual_pickup_time().is_some());
        assert_eq!(order.updated_at(), order.actual_pickup_time());
        assert_eq!(order.version(), 4);
    }

    #[test]
    fn confirmation_can_carry_pickup_estimate() {
        let mut order = created_order();
        let now = test_time();
        let pickup = now + Duration::minutes(25);
        let events = order
            .handle(&OrderCommand::UpdateOrderStatus(UpdateOrderStatus {
                order_id: order.id_typed(),
                new_status: OrderStatus::Confirmed,
                expected_version: Some(1),
                estimated_pickup_time: Some(pickup),
                occurred_at: now,
            }))
            .unwrap();
        order.apply(&events[0]);

        assert_eq!(order.estimated_pickup_time(), Some(pickup));
    }

    #[test]
    fn pickup_estimate_outside_confirmation_is_rejected() {
        let order = order_in(OrderStatus::Confirmed);
        let now = test_time();
        let err = order
            .handle(&OrderCommand::UpdateOrderStatus(UpdateOrderStatus {
                order_id: order.id_typed(),
                new_status: OrderStatus::Ready,
                expected_version: None,
                estimated_pickup_time: Some(now + Duration::minutes(5)),
                occurred_at: now,
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn stale_expected_version_is_a_concurrent_modification() {
        let order = order_in(OrderStatus::Confirmed);
        let err = order
            .handle(&OrderCommand::UpdateOrderStatus(UpdateOrderStatus {
                order_id: order.id_typed(),
                new_status: OrderStatus::Ready,
                expected_version: Some(1),
                estimated_pickup_time: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::ConcurrentModification(_)));
    }

    #[test]
    fn add_item_updates_total_while_pending() {
        let mut order = created_order();
        let events = order
            .handle(&OrderCommand::AddOrderItem(AddOrderItem {
                order_id: order.id_typed(),
                item: item("2.25", "EUR", 2),
                occurred_at: test_time(),
            }))
            .unwrap();
        order.apply(&events[0]);

        assert_eq!(order.items().len(), 3);
        assert_eq!(order.total_amount().unwrap().to_string(), "18.00 EUR");
    }

    #[test]
    fn add_item_after_pending_is_invalid_state() {
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let order = order_in(status);
            let err = order
                .handle(&OrderCommand::AddOrderItem(AddOrderItem {
                    order_id: order.id_typed(),
                    item: item("1.00", "EUR", 1),
                    occurred_at: test_time(),
                }))
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidState(_)), "{status}");
        }
    }

    #[test]
    fn commands_on_missing_order_are_not_found() {
        let order = Order::empty(test_order_id());
        let err = order
            .handle(&status_cmd(&order, OrderStatus::Confirmed))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order = created_order();
        let before = order.clone();

        let events1 = order.handle(&status_cmd(&order, OrderStatus::Confirmed)).unwrap();
        let _ = order.handle(&status_cmd(&order, OrderStatus::Completed));

        assert_eq!(order, before);
        assert_eq!(events1.len(), 1);
    }

    #[test]
    fn state_round_trips_through_json() {
        let order = order_in(OrderStatus::Ready);
        let json = serde_json::to_value(&order).unwrap();
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            .. ProptestConfig::default()
        })]

        #[test]
        fn total_equals_sum_of_subtotals(
            lines in prop::collection::vec((0i64..100_000, 1u32..50), 1..20)
        ) {
            let items: Vec<OrderItem> = lines
                .iter()
                .map(|(minor, qty)| {
                    OrderItem::new(
                        OrderItemId::new(),
                        MenuItemId(Uuid::now_v7()),
                        "Dish",
                        Money::from_minor(*minor, Currency::Eur).unwrap(),
                        *qty,
                        None,
                    )
                    .unwrap()
                })
                .collect();

            let order_id = test_order_id();
            let mut order = Order::empty(order_id);
            let events = order.handle(&create_cmd(order_id, items.clone())).unwrap();
            order.apply(&events[0]);

            let expected: i64 = lines.iter().map(|(minor, qty)| minor * i64::from(*qty)).sum();
            prop_assert_eq!(order.total_amount().unwrap().minor_units(), expected);
            prop_assert_eq!(order.items().len(), items.len());
        }
    }
}
