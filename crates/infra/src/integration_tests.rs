//! Integration tests for the full ordering pipeline.
//!
//! Tests: Command → Repository → EventBus → Projection → ReadModel
//!
//! Verifies:
//! - Order lifecycle scenarios end to end
//! - Events are published only after commit, never for rejected commands
//! - Optimistic concurrency conflicts are detected
//! - Notifications and analytics follow the published events

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use serde_json::Value as JsonValue;
    use uuid::Uuid;

    use tablefront_accounts::UserRole;
    use tablefront_core::{AggregateRoot, ExpectedVersion, Money, Repository, UserId};
    use tablefront_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription, execute};
    use tablefront_orders::{
        MenuItemId, Order, OrderCommand, OrderId, OrderStatus, UpdateOrderStatus,
    };
    use tablefront_restaurants::{Restaurant, RestaurantId};

    use crate::ordering_service::{
        ChangeOrderStatus, DispatchError, NewOrderItem, NewRestaurant, NewUser, OrderSummary,
        OrderingService, PlaceOrder,
    };
    use crate::persistence::{
        InMemoryOrderRepository, InMemoryRestaurantRepository, InMemoryUserRepository,
    };
    use crate::projections::{AnalyticsReadModel, NotificationKind, NotificationsProjection};
    use crate::read_model::InMemoryReadModelStore;
    use crate::workers::ProjectionWorker;

    type Envelope = EventEnvelope<JsonValue>;
    type Bus = Arc<InMemoryEventBus<Envelope>>;

    struct Harness {
        service: OrderingService<Bus>,
        orders: Arc<InMemoryOrderRepository>,
    }

    fn setup() -> Harness {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let service = OrderingService::new(
            orders.clone(),
            Arc::new(InMemoryRestaurantRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryEventBus::new()),
        );
        Harness { service, orders }
    }

    async fn register_user<B>(service: &OrderingService<B>, email: &str, role: UserRole) -> UserId
    where
        B: EventBus<Envelope>,
    {
        let user = service
            .register_user(NewUser {
                user_id: None,
                email: email.to_string(),
                full_name: "Test User".to_string(),
                phone: None,
                role,
            })
            .await
            .unwrap();
        *user.id()
    }

    /// Registered, approved and open.
    async fn accepting_restaurant<B>(service: &OrderingService<B>, owner_id: UserId) -> RestaurantId
    where
        B: EventBus<Envelope>,
    {
        let restaurant = service
            .register_restaurant(NewRestaurant {
                owner_id,
                name: "Trattoria Roma".to_string(),
                email: "roma@example.com".to_string(),
                address: "12 Via Appia".to_string(),
                phone: Some("+39 06 123456".to_string()),
                cuisine_type: Some("italian".to_string()),
            })
            .await
            .unwrap();
        let id = restaurant.id_typed();
        service.approve_restaurant(id).await.unwrap();
        service.open_restaurant(id).await.unwrap();
        id
    }

    fn item(name: &str, price: &str, quantity: u32) -> NewOrderItem {
        NewOrderItem {
            menu_item_id: MenuItemId(Uuid::now_v7()),
            name: name.to_string(),
            unit_price: Money::parse(price, "EUR").unwrap(),
            quantity,
            notes: None,
        }
    }

    async fn place_order<B>(
        service: &OrderingService<B>,
        user_id: UserId,
        restaurant_id: RestaurantId,
    ) -> Result<OrderSummary, DispatchError>
    where
        B: EventBus<Envelope>,
    {
        service
            .create_order(PlaceOrder {
                user_id,
                restaurant_id,
                items: vec![item("Margherita", "5.00", 2), item("Tiramisu", "3.50", 1)],
                special_instructions: Some("  no basil  ".to_string()),
            })
            .await
    }

    fn status(order_id: OrderId, new_status: OrderStatus) -> ChangeOrderStatus {
        ChangeOrderStatus {
            order_id,
            new_status,
            expected_version: None,
            estimated_pickup_time: None,
        }
    }

    fn drain(sub: &Subscription<Envelope>) -> Vec<Envelope> {
        std::iter::from_fn(|| sub.try_recv().ok()).collect()
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[tokio::test]
    async fn order_total_is_computed_from_items() {
        let Harness { service, .. } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;

        let summary = place_order(&service, customer, restaurant).await.unwrap();

        assert_eq!(summary.status, OrderStatus::Pending);
        assert_eq!(summary.total_amount, Some(Money::parse("13.50", "EUR").unwrap()));
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.version, 1);
        assert!(summary.order_number.is_some_and(|n| n.as_str().starts_with("ORD-")));

        let order = service.get_order(summary.order_id).await.unwrap();
        assert_eq!(order.special_instructions(), Some("no basil"));
        assert_eq!(order.restaurant_owner_id(), Some(owner));
    }

    #[tokio::test]
    async fn confirmed_order_cannot_jump_to_completed() {
        let Harness { service, .. } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;
        let order_id = place_order(&service, customer, restaurant).await.unwrap().order_id;

        service
            .update_order_status(status(order_id, OrderStatus::Confirmed))
            .await
            .unwrap();
        let err = service
            .update_order_status(status(order_id, OrderStatus::Completed))
            .await
            .unwrap_err();

        match err {
            DispatchError::InvalidTransition { from, to } => {
                assert_eq!(from, "CONFIRMED");
                assert_eq!(to, "COMPLETED");
            }
            other => panic!("Expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(
            service.get_order(order_id).await.unwrap().status(),
            OrderStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn blocked_restaurant_rejects_orders_and_publishes_nothing() {
        let Harness { service, orders } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;
        service
            .block_restaurant(restaurant, "failed inspection")
            .await
            .unwrap();

        let sub = service.bus().subscribe();
        let err = place_order(&service, customer, restaurant).await.unwrap_err();

        match err {
            DispatchError::Validation(msg) => assert!(msg.contains("not accepting orders")),
            other => panic!("Expected Validation, got {other:?}"),
        }
        assert!(orders.is_empty());
        assert!(drain(&sub).is_empty());
    }

    #[tokio::test]
    async fn stale_caller_version_is_a_concurrent_modification() {
        let Harness { service, .. } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;
        let order_id = place_order(&service, customer, restaurant).await.unwrap().order_id;

        let confirm = ChangeOrderStatus {
            expected_version: Some(1),
            ..status(order_id, OrderStatus::Confirmed)
        };
        let cancel = ChangeOrderStatus {
            expected_version: Some(1),
            ..status(order_id, OrderStatus::Cancelled)
        };

        service.update_order_status(confirm).await.unwrap();
        let err = service.update_order_status(cancel).await.unwrap_err();

        assert!(matches!(err, DispatchError::ConcurrentModification(_)));
        assert_eq!(
            service.get_order(order_id).await.unwrap().status(),
            OrderStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn second_writer_of_the_same_version_loses() {
        let Harness { service, orders } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;
        let order_id = place_order(&service, customer, restaurant).await.unwrap().order_id;

        // Two handlers load the same version and decide independently.
        let mut first: Order = orders.find_by_id(&order_id).await.unwrap().unwrap();
        let mut second = first.clone();
        let loaded = first.version();

        let decide = |new_status| {
            OrderCommand::UpdateOrderStatus(UpdateOrderStatus {
                order_id,
                new_status,
                expected_version: None,
                estimated_pickup_time: None,
                occurred_at: chrono::Utc::now(),
            })
        };
        execute(&mut first, &decide(OrderStatus::Confirmed)).unwrap();
        execute(&mut second, &decide(OrderStatus::Cancelled)).unwrap();

        orders
            .save(&first, ExpectedVersion::Exact(loaded))
            .await
            .unwrap();
        let err = orders
            .save(&second, ExpectedVersion::Exact(loaded))
            .await
            .unwrap_err();

        assert!(matches!(
            DispatchError::from(err),
            DispatchError::ConcurrentModification(_)
        ));
        assert_eq!(
            service.get_order(order_id).await.unwrap().status(),
            OrderStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn events_are_published_after_the_state_is_saved() {
        let Harness { service, orders } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;

        let sub = service.bus().subscribe();
        let order_id = place_order(&service, customer, restaurant).await.unwrap().order_id;
        service
            .update_order_status(status(order_id, OrderStatus::Confirmed))
            .await
            .unwrap();

        let published = drain(&sub);
        let types: Vec<_> = published.iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(types, ["orders.order.created", "orders.order.status_changed"]);

        let stored = orders.find_by_id(&order_id).await.unwrap().unwrap();
        for envelope in &published {
            assert_eq!(envelope.aggregate_id(), order_id.0);
            assert_eq!(envelope.aggregate_type(), Order::AGGREGATE_TYPE);
            assert!(envelope.sequence_number() <= stored.version());
        }
        assert_eq!(published[1].sequence_number(), 2);
    }

    #[tokio::test]
    async fn rejected_commands_publish_nothing() {
        let Harness { service, .. } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;
        let order_id = place_order(&service, customer, restaurant).await.unwrap().order_id;

        let sub = service.bus().subscribe();
        assert!(
            service
                .update_order_status(status(order_id, OrderStatus::Completed))
                .await
                .is_err()
        );
        assert!(service.approve_restaurant(restaurant).await.is_err());
        assert!(
            service
                .add_order_item(order_id, item("Water", "1.00", 0))
                .await
                .is_err()
        );

        assert!(drain(&sub).is_empty());
    }

    #[derive(Debug)]
    struct UnreachableBus;

    impl EventBus<Envelope> for UnreachableBus {
        type Error = String;

        fn publish(&self, _message: Envelope) -> Result<(), Self::Error> {
            Err("broker unreachable".to_string())
        }

        fn subscribe(&self) -> Subscription<Envelope> {
            let (_tx, rx) = std::sync::mpsc::channel();
            Subscription::new(rx)
        }
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_committed_command() {
        let users = Arc::new(InMemoryUserRepository::new());
        let service = OrderingService::new(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryRestaurantRepository::new()),
            users.clone(),
            UnreachableBus,
        );

        let user_id = register_user(&service, "ana@example.com", UserRole::Customer).await;

        assert!(users.find_by_id(&user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn items_can_only_be_added_while_pending() {
        let Harness { service, .. } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;
        let order_id = place_order(&service, customer, restaurant).await.unwrap().order_id;

        let summary = service
            .add_order_item(order_id, item("Espresso", "1.20", 2))
            .await
            .unwrap();
        assert_eq!(summary.total_amount, Some(Money::parse("15.90", "EUR").unwrap()));
        assert_eq!(summary.item_count, 3);

        service
            .update_order_status(status(order_id, OrderStatus::Confirmed))
            .await
            .unwrap();
        let err = service
            .add_order_item(order_id, item("Espresso", "1.20", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidState(_)));
    }

    #[tokio::test]
    async fn deactivated_users_cannot_order() {
        let Harness { service, .. } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;
        service.deactivate_user(customer).await.unwrap();

        let err = place_order(&service, customer, restaurant).await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));

        let err = place_order(&service, UserId::new(), restaurant).await.unwrap_err();
        assert_eq!(err, DispatchError::NotFound);
    }

    #[tokio::test]
    async fn favorites_must_reference_registered_restaurants() {
        let Harness { service, .. } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;

        let missing = RestaurantId::new(tablefront_core::AggregateId::new());
        assert_eq!(
            service.add_favorite(customer, missing).await.unwrap_err(),
            DispatchError::NotFound
        );

        let user = service.add_favorite(customer, restaurant).await.unwrap();
        assert_eq!(user.favorites(), &[restaurant]);
        let again = service.add_favorite(customer, restaurant).await.unwrap();
        assert_eq!(again.version(), user.version());

        let user = service.remove_favorite(customer, restaurant).await.unwrap();
        assert!(user.favorites().is_empty());
    }

    #[tokio::test]
    async fn finders_return_newest_first() {
        let Harness { service, .. } = setup();
        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;

        let first = place_order(&service, customer, restaurant).await.unwrap();
        let second = place_order(&service, customer, restaurant).await.unwrap();

        let mine: Vec<_> = service
            .orders_for_user(customer)
            .await
            .unwrap()
            .iter()
            .map(|o| o.id_typed())
            .collect();
        assert_eq!(mine, [second.order_id, first.order_id]);

        let number = second.order_number.unwrap();
        assert_eq!(
            service.find_order_by_number(&number).await.unwrap().id_typed(),
            second.order_id
        );
        assert_eq!(service.orders_for_restaurant(restaurant).await.unwrap().len(), 2);
        assert_eq!(service.orders_by_status(OrderStatus::Pending).await.unwrap().len(), 2);

        let accepting: Vec<Restaurant> = service.accepting_restaurants().await.unwrap();
        assert_eq!(accepting.len(), 1);
        service.close_restaurant(restaurant).await.unwrap();
        assert!(service.accepting_restaurants().await.unwrap().is_empty());
        assert_eq!(service.restaurants_by_owner(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn projections_follow_the_order_lifecycle() {
        let Harness { service, .. } = setup();
        let notifications = Arc::new(NotificationsProjection::new(InMemoryReadModelStore::new()));
        let analytics = Arc::new(AnalyticsReadModel::new());

        let n = notifications.clone();
        let notifications_worker =
            ProjectionWorker::spawn("notifications", service.bus(), move |env: Envelope| {
                n.apply_envelope(&env)
            })
            .unwrap();
        let a = analytics.clone();
        let analytics_worker =
            ProjectionWorker::spawn("analytics", service.bus(), move |env: Envelope| {
                a.apply_envelope(&env)
            })
            .unwrap();

        let owner = register_user(&service, "owner@example.com", UserRole::RestaurantOwner).await;
        let customer = register_user(&service, "eve@example.com", UserRole::Customer).await;
        let restaurant = accepting_restaurant(&service, owner).await;
        let summary = place_order(&service, customer, restaurant).await.unwrap();
        for next in [OrderStatus::Confirmed, OrderStatus::Ready, OrderStatus::Completed] {
            service
                .update_order_status(status(summary.order_id, next))
                .await
                .unwrap();
        }

        // 2 users + 3 restaurant events + 1 created + 3 status changes.
        wait_until(|| analytics.applied() >= 9);
        wait_until(|| notifications.for_user(customer).len() >= 4);
        notifications_worker.shutdown();
        analytics_worker.shutdown();

        let snapshot = analytics.snapshot();
        assert_eq!(snapshot.total_orders, 1);
        assert_eq!(snapshot.orders_by_status.get("COMPLETED"), Some(&1));
        assert_eq!(snapshot.orders_by_status.get("PENDING"), Some(&0));
        assert_eq!(snapshot.restaurants_by_status.get("APPROVED"), Some(&1));
        assert_eq!(snapshot.registered_users, 2);
        assert_eq!(
            snapshot.revenue_by_restaurant[&restaurant.to_string()]["EUR"],
            Money::parse("13.50", "EUR").unwrap()
        );

        let inbox = notifications.for_user(customer);
        assert!(inbox.iter().any(|n| n.kind == NotificationKind::OrderPlaced));
        assert!(inbox.iter().any(|n| n.message.contains("is now READY")));

        let owner_inbox = notifications.for_user(owner);
        assert!(owner_inbox.iter().any(|n| n.kind == NotificationKind::RestaurantApproved));
        assert!(owner_inbox.iter().any(|n| n.kind == NotificationKind::OrderReceived));
    }
}
