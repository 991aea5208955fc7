//! Service wiring: repositories, the bus, the ordering service and the
//! projection workers that keep the read models current.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

use tablefront_accounts::UserRepository;
use tablefront_core::{RepositoryError, UserId};
use tablefront_events::{EventEnvelope, InMemoryEventBus};
use tablefront_infra::OrderingService;
use tablefront_infra::persistence::{
    InMemoryOrderRepository, InMemoryRestaurantRepository, InMemoryUserRepository,
    PostgresOrderRepository, PostgresRestaurantRepository, PostgresUserRepository, migrate,
};
use tablefront_infra::projections::{AnalyticsReadModel, Notification, NotificationsProjection};
use tablefront_infra::read_model::InMemoryReadModelStore;
use tablefront_infra::workers::{ProjectionWorker, WorkerHandle};
use tablefront_orders::OrderRepository;
use tablefront_restaurants::RestaurantRepository;

use crate::config::AppConfig;

pub type EnvelopeBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type NotificationInbox =
    NotificationsProjection<InMemoryReadModelStore<UserId, Vec<Notification>>>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] RepositoryError),

    #[error("failed to spawn projection worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub ordering: OrderingService<EnvelopeBus>,
    pub notifications: Arc<NotificationInbox>,
    pub analytics: Arc<AnalyticsReadModel>,
    workers: Vec<WorkerHandle>,
}

impl AppServices {
    pub fn worker_names(&self) -> Vec<&'static str> {
        self.workers.iter().map(WorkerHandle::name).collect()
    }
}

struct Repositories {
    orders: Arc<dyn OrderRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
    users: Arc<dyn UserRepository>,
}

async fn build_repositories(config: &AppConfig) -> Result<Repositories, StartupError> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            migrate(&pool).await?;
            info!("using postgres repositories");

            let pool = Arc::new(pool);
            Ok(Repositories {
                orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
                restaurants: Arc::new(PostgresRestaurantRepository::new(pool.clone())),
                users: Arc::new(PostgresUserRepository::new(pool)),
            })
        }
        None => {
            info!("DATABASE_URL not set; using in-memory repositories");
            Ok(Repositories {
                orders: Arc::new(InMemoryOrderRepository::new()),
                restaurants: Arc::new(InMemoryRestaurantRepository::new()),
                users: Arc::new(InMemoryUserRepository::new()),
            })
        }
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let repos = build_repositories(config).await?;
    let bus: EnvelopeBus = Arc::new(InMemoryEventBus::new());

    let notifications = Arc::new(NotificationsProjection::new(InMemoryReadModelStore::new()));
    let analytics = Arc::new(AnalyticsReadModel::new());

    // Subscribe before the service exists so no event is missed.
    let inbox = notifications.clone();
    let notifications_worker = ProjectionWorker::spawn(
        "notifications-projection",
        &bus,
        move |envelope: EventEnvelope<JsonValue>| inbox.apply_envelope(&envelope),
    )?;
    let counters = analytics.clone();
    let analytics_worker = ProjectionWorker::spawn(
        "analytics-projection",
        &bus,
        move |envelope: EventEnvelope<JsonValue>| counters.apply_envelope(&envelope),
    )?;

    let ordering = OrderingService::new(repos.orders, repos.restaurants, repos.users, bus)
        .with_max_order_number_attempts(config.order_number_max_attempts);

    Ok(AppServices {
        ordering,
        notifications,
        analytics,
        workers: vec![notifications_worker, analytics_worker],
    })
}
