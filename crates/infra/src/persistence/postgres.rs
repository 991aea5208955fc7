//! Postgres-backed aggregate repositories.
//!
//! All aggregate types share one table. The full aggregate state is stored as
//! JSONB next to its version; finders filter on JSONB fields.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | RepositoryError |
//! |------------|---------------|-----------------|
//! | unique violation on `unique_key` | `23505` | `Duplicate` |
//! | unique violation on the primary key | `23505` | `Conflict` |
//! | any other | - | `Backend` |
//!
//! A zero-row `UPDATE ... WHERE version = $expected` is a `Conflict`.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use tablefront_accounts::{User, UserRepository};
use tablefront_core::{Email, ExpectedVersion, Repository, RepositoryError, RepositoryResult, UserId};
use tablefront_orders::{Order, OrderNumber, OrderNumberLookup, OrderRepository, OrderStatus};
use tablefront_restaurants::{Restaurant, RestaurantId, RestaurantRepository, RestaurantStatus};

use super::{StoredAggregate, newest_first};

pub type PostgresOrderRepository = PostgresRepository<Order>;
pub type PostgresRestaurantRepository = PostgresRepository<Restaurant>;
pub type PostgresUserRepository = PostgresRepository<User>;

const UNIQUE_KEY_CONSTRAINT: &str = "aggregates_unique_key";

/// Idempotent schema setup.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS aggregates (
    aggregate_type TEXT NOT NULL,
    aggregate_id   UUID NOT NULL,
    version        BIGINT NOT NULL CHECK (version > 0),
    unique_key     TEXT NULL,
    state          JSONB NOT NULL,
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (aggregate_type, aggregate_id),
    CONSTRAINT aggregates_unique_key UNIQUE (aggregate_type, unique_key)
);
CREATE INDEX IF NOT EXISTS aggregates_state_gin ON aggregates USING GIN (state);
"#;

/// Create the `aggregates` table if it does not exist yet.
pub async fn migrate(pool: &PgPool) -> RepositoryResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    Ok(())
}

/// Aggregate repository on a shared Postgres pool.
#[derive(Debug)]
pub struct PostgresRepository<A> {
    pool: Arc<PgPool>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> Clone for PostgresRepository<A> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _aggregate: PhantomData,
        }
    }
}

impl<A> PostgresRepository<A>
where
    A: StoredAggregate,
{
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            _aggregate: PhantomData,
        }
    }

    /// Load every aggregate of this type matching a JSONB containment filter.
    async fn find_where_contains(&self, filter: serde_json::Value) -> RepositoryResult<Vec<A>> {
        let rows = sqlx::query(
            r#"
            SELECT state
            FROM aggregates
            WHERE aggregate_type = $1 AND state @> $2
            "#,
        )
        .bind(A::AGGREGATE_TYPE)
        .bind(filter)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_where_contains", e))?;

        rows.into_iter().map(|row| decode_state::<A>(&row)).collect()
    }

    async fn find_by_unique_key(&self, key: &str) -> RepositoryResult<Option<A>> {
        let row = sqlx::query(
            r#"
            SELECT state
            FROM aggregates
            WHERE aggregate_type = $1 AND unique_key = $2
            "#,
        )
        .bind(A::AGGREGATE_TYPE)
        .bind(key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_unique_key", e))?;

        row.as_ref().map(decode_state::<A>).transpose()
    }
}

fn decode_state<A: StoredAggregate>(row: &sqlx::postgres::PgRow) -> RepositoryResult<A> {
    let state: serde_json::Value = row
        .try_get("state")
        .map_err(|e| map_sqlx_error("decode_state", e))?;
    serde_json::from_value(state).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

#[async_trait]
impl<A> Repository<A> for PostgresRepository<A>
where
    A: StoredAggregate,
{
    #[instrument(skip(self), fields(aggregate_type = A::AGGREGATE_TYPE), err)]
    async fn find_by_id(&self, id: &A::Id) -> RepositoryResult<Option<A>> {
        let row = sqlx::query(
            r#"
            SELECT state
            FROM aggregates
            WHERE aggregate_type = $1 AND aggregate_id = $2
            "#,
        )
        .bind(A::AGGREGATE_TYPE)
        .bind(A::storage_uuid(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.as_ref().map(decode_state::<A>).transpose()
    }

    #[instrument(
        skip(self, aggregate),
        fields(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %A::storage_uuid(aggregate.id()),
            version = aggregate.version(),
            expected = ?expected
        ),
        err
    )]
    async fn save(&self, aggregate: &A, expected: ExpectedVersion) -> RepositoryResult<()> {
        let state = serde_json::to_value(aggregate)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let aggregate_id: Uuid = A::storage_uuid(aggregate.id());
        let version = i64::try_from(aggregate.version())
            .map_err(|_| RepositoryError::Backend("version out of range".to_string()))?;
        let unique_key = aggregate.unique_key();

        let affected = match expected {
            ExpectedVersion::Exact(0) => sqlx::query(
                r#"
                INSERT INTO aggregates (aggregate_type, aggregate_id, version, unique_key, state)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(A::AGGREGATE_TYPE)
            .bind(aggregate_id)
            .bind(version)
            .bind(&unique_key)
            .bind(&state)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?
            .rows_affected(),
            ExpectedVersion::Exact(expected_version) => {
                let expected_version = i64::try_from(expected_version)
                    .map_err(|_| RepositoryError::Backend("version out of range".to_string()))?;
                sqlx::query(
                    r#"
                    UPDATE aggregates
                    SET version = $3, unique_key = $4, state = $5, updated_at = now()
                    WHERE aggregate_type = $1 AND aggregate_id = $2 AND version = $6
                    "#,
                )
                .bind(A::AGGREGATE_TYPE)
                .bind(aggregate_id)
                .bind(version)
                .bind(&unique_key)
                .bind(&state)
                .bind(expected_version)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("update", e))?
                .rows_affected()
            }
            ExpectedVersion::Any => sqlx::query(
                r#"
                INSERT INTO aggregates (aggregate_type, aggregate_id, version, unique_key, state)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (aggregate_type, aggregate_id)
                DO UPDATE SET version = EXCLUDED.version,
                              unique_key = EXCLUDED.unique_key,
                              state = EXCLUDED.state,
                              updated_at = now()
                "#,
            )
            .bind(A::AGGREGATE_TYPE)
            .bind(aggregate_id)
            .bind(version)
            .bind(&unique_key)
            .bind(&state)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("upsert", e))?
            .rows_affected(),
        };

        if affected == 0 {
            return Err(RepositoryError::Conflict(format!(
                "{} {aggregate_id}: expected version {expected:?} no longer current",
                A::AGGREGATE_TYPE
            )));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(aggregate_type = A::AGGREGATE_TYPE), err)]
    async fn delete(&self, id: &A::Id) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM aggregates
            WHERE aggregate_type = $1 AND aggregate_id = $2
            "#,
        )
        .bind(A::AGGREGATE_TYPE)
        .bind(A::storage_uuid(id))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderNumberLookup for PostgresRepository<Order> {
    #[instrument(skip(self), err)]
    async fn exists_by_order_number(&self, order_number: &OrderNumber) -> RepositoryResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM aggregates WHERE aggregate_type = $1 AND unique_key = $2
            ) AS taken
            "#,
        )
        .bind(Order::AGGREGATE_TYPE)
        .bind(order_number.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("exists_by_order_number", e))?;

        row.try_get::<bool, _>("taken")
            .map_err(|e| map_sqlx_error("exists_by_order_number", e))
    }
}

#[async_trait]
impl OrderRepository for PostgresRepository<Order> {
    async fn find_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> RepositoryResult<Option<Order>> {
        self.find_by_unique_key(order_number.as_str()).await
    }

    async fn find_by_user_id(&self, user_id: UserId) -> RepositoryResult<Vec<Order>> {
        let mut orders = self
            .find_where_contains(serde_json::json!({ "user_id": user_id }))
            .await?;
        newest_first(&mut orders, Order::created_at);
        Ok(orders)
    }

    async fn find_by_restaurant_id(
        &self,
        restaurant_id: RestaurantId,
    ) -> RepositoryResult<Vec<Order>> {
        let mut orders = self
            .find_where_contains(serde_json::json!({ "restaurant_id": restaurant_id }))
            .await?;
        newest_first(&mut orders, Order::created_at);
        Ok(orders)
    }

    async fn find_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        let mut orders = self
            .find_where_contains(serde_json::json!({ "status": status }))
            .await?;
        newest_first(&mut orders, Order::created_at);
        Ok(orders)
    }
}

#[async_trait]
impl RestaurantRepository for PostgresRepository<Restaurant> {
    async fn find_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Restaurant>> {
        let mut restaurants = self
            .find_where_contains(serde_json::json!({ "owner_id": owner_id }))
            .await?;
        newest_first(&mut restaurants, Restaurant::created_at);
        Ok(restaurants)
    }

    async fn find_by_status(&self, status: RestaurantStatus) -> RepositoryResult<Vec<Restaurant>> {
        let mut restaurants = self
            .find_where_contains(serde_json::json!({ "status": status }))
            .await?;
        newest_first(&mut restaurants, Restaurant::created_at);
        Ok(restaurants)
    }

    async fn find_accepting_orders(&self) -> RepositoryResult<Vec<Restaurant>> {
        let mut restaurants = self
            .find_where_contains(serde_json::json!({
                "status": RestaurantStatus::Approved,
                "is_open": true,
                "is_active": true,
            }))
            .await?;
        newest_first(&mut restaurants, Restaurant::created_at);
        Ok(restaurants)
    }
}

#[async_trait]
impl UserRepository for PostgresRepository<User> {
    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>> {
        self.find_by_unique_key(email.as_str()).await
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") if db_err.constraint() == Some(UNIQUE_KEY_CONSTRAINT) => {
                    RepositoryError::Duplicate(msg)
                }
                Some("23505") => RepositoryError::Conflict(msg),
                _ => RepositoryError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Backend(format!("connection pool closed in {operation}"))
        }
        other => RepositoryError::Backend(format!("{operation} failed: {other}")),
    }
}
