//! Persistence port shared by every aggregate repository.
//!
//! Concrete storage engines (in-memory maps, Postgres) live in the infra
//! crate and implement this trait plus the aggregate-specific finder traits
//! declared next to each aggregate.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::aggregate::{AggregateRoot, ExpectedVersion};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Optimistic concurrency check failed (stale version).
    #[error("version conflict: {0}")]
    Conflict(String),

    /// A uniqueness constraint (e.g. order number, email) was violated.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Aggregate state could not be (de)serialized.
    #[error("state serialization failed: {0}")]
    Serialization(String),

    /// The backing store failed (connection, query, poisoned lock...).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Whole-aggregate persistence contract.
///
/// `save` is an upsert keyed by identity: with `ExpectedVersion::Exact(0)` it
/// creates (and fails with `Conflict` if the id exists); with `Exact(n)` it
/// replaces the full stored state only if the stored version is still `n`.
/// Partial field merges are never performed.
#[async_trait]
pub trait Repository<A>: Send + Sync
where
    A: AggregateRoot + Send + Sync,
{
    async fn find_by_id(&self, id: &A::Id) -> RepositoryResult<Option<A>>;

    async fn save(&self, aggregate: &A, expected: ExpectedVersion) -> RepositoryResult<()>;

    /// Returns whether an aggregate was removed.
    async fn delete(&self, id: &A::Id) -> RepositoryResult<bool>;
}

#[async_trait]
impl<A, R> Repository<A> for Arc<R>
where
    A: AggregateRoot + Send + Sync + 'static,
    R: Repository<A> + ?Sized,
{
    async fn find_by_id(&self, id: &A::Id) -> RepositoryResult<Option<A>> {
        (**self).find_by_id(id).await
    }

    async fn save(&self, aggregate: &A, expected: ExpectedVersion) -> RepositoryResult<()> {
        (**self).save(aggregate, expected).await
    }

    async fn delete(&self, id: &A::Id) -> RepositoryResult<bool> {
        (**self).delete(id).await
    }
}
