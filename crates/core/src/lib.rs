//! `tablefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error taxonomy, aggregate traits, value objects and the
//! base repository port that storage adapters implement.

pub mod aggregate;
pub mod email;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod repository;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use email::Email;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, UserId};
pub use money::{Currency, Money};
pub use repository::{Repository, RepositoryError, RepositoryResult};
pub use value_object::ValueObject;
