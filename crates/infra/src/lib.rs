//! Infrastructure layer: repository adapters, the command pipeline, read
//! models and the workers that keep them current.

pub mod ordering_service;
pub mod persistence;
pub mod projections;
pub mod read_model;
pub mod workers;

pub use ordering_service::{
    ChangeOrderStatus, DispatchError, NewOrderItem, NewRestaurant, NewUser, OrderSummary,
    OrderingService, PlaceOrder,
};

#[cfg(test)]
mod integration_tests;
