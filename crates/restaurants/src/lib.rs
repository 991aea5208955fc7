//! Restaurants domain module.
//!
//! Onboarding and the approval workflow that decides whether a restaurant may
//! receive orders. Pure domain logic: no IO, no HTTP, no storage.

pub mod repository;
pub mod restaurant;

pub use repository::RestaurantRepository;
pub use restaurant::{
    AcceptingRestaurant, ApproveRestaurant, BlockRestaurant, CloseRestaurant,
    DeactivateRestaurant, OpenRestaurant, RateRestaurant, ReactivateRestaurant,
    RegisterRestaurant, Restaurant, RestaurantApproved, RestaurantBlocked, RestaurantClosed,
    RestaurantCommand, RestaurantDeactivated, RestaurantEvent, RestaurantId, RestaurantOpened,
    RestaurantRated, RestaurantReactivated, RestaurantRegistered, RestaurantStatus,
};
