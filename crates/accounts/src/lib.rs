//! User accounts: customers, restaurant owners and admins, plus each user's
//! favorite restaurants.

pub mod repository;
pub mod user;

pub use repository::UserRepository;
pub use user::{
    AddFavorite, DeactivateUser, FavoriteAdded, FavoriteRemoved, RegisterUser, RemoveFavorite,
    User, UserCommand, UserDeactivated, UserEvent, UserRegistered, UserRole,
};
