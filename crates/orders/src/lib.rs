//! Orders domain module.
//!
//! The order aggregate with its status state machine, and the domain service
//! that allocates human-readable order numbers. Pure domain logic plus the
//! persistence ports it depends on.

pub mod item;
pub mod number;
pub mod order;
pub mod repository;
pub mod status;

pub use item::{MenuItemId, OrderItem, OrderItemId};
pub use number::{
    Clock, DEFAULT_MAX_ATTEMPTS, FixedClock, OrderNumber, OrderNumberError, OrderNumberGenerator,
    SystemClock,
};
pub use order::{
    AddOrderItem, CreateOrder, Order, OrderCommand, OrderCreated, OrderEvent, OrderId,
    OrderItemAdded, OrderStatusChanged, UpdateOrderStatus,
};
pub use repository::{OrderNumberLookup, OrderRepository};
pub use status::OrderStatus;
