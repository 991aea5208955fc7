//! Projection implementations (read model builders).
//!
//! Projections consume published envelopes and build query-optimized read
//! models. All projections are:
//! - **Rebuildable**: can be reconstructed by replaying envelopes
//! - **Idempotent**: safe for at-least-once delivery

pub mod analytics;
pub mod notifications;

pub use analytics::{AnalyticsProjection, AnalyticsReadModel, AnalyticsSnapshot};
pub use notifications::{Notification, NotificationKind, NotificationsProjection};
