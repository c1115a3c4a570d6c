//! Passive background tracking

pub mod ports;
pub mod service;

pub use ports::{Notification, NotificationSink, PositionOptions, PositionSource, VisibilityObserver};
pub use service::BackgroundTracker;
