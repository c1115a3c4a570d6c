//! Host capability adapters
//!
//! A headless host has no geolocation service, page visibility or desktop
//! notifications. These adapters let the embedding process push position
//! fixes and visibility changes in through channels, and route
//! notifications to the log.

pub mod channel;
pub mod notify;

pub use channel::{ChannelPositionSource, ChannelVisibility};
pub use notify::LogNotificationSink;
