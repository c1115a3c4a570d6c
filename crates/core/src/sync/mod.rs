//! Durable queue ports and the background sync coordinator

pub mod coordinator;
pub mod ports;

pub use coordinator::{SyncCoordinator, SyncCoordinatorConfig};
pub use ports::{ActionStore, ClockGateway, ShiftCache, UserDataCache};
