//! Shift history with an offline fallback.

use std::sync::Arc;

use liefclock_domain::{Result, Shift};
use tracing::{debug, warn};

use crate::network::NetworkMonitor;
use crate::sync::ports::{ClockGateway, ShiftCache};

/// Shifts together with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftListing {
    pub shifts: Vec<Shift>,
    /// True when served from the local cache instead of the server.
    pub from_cache: bool,
}

impl ShiftListing {
    /// The shift without a clock-out time, if any.
    pub fn open_shift(&self) -> Option<&Shift> {
        self.shifts.iter().find(|shift| shift.is_open())
    }
}

/// Reads shifts from the server when it can and from the cache otherwise.
pub struct ShiftHistory {
    gateway: Arc<dyn ClockGateway>,
    cache: Arc<dyn ShiftCache>,
    network: Arc<NetworkMonitor>,
}

impl ShiftHistory {
    pub fn new(
        gateway: Arc<dyn ClockGateway>,
        cache: Arc<dyn ShiftCache>,
        network: Arc<NetworkMonitor>,
    ) -> Self {
        Self { gateway, cache, network }
    }

    /// Server shifts (refreshing the cache) while online; cached shifts when
    /// offline or when the server cannot be reached.
    pub async fn shifts(&self) -> Result<ShiftListing> {
        if !self.network.is_online() {
            return self.from_cache().await;
        }

        match self.gateway.shifts().await {
            Ok(shifts) => {
                if let Err(e) = self.cache.cache_shifts(&shifts).await {
                    warn!(error = %e, "Failed to refresh shift cache");
                }
                Ok(ShiftListing { shifts, from_cache: false })
            }
            Err(e) if e.is_retryable() => {
                debug!(error = %e, "Shift query failed; serving cached shifts");
                self.from_cache().await
            }
            Err(e) => Err(e),
        }
    }

    async fn from_cache(&self) -> Result<ShiftListing> {
        let shifts = self.cache.cached_shifts().await?;
        Ok(ShiftListing { shifts, from_cache: true })
    }
}
