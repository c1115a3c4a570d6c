//! Port interfaces for connectivity checks

use async_trait::async_trait;
use liefclock_domain::Result;

/// Active reachability check against the server.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns `true` when the server answered at all, whatever the status code.
    ///
    /// The monitor bounds each call with its own timeout.
    async fn probe(&self) -> Result<bool>;
}
