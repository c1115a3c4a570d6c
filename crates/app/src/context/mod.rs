//! Application context - dependency injection container
//!
//! Services are started in dependency order by [`AppContext::init`] and torn
//! down in reverse by [`AppContext::dispose`].

use std::sync::Arc;

use liefclock_core::{
    BackgroundTracker, ClockGateway, ClockSubmitter, NetworkMonitor, NetworkMonitorConfig,
    PositionOptions, ShiftHistory, Subscription, SyncCoordinator, SyncCoordinatorConfig,
};
use liefclock_domain::{Config, LiefClockError, PermissionState, Result, StorageStats};
use liefclock_infra::{
    ApiClient, ChannelPositionSource, ChannelVisibility, DbManager, HttpReachabilityProbe,
    LogNotificationSink, SqliteActionStore, SqliteCacheStore,
};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub actions: Arc<SqliteActionStore>,
    pub cache: Arc<SqliteCacheStore>,
    pub network: Arc<NetworkMonitor>,
    pub submitter: Arc<ClockSubmitter>,
    pub sync: Arc<SyncCoordinator>,
    pub history: ShiftHistory,
    pub tracker: Arc<BackgroundTracker>,

    // Host capabilities fed by the embedding shell
    pub positions: Arc<ChannelPositionSource>,
    pub visibility: Arc<ChannelVisibility>,

    sync_subscription: Mutex<Option<Subscription>>,
}

impl AppContext {
    /// Open storage, build every service and start the background workers.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid, the database cannot be
    /// opened or migrated, or a worker refuses to start.
    #[instrument(skip_all, fields(db_path = %config.database.path))]
    pub async fn init(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        let migrate = Arc::clone(&db);
        tokio::task::spawn_blocking(move || migrate.run_migrations())
            .await
            .map_err(|e| LiefClockError::Internal(format!("migration task failed: {e}")))??;

        let actions = Arc::new(SqliteActionStore::new(Arc::clone(&db)));
        let cache = Arc::new(SqliteCacheStore::new(Arc::clone(&db)));
        let gateway: Arc<dyn ClockGateway> =
            Arc::new(ApiClient::from_server_config(&config.server).map_err(LiefClockError::from)?);

        let probe = HttpReachabilityProbe::from_config(&config.server, &config.network)?;
        let network = Arc::new(NetworkMonitor::new(
            Some(Arc::new(probe)),
            NetworkMonitorConfig::from(&config.network),
        ));
        network.start()?;

        let submitter = Arc::new(
            ClockSubmitter::new(actions.clone(), Arc::clone(&gateway), Arc::clone(&network))
                .with_request_timeout(config.server.request_timeout()),
        );
        let pending = submitter.refresh_pending_sync_count().await?;

        let sync = Arc::new(SyncCoordinator::new(
            actions.clone(),
            Arc::clone(&gateway),
            Arc::clone(&network),
            SyncCoordinatorConfig::new(&config.sync, &config.server),
        ));
        let counter = Arc::downgrade(&submitter);
        let sync_subscription = sync.add_listener(move |event| {
            if let Some(submitter) = counter.upgrade() {
                submitter.observe_sync_event(event);
            }
        });
        sync.start()?;

        let history = ShiftHistory::new(Arc::clone(&gateway), cache.clone(), Arc::clone(&network));

        let positions = Arc::new(ChannelPositionSource::new(PermissionState::Granted));
        let visibility = Arc::new(ChannelVisibility::new());
        let tracker = Arc::new(
            BackgroundTracker::new(
                Arc::clone(&submitter),
                positions.clone(),
                Arc::new(LogNotificationSink::default()),
            )
            .with_user_data_cache(cache.clone())
            .with_position_options(PositionOptions::from(&config.tracking))
            .with_buffer_km(config.geofence.buffer_km),
        );
        if let Some(location) = config.geofence.work_location.clone() {
            tracker.set_work_location(Some(location)).await?;
        }
        tracker.attach_visibility(visibility.as_ref());
        if config.tracking.enabled && !tracker.start().await? {
            warn!("Background tracking requested but could not start");
        }

        info!(pending, online = network.is_online(), "LiefClock initialized");

        Ok(Self {
            config,
            db,
            actions,
            cache,
            network,
            submitter,
            sync,
            history,
            tracker,
            positions,
            visibility,
            sync_subscription: Mutex::new(Some(sync_subscription)),
        })
    }

    /// Stop the workers in reverse start order.
    ///
    /// Every worker is asked to stop even when an earlier one fails; the
    /// first failure is returned.
    #[instrument(skip(self))]
    pub async fn dispose(&self) -> Result<()> {
        let mut first_error = None;

        if let Err(e) = self.tracker.shutdown().await {
            warn!(error = %e, component = "BackgroundTracker", "shutdown failed");
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.sync.stop().await {
            warn!(error = %e, component = "SyncCoordinator", "shutdown failed");
            first_error.get_or_insert(e);
        }
        if let Some(subscription) = self.sync_subscription.lock().take() {
            subscription.unsubscribe();
        }
        if let Err(e) = self.network.stop().await {
            warn!(error = %e, component = "NetworkMonitor", "shutdown failed");
            first_error.get_or_insert(e);
        }

        info!("LiefClock disposed");
        first_error.map_or(Ok(()), Err)
    }

    /// Record counts of the local store.
    pub async fn storage_stats(&self) -> Result<StorageStats> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || db.storage_stats())
            .await
            .map_err(|e| LiefClockError::Internal(format!("storage stats task failed: {e}")))?
    }
}
