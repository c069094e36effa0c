//! A builder pattern implementation for constructing a [`SyncService`]
//! instance.
//!
//! The [`ServiceBuilder`] provides a fluent interface to configure and
//! assemble the pipeline components: the durable change queue, the primary
//! change source and one replica adapter per configured target.
//!
//! ## Key Design Points
//! - **Default Components**: Initializes with production-ready defaults (Sled-backed queue, HTTP
//!   source and adapters built from configuration).
//! - **Customization**: Allows overriding defaults via setter methods (e.g., `change_log()`,
//!   `change_source()`).
//! - **Lifecycle Management**:
//!   - `build()`: Assembles the [`SyncService`] and spawns the pipeline loops (capture, delivery
//!     workers, compaction, health probing).
//!   - `start_admin_server()`: Launches the administrative HTTP endpoint.
//!   - `ready()`: Finalizes construction and returns the initialized [`SyncService`].
//!
//! ## Example
//! ```ignore
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let service = ServiceBuilder::new(config_path, shutdown_rx)
//!     .change_log(custom_change_log)  // Optional override
//!     .build()
//!     .start_admin_server(shutdown_tx.subscribe())
//!     .ready()
//!     .unwrap();
//! ```
//!
//! ## Notes
//! - **Thread Safety**: All components wrapped in `Arc` for shared ownership.
//! - **Resource Cleanup**: Uses `watch::Receiver` for cooperative shutdown signaling.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::admin;
use crate::admin::AdminContext;
use crate::capture::CaptureHandler;
use crate::capture::HttpChangeSource;
use crate::delivery::ConvergenceMonitor;
use crate::delivery::DeliveryWorker;
use crate::replica::RestAdapter;
use crate::storage::init_sled_change_db;
use crate::storage::ChangeLog;
use crate::storage::QueueCompactor;
use crate::storage::SledChangeLog;
use crate::targets::TargetHealthMonitor;
use crate::targets::TargetHealthProbe;
use crate::targets::TargetRegistry;
use crate::Result;
use crate::SyncNodeConfig;
use crate::SyncService;
use crate::SyncTypeConfig;
use crate::SystemError;

/// Builder pattern implementation for constructing a synchronization service
/// with configurable components. Provides a fluent interface to set up the
/// queue, change source, replica adapters and background loops.
pub struct ServiceBuilder {
    node_id: u32,
    pub(super) config: SyncNodeConfig,
    pub(super) change_log: Option<Arc<SledChangeLog>>,
    pub(super) change_source: Option<Arc<HttpChangeSource>>,
    pub(super) target_registry: Option<Arc<TargetRegistry<SyncTypeConfig>>>,
    pub(super) shutdown_signal: watch::Receiver<()>,

    pub(super) service: Option<Arc<SyncService<SyncTypeConfig>>>,
}

impl ServiceBuilder {
    /// Creates a new ServiceBuilder with configuration loaded from the
    /// layered sources.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to a node-specific configuration file
    /// * `shutdown_signal` - Watch channel for graceful shutdown signaling
    ///
    /// # Panics
    /// Will panic if configuration loading fails (consider returning Result
    /// instead)
    pub fn new(
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if let Some(p) = config_path {
            info!("loading node config overrides from: {}", &p);
        }
        let config = SyncNodeConfig::load(config_path).expect("Load node config successfully");
        Self::init(config, shutdown_signal)
    }

    /// Constructs ServiceBuilder from an in-memory configuration
    ///
    /// # Arguments
    /// * `config` - Pre-built node configuration
    /// * `shutdown_signal` - Graceful shutdown notification channel
    ///
    /// # Usage
    /// ```ignore
    /// let builder = ServiceBuilder::from_config(my_config, shutdown_rx);
    /// ```
    pub fn from_config(
        config: SyncNodeConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self::init(config, shutdown_signal)
    }

    /// Core initialization logic shared by all construction paths
    pub fn init(
        config: SyncNodeConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            node_id: config.node.node_id,
            config,
            change_log: None,
            change_source: None,
            target_registry: None,
            shutdown_signal,
            service: None,
        }
    }

    /// Sets a custom durable change queue implementation
    pub fn change_log(
        mut self,
        change_log: Arc<SledChangeLog>,
    ) -> Self {
        self.change_log = Some(change_log);
        self
    }

    /// Sets a custom primary change source implementation
    pub fn change_source(
        mut self,
        change_source: Arc<HttpChangeSource>,
    ) -> Self {
        self.change_source = Some(change_source);
        self
    }

    /// Replaces the replica adapters normally derived from the `[[targets]]`
    /// configuration
    pub fn target_registry(
        mut self,
        target_registry: Arc<TargetRegistry<SyncTypeConfig>>,
    ) -> Self {
        self.target_registry = Some(target_registry);
        self
    }

    /// Replaces the entire node configuration
    pub fn node_config(
        mut self,
        config: SyncNodeConfig,
    ) -> Self {
        self.node_id = config.node.node_id;
        self.config = config;
        self
    }

    /// Finalizes the builder and constructs the synchronization service.
    ///
    /// Initializes default implementations for any unconfigured components:
    /// - Opens the sled-backed change queue under `db_root_dir/{node_id}`
    /// - Builds the HTTP change source against the configured primary
    /// - Builds one REST adapter per configured target
    ///
    /// then spawns the pipeline loops: the capture handler, one delivery
    /// worker per (target, partition) pair, the queue compactor and the
    /// target health probe.
    ///
    /// # Panics
    /// Panics if essential components cannot be initialized
    pub fn build(mut self) -> Self {
        let node_id = self.node_id;
        let config = self.config.clone();
        let db_root_dir = format!("{}/{}", config.node.db_root_dir.display(), node_id);

        let change_log = self.change_log.take().unwrap_or_else(|| {
            let change_db =
                init_sled_change_db(&db_root_dir).expect("init_sled_change_db successfully.");
            Arc::new(SledChangeLog::new(change_db).expect("Init change log successfully."))
        });

        let change_source = self.change_source.take().unwrap_or_else(|| {
            Arc::new(
                HttpChangeSource::new(&config.primary, config.capture.page_size)
                    .expect("Init primary change source successfully."),
            )
        });

        let target_registry = self.target_registry.take().unwrap_or_else(|| {
            let mut adapters = Vec::with_capacity(config.targets.len());
            for target in &config.targets {
                let name = target
                    .effective_name()
                    .expect("Resolve target name successfully.");
                let adapter = RestAdapter::new(target).expect("Init replica adapter successfully.");
                adapters.push((name, Arc::new(adapter)));
            }
            Arc::new(TargetRegistry::<SyncTypeConfig>::new(adapters))
        });

        // Cursors of targets removed from configuration would otherwise hold
        // compaction back forever
        if let Err(e) = change_log
            .prune_delivery_cursors(&target_registry.cursor_pairs(config.delivery.partitions))
        {
            warn!(?e, "could not prune stale delivery cursors");
        }

        let convergence = Arc::new(ConvergenceMonitor::new());
        let health = Arc::new(TargetHealthMonitor::new(
            config.retry.healthcheck.max_retries as u32,
        ));

        let capture_handler = CaptureHandler::<SyncTypeConfig>::new(
            Arc::clone(&change_source),
            Arc::clone(&change_log),
            config.capture,
            config.retry.capture,
            config.queue.soft_capacity,
            self.shutdown_signal.clone(),
        );
        Self::spawn_pipeline_loop("capture handler".to_string(), capture_handler.run());

        for (name, adapter) in target_registry.iter() {
            for partition in 0..config.delivery.partitions {
                let worker = DeliveryWorker::<SyncTypeConfig>::new(
                    name.clone(),
                    partition,
                    Arc::clone(&change_log),
                    Arc::clone(adapter),
                    Arc::clone(&convergence),
                    config.delivery,
                    config.retry.delivery,
                    self.shutdown_signal.clone(),
                );
                Self::spawn_pipeline_loop(
                    format!("delivery worker {name}/{partition}"),
                    worker.run(),
                );
            }
        }

        let compactor = QueueCompactor::<SyncTypeConfig>::new(
            Arc::clone(&change_log),
            config.queue.compaction_interval_ms,
            self.shutdown_signal.clone(),
        );
        Self::spawn_pipeline_loop("queue compactor".to_string(), compactor.run());

        let probe = TargetHealthProbe::<SyncTypeConfig>::new(
            Arc::clone(&target_registry),
            Arc::clone(&health),
            config.retry.healthcheck,
            self.shutdown_signal.clone(),
        );
        Self::spawn_pipeline_loop("target health probe".to_string(), probe.run());

        let service = SyncService::<SyncTypeConfig> {
            node_id,
            change_log,
            convergence,
            health,
            targets: target_registry,
            ready: AtomicBool::new(false),
            config: Arc::new(config),
            shutdown_signal: self.shutdown_signal.clone(),
        };

        self.service = Some(Arc::new(service));
        self
    }

    /// Runs one pipeline loop to completion, logging how it exited.
    fn spawn_pipeline_loop<F>(
        label: String,
        task: F,
    ) where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        tokio::spawn(async move {
            match task.await {
                Ok(_) => {
                    info!("{label} exited");
                }
                Err(e) => {
                    error!("{label} exited with unexpected error: {:?}", e);
                }
            }
        });
    }

    /// Starts the administrative HTTP server (`/metrics`, `/status`,
    /// `/reset`) when monitoring is enabled.
    ///
    /// # Panics
    /// Panics if the service hasn't been built
    pub fn start_admin_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if !self.config.monitoring.prometheus_enabled {
            info!("admin server disabled by configuration");
            return self;
        }
        if let Some(ref service) = self.service {
            let port = self.config.monitoring.prometheus_port;
            let ctx = Arc::new(AdminContext::<SyncTypeConfig> {
                change_log: Arc::clone(&service.change_log),
                convergence: Arc::clone(&service.convergence),
                health: Arc::clone(&service.health),
                targets: Arc::clone(&service.targets),
                partitions: self.config.delivery.partitions,
            });
            tokio::spawn(async move {
                admin::start_admin_server(ctx, port, shutdown_signal).await;
            });
            self
        } else {
            panic!("failed to start admin server");
        }
    }

    /// Returns the built service instance after successful construction.
    ///
    /// # Errors
    /// Returns `SystemError::ServiceStartFailed` if build hasn't completed
    pub fn ready(self) -> Result<Arc<SyncService<SyncTypeConfig>>> {
        self.service.ok_or_else(|| {
            SystemError::ServiceStartFailed("check service ready failed".to_string()).into()
        })
    }

    /// Test constructor with custom database path
    ///
    /// # Safety
    /// Bypasses normal configuration validation - use for testing only
    #[cfg(test)]
    pub fn new_from_db_path(
        db_path: &str,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        use std::path::PathBuf;

        let mut config = SyncNodeConfig::default();
        config.node.db_root_dir = PathBuf::from(db_path);

        Self::init(config, shutdown_signal)
    }
}
