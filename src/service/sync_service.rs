//! The running synchronization service instance.
//!
//! ## Key Responsibilities
//! - Holds the shared pipeline components (queue, convergence watch, target registry)
//! - Tracks readiness once the background loops are spawned
//! - Waits out the shutdown signal, then drains and flushes
//!
//! ## Example Usage
//! ```rust,no_run
//! # use tokio::sync::watch;
//! # use metasync::ServiceBuilder;
//! # async fn example() {
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let service = ServiceBuilder::new(None, shutdown_rx)
//!     .build()
//!     .start_admin_server(shutdown_tx.subscribe())
//!     .ready()
//!     .unwrap();
//! tokio::spawn(async move {
//!     service.run().await.expect("Sync service execution failed");
//! });
//! # }
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use crate::alias::CLOF;
use crate::delivery::ConvergenceMonitor;
use crate::storage::ChangeLog;
use crate::targets::TargetHealthMonitor;
use crate::targets::TargetRegistry;
use crate::Result;
use crate::SyncNodeConfig;
use crate::TypeConfig;

pub struct SyncService<T>
where
    T: TypeConfig,
{
    pub(crate) node_id: u32,
    pub(crate) change_log: Arc<CLOF<T>>,
    pub(crate) convergence: Arc<ConvergenceMonitor>,
    pub(crate) health: Arc<TargetHealthMonitor>,
    pub(crate) targets: Arc<TargetRegistry<T>>,
    pub(crate) ready: AtomicBool,

    pub config: Arc<SyncNodeConfig>,

    pub(crate) shutdown_signal: watch::Receiver<()>,
}

impl<T> SyncService<T>
where
    T: TypeConfig,
{
    /// Runs until the shutdown signal fires.
    ///
    /// The pipeline loops were already spawned by the builder; this marks
    /// the service ready, parks on the signal, then gives in-flight
    /// deliveries the configured grace period before flushing the queue.
    pub async fn run(&self) -> Result<()> {
        self.set_ready(true);
        info!(
            node_id = self.node_id,
            targets = ?self.targets.names(),
            "synchronization service ready"
        );

        let mut shutdown = self.shutdown_signal.clone();
        let _ = shutdown.changed().await;

        info!("shutdown received, draining in-flight deliveries");
        sleep(Duration::from_millis(self.config.delivery.drain_grace_ms)).await;
        self.change_log.flush()?;
        info!("synchronization service stopped");

        Ok(())
    }

    /// Blocks until every (target, partition) pair has acknowledged
    /// `sequence`, bounded by the configured consistency window.
    pub async fn wait_for_convergence(
        &self,
        sequence: u64,
    ) -> Result<()> {
        self.convergence
            .wait_for(
                sequence,
                Duration::from_millis(self.config.delivery.consistency_window_ms),
            )
            .await
    }

    /// Highest sequence the capture stage has appended so far.
    pub fn last_sequence(&self) -> u64 {
        self.change_log.last_sequence()
    }

    /// Change events still queued for at least one pair.
    pub fn queue_depth(&self) -> u64 {
        self.change_log.len()
    }

    /// Events parked for operator review after permanent delivery failures.
    pub fn dead_letter_count(&self) -> u64 {
        self.change_log.dead_letter_count()
    }

    pub fn set_ready(
        &self,
        is_ready: bool,
    ) {
        self.ready.store(is_ready, Ordering::SeqCst);
    }

    pub fn server_is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
