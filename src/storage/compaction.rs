use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tracing::error;
use tracing::info;

use crate::alias::CLOF;
use crate::metrics::QUEUE_DEPTH_METRIC;
use crate::storage::ChangeLog;
use crate::Result;
use crate::TypeConfig;

/// Periodically purges events every configured (target, partition) pair has
/// settled, keeping the queue bounded by delivery lag rather than history.
pub struct QueueCompactor<T>
where T: TypeConfig
{
    change_log: Arc<CLOF<T>>,
    interval_ms: u64,
    shutdown_signal: watch::Receiver<()>,
}

impl<T> QueueCompactor<T>
where T: TypeConfig
{
    pub fn new(
        change_log: Arc<CLOF<T>>,
        interval_ms: u64,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            change_log,
            interval_ms,
            shutdown_signal,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut tick = interval(Duration::from_millis(self.interval_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_signal.changed() => {
                    info!("queue compactor received shutdown");
                    return Ok(());
                }
                _ = tick.tick() => {
                    if let Err(e) = self.compact_once() {
                        error!(?e, "queue compaction cycle failed");
                    }
                }
            }
        }
    }

    fn compact_once(&self) -> Result<u64> {
        let cutoff = self.change_log.min_delivery_cursor()?;
        let purged = if cutoff == 0 {
            0
        } else {
            self.change_log.purge_up_to(cutoff)?
        };
        if purged > 0 {
            info!(purged, cutoff, "queue compacted");
        }
        QUEUE_DEPTH_METRIC.set(self.change_log.len() as i64);
        Ok(purged)
    }
}
