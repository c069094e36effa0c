use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio::time::Instant;

use crate::ConvergenceError;
use crate::Result;

/// Publishes per-(target, partition) delivery progress so callers can wait
/// for a sequence to land everywhere instead of polling replicas.
///
/// Each delivery worker owns one slot and republishes its cursor after
/// every durable advance. A sequence has converged once every registered
/// slot has acknowledged it.
#[derive(Debug, Default)]
pub struct ConvergenceMonitor {
    acked: DashMap<(String, u32), watch::Sender<u64>>,
}

impl ConvergenceMonitor {
    pub fn new() -> Self {
        Self {
            acked: DashMap::new(),
        }
    }

    /// Claims a slot for a (target, partition) pair, seeding it with the
    /// pair's recovered cursor.
    pub fn register(
        &self,
        target: &str,
        partition: u32,
        cursor: u64,
    ) {
        let (tx, _) = watch::channel(cursor);
        self.acked.insert((target.to_string(), partition), tx);
    }

    /// Publishes a pair's latest acknowledged sequence.
    pub fn publish(
        &self,
        target: &str,
        partition: u32,
        sequence: u64,
    ) {
        if let Some(entry) = self.acked.get(&(target.to_string(), partition)) {
            entry.send_replace(sequence);
        }
    }

    /// Slowest acknowledged sequence across all registered pairs; 0 when
    /// nothing has registered yet.
    pub fn min_acknowledged(&self) -> u64 {
        self.acked
            .iter()
            .map(|entry| *entry.value().borrow())
            .min()
            .unwrap_or(0)
    }

    /// Pairs still behind `sequence`, as "target/partition" labels.
    pub fn lagging(
        &self,
        sequence: u64,
    ) -> Vec<String> {
        let mut lagging: Vec<String> = self
            .acked
            .iter()
            .filter(|entry| *entry.value().borrow() < sequence)
            .map(|entry| format!("{}/{}", entry.key().0, entry.key().1))
            .collect();
        lagging.sort();
        lagging
    }

    /// Blocks until every registered pair has acknowledged `sequence`, or
    /// the window elapses.
    ///
    /// # Errors
    /// [`ConvergenceError::WindowExceeded`] with the lagging pairs on
    /// timeout; [`ConvergenceError::Closed`] if a worker slot was dropped.
    pub async fn wait_for(
        &self,
        sequence: u64,
        window: Duration,
    ) -> Result<()> {
        let started = Instant::now();
        let mut receivers: Vec<watch::Receiver<u64>> = self
            .acked
            .iter()
            .map(|entry| entry.value().subscribe())
            .collect();

        let all_acked = async {
            for rx in receivers.iter_mut() {
                rx.wait_for(|acked| *acked >= sequence)
                    .await
                    .map_err(|_| ConvergenceError::Closed)?;
            }
            Ok::<(), ConvergenceError>(())
        };

        match timeout(window, all_acked).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ConvergenceError::WindowExceeded {
                sequence,
                duration: started.elapsed(),
                lagging: self.lagging(sequence),
            }
            .into()),
        }
    }

    /// Drops all progress back to zero. Part of the administrative reset,
    /// after the queue's cursors were cleared.
    pub fn reset(&self) {
        for entry in self.acked.iter() {
            entry.value().send_replace(0);
        }
    }
}
