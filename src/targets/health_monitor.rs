use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::interval;
use tokio::time::timeout;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing::warn;

use crate::config::BackoffPolicy;
use crate::metrics::TARGET_FAILURES_METRIC;
use crate::replica::ReplicaAdapter;
use crate::targets::TargetRegistry;
use crate::Result;
use crate::TypeConfig;

/// Consecutive probe failure counts per target.
///
/// A target is degraded once it fails `degraded_threshold` probes in a row;
/// one successful probe clears it. Degradation is advisory (surfaced on the
/// status endpoint), delivery keeps queueing either way.
pub struct TargetHealthMonitor {
    failure_counts: DashMap<String, u32>,
    degraded_threshold: u32,
}

impl TargetHealthMonitor {
    pub fn new(degraded_threshold: u32) -> Self {
        TargetHealthMonitor {
            failure_counts: DashMap::new(),
            degraded_threshold,
        }
    }

    pub fn record_failure(
        &self,
        target: &str,
    ) -> u32 {
        let mut count = self.failure_counts.entry(target.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn record_success(
        &self,
        target: &str,
    ) {
        self.failure_counts.remove(target);
    }

    pub fn failure_count(
        &self,
        target: &str,
    ) -> u32 {
        self.failure_counts.get(target).map(|c| *c).unwrap_or(0)
    }

    pub fn is_degraded(
        &self,
        target: &str,
    ) -> bool {
        self.failure_count(target) >= self.degraded_threshold
    }

    pub fn degraded_targets(&self) -> Vec<String> {
        let mut degraded: Vec<String> = self
            .failure_counts
            .iter()
            .filter(|entry| *entry.value() >= self.degraded_threshold)
            .map(|entry| entry.key().clone())
            .collect();
        degraded.sort();
        degraded
    }
}

/// Background loop probing every registered target's system endpoint.
pub struct TargetHealthProbe<T>
where T: TypeConfig
{
    registry: Arc<TargetRegistry<T>>,
    monitor: Arc<TargetHealthMonitor>,
    policy: BackoffPolicy,
    shutdown_signal: watch::Receiver<()>,
}

impl<T> TargetHealthProbe<T>
where T: TypeConfig
{
    pub fn new(
        registry: Arc<TargetRegistry<T>>,
        monitor: Arc<TargetHealthMonitor>,
        policy: BackoffPolicy,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            registry,
            monitor,
            policy,
            shutdown_signal,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("target health probe started");
        let mut tick = interval(Duration::from_millis(self.policy.base_delay_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_signal.changed() => {
                    info!("target health probe received shutdown");
                    return Ok(());
                }
                _ = tick.tick() => {
                    self.probe_all().await;
                }
            }
        }
    }

    pub(crate) async fn probe_all(&self) {
        let deadline = Duration::from_millis(self.policy.timeout_ms);
        for (name, adapter) in self.registry.iter() {
            match timeout(deadline, adapter.check_health()).await {
                Ok(Ok(())) => {
                    if self.monitor.failure_count(name) > 0 {
                        info!(target = %name, "target recovered");
                    }
                    self.monitor.record_success(name);
                }
                Ok(Err(e)) => {
                    let failures = self.monitor.record_failure(name);
                    TARGET_FAILURES_METRIC.with_label_values(&[name, "probe"]).inc();
                    warn!(target = %name, failures, ?e, "target probe failed");
                }
                Err(_) => {
                    let failures = self.monitor.record_failure(name);
                    TARGET_FAILURES_METRIC.with_label_values(&[name, "probe"]).inc();
                    warn!(target = %name, failures, ?deadline, "target probe timed out");
                }
            }
        }
    }
}
