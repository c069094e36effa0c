use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::alias::CLOF;
use crate::alias::RAOF;
use crate::config::BackoffPolicy;
use crate::config::DeliveryConfig;
use crate::delivery::partition_for;
use crate::delivery::ConvergenceMonitor;
use crate::metadata::ChangeEvent;
use crate::metrics::DEAD_LETTERED_EVENTS_METRIC;
use crate::metrics::DELIVERED_EVENTS_METRIC;
use crate::metrics::DELIVERY_LATENCY_METRIC;
use crate::metrics::FILTERED_EVENTS_METRIC;
use crate::metrics::TARGET_FAILURES_METRIC;
use crate::replica::ApplyOutcome;
use crate::replica::ReplicaAdapter;
use crate::storage::ChangeLog;
use crate::storage::DeadLetterRecord;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::utils::masking::mask_credentials;
use crate::utils::time::get_now_ms;
use crate::DeliveryError;
use crate::Error;
use crate::PropagationError;
use crate::Result;
use crate::TypeConfig;

/// What a delivery pass decided about one event.
enum EventResolution {
    /// Acknowledged (applied, already converged, filtered or not in this
    /// partition); the cursor may pass it
    Settled,

    /// Left in place for a later pass; the cursor must not pass it
    Deferred,
}

/// One delivery loop for one (target, partition) pair.
///
/// Wakes on queue appends (watch channel) with a coarse tick as safety
/// net, scans its partition's events past the durable cursor, applies them
/// through the adapter and advances the cursor. Poison events are
/// dead-lettered so one broken payload cannot stall the partition; a
/// target-wide outage instead parks the cursor and lets the queue back up.
pub struct DeliveryWorker<T>
where T: TypeConfig
{
    target: String,
    partition: u32,
    change_log: Arc<CLOF<T>>,
    adapter: Arc<RAOF<T>>,
    convergence: Arc<ConvergenceMonitor>,
    config: DeliveryConfig,
    retry_policy: BackoffPolicy,
    shutdown_signal: watch::Receiver<()>,
}

impl<T> DeliveryWorker<T>
where T: TypeConfig
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target: String,
        partition: u32,
        change_log: Arc<CLOF<T>>,
        adapter: Arc<RAOF<T>>,
        convergence: Arc<ConvergenceMonitor>,
        config: DeliveryConfig,
        retry_policy: BackoffPolicy,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            target,
            partition,
            change_log,
            adapter,
            convergence,
            config,
            retry_policy,
            shutdown_signal,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let cursor = self
            .change_log
            .register_delivery_cursor(&self.target, self.partition)?;
        self.convergence.register(&self.target, self.partition, cursor);

        let mut appends = self.change_log.subscribe_appends();
        let mut tick = interval(Duration::from_millis(self.config.poll_interval_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            target = %self.target,
            partition = self.partition,
            cursor,
            "delivery worker started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_signal.changed() => {
                    info!(
                        target = %self.target,
                        partition = self.partition,
                        "delivery worker received shutdown"
                    );
                    return Ok(());
                }
                changed = appends.changed() => {
                    if changed.is_err() {
                        warn!(
                            target = %self.target,
                            partition = self.partition,
                            "change log dropped, delivery worker exiting"
                        );
                        return Ok(());
                    }
                    self.drain().await;
                }
                _ = tick.tick() => {
                    self.drain().await;
                }
            }
        }
    }

    /// Works through everything currently ready for this pair. Failures
    /// are logged and leave the cursor parked; the next wakeup resumes.
    async fn drain(&self) {
        loop {
            match self.process_batch().await {
                Ok(true) => continue,
                Ok(false) => return,
                Err(e) => {
                    error!(
                        target = %self.target,
                        partition = self.partition,
                        ?e,
                        "delivery pass failed"
                    );
                    return;
                }
            }
        }
    }

    /// Processes one batch after the cursor. Returns whether a full batch
    /// was settled (meaning more events may be waiting).
    pub(crate) async fn process_batch(&self) -> Result<bool> {
        let cursor = self.change_log.delivery_cursor(&self.target, self.partition)?;
        let batch = self
            .change_log
            .entries_after(cursor, self.config.batch_limit)?;
        if batch.is_empty() {
            return Ok(false);
        }
        let full_batch = batch.len() == self.config.batch_limit;

        let mut settled_up_to = cursor;
        let mut deferred = false;
        for event in &batch {
            if partition_for(&event.entity_id, self.config.partitions) != self.partition {
                // Another partition's event; this pair only accounts for it
                settled_up_to = event.sequence;
                continue;
            }

            match self.deliver(event).await? {
                EventResolution::Settled => settled_up_to = event.sequence,
                EventResolution::Deferred => {
                    deferred = true;
                    break;
                }
            }
        }

        if settled_up_to > cursor {
            self.change_log
                .advance_delivery_cursor(&self.target, self.partition, settled_up_to)?;
            self.convergence
                .publish(&self.target, self.partition, settled_up_to);
        }

        Ok(full_batch && !deferred)
    }

    /// Applies one event with bounded retries, classifying the outcome.
    async fn deliver(
        &self,
        event: &ChangeEvent,
    ) -> Result<EventResolution> {
        let adapter = Arc::clone(&self.adapter);
        let attempt_event = event.clone();
        let attempts = self.retry_policy.max_retries;

        let result = task_with_timeout_and_exponential_backoff(
            || {
                let adapter = Arc::clone(&adapter);
                let event = attempt_event.clone();
                async move { adapter.apply(&event).await }
            },
            self.retry_policy,
        )
        .await;

        match result {
            Ok(ApplyOutcome::Applied) | Ok(ApplyOutcome::AlreadyConverged) => {
                DELIVERED_EVENTS_METRIC
                    .with_label_values(&[&self.target, event.op.label()])
                    .inc();
                DELIVERY_LATENCY_METRIC
                    .with_label_values(&[&self.target])
                    .observe(get_now_ms().saturating_sub(event.captured_at_ms) as f64);
                debug!(
                    target = %self.target,
                    sequence = event.sequence,
                    entity_id = %event.entity_id,
                    op = event.op.label(),
                    "event delivered"
                );
                Ok(EventResolution::Settled)
            }
            Ok(ApplyOutcome::Filtered) => {
                FILTERED_EVENTS_METRIC
                    .with_label_values(&[&self.target, event.op.label()])
                    .inc();
                Ok(EventResolution::Settled)
            }
            Err(e) if is_permanent_delivery_failure(&e) => {
                self.dead_letter(event, &e)?;
                Ok(EventResolution::Settled)
            }
            Err(e) => {
                // Retry budget spent on transient failures. A live target
                // means this one event is poison; a dead target means the
                // whole pair waits and the queue absorbs the outage.
                TARGET_FAILURES_METRIC
                    .with_label_values(&[&self.target, "delivery"])
                    .inc();
                if self.adapter.check_health().await.is_ok() {
                    warn!(
                        target = %self.target,
                        sequence = event.sequence,
                        ?e,
                        "target healthy but event keeps failing, dead-lettering"
                    );
                    let exhausted: Error = DeliveryError::RetriesExhausted {
                        target: self.target.clone(),
                        attempts,
                    }
                    .into();
                    self.dead_letter(event, &exhausted)?;
                    Ok(EventResolution::Settled)
                } else {
                    warn!(
                        target = %self.target,
                        partition = self.partition,
                        sequence = event.sequence,
                        "target unreachable, deferring partition"
                    );
                    Ok(EventResolution::Deferred)
                }
            }
        }
    }

    /// Records a terminal failure and lets the cursor move on.
    fn dead_letter(
        &self,
        event: &ChangeEvent,
        cause: &Error,
    ) -> Result<()> {
        let record = DeadLetterRecord {
            sequence: event.sequence,
            target: self.target.clone(),
            kind: event.kind,
            entity_id: event.entity_id.clone(),
            op: event.op,
            error_message: root_cause_message(cause),
            body: match &event.payload {
                Some(snapshot) => Some(serde_json::to_string(snapshot)?),
                None => None,
            },
            failed_at_ms: get_now_ms(),
        };

        error!(
            target = %self.target,
            sequence = event.sequence,
            entity_id = %event.entity_id,
            error_message = %record.error_message,
            "event dead-lettered"
        );
        self.change_log.append_dead_letter(&record)?;
        DEAD_LETTERED_EVENTS_METRIC
            .with_label_values(&[&self.target])
            .inc();
        Ok(())
    }
}

/// Failures no retry can fix: the event itself is unacceptable to the
/// target.
fn is_permanent_delivery_failure(error: &Error) -> bool {
    matches!(
        error,
        Error::Propagation(PropagationError::Delivery(
            DeliveryError::Conflict { .. }
                | DeliveryError::Rejected { .. }
                | DeliveryError::Undeliverable { .. }
        ))
    )
}

/// Walks the source chain to its root and masks credential material, the
/// shape dead-letter tooling expects in `error_message`.
pub(crate) fn root_cause_message(error: &Error) -> String {
    let mut cause: &dyn std::error::Error = error;
    while let Some(next) = cause.source() {
        cause = next;
    }
    mask_credentials(&cause.to_string())
}
