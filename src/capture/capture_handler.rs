use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::alias::CLOF;
use crate::alias::CSOF;
use crate::capture::CaptureBookmark;
use crate::capture::ChangeSource;
use crate::config::BackoffPolicy;
use crate::config::CaptureConfig;
use crate::metadata::ChangeEvent;
use crate::metadata::ChangeOp;
use crate::metadata::EntitySnapshot;
use crate::metadata::MetadataKind;
use crate::metrics::CAPTURED_EVENTS_METRIC;
use crate::metrics::CAPTURE_POLLS_METRIC;
use crate::storage::ChangeLog;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::utils::time::get_now_ms;
use crate::CaptureError;
use crate::Error;
use crate::PropagationError;
use crate::Result;
use crate::TypeConfig;

/// Poll loop turning primary-side mutations into queued change events.
///
/// Each cycle reads the persisted bookmark, asks the source for updates and
/// deletions at or past the frontier, orders them by observed timestamp and
/// appends whatever is new, then advances the bookmark. Events are appended
/// before the bookmark moves: a crash between the two re-observes the
/// frontier instead of skipping it, and idempotent delivery absorbs the
/// duplicates.
pub struct CaptureHandler<T>
where T: TypeConfig
{
    source: Arc<CSOF<T>>,
    change_log: Arc<CLOF<T>>,
    config: CaptureConfig,
    retry_policy: BackoffPolicy,
    soft_capacity: u64,
    shutdown_signal: watch::Receiver<()>,
}

impl<T> CaptureHandler<T>
where T: TypeConfig
{
    pub fn new(
        source: Arc<CSOF<T>>,
        change_log: Arc<CLOF<T>>,
        config: CaptureConfig,
        retry_policy: BackoffPolicy,
        soft_capacity: u64,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            source,
            change_log,
            config,
            retry_policy,
            soft_capacity,
            shutdown_signal,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("capture handler started");
        let mut tick = interval(Duration::from_millis(self.config.poll_interval_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_signal.changed() => {
                    info!("capture handler received shutdown");
                    return Ok(());
                }
                _ = tick.tick() => {
                    match self.poll_once().await {
                        Ok(captured) => {
                            CAPTURE_POLLS_METRIC.with_label_values(&["ok"]).inc();
                            if captured > 0 {
                                info!(captured, "capture cycle appended events");
                            }
                        }
                        Err(Error::Propagation(PropagationError::Capture(
                            CaptureError::Backpressure { depth, capacity },
                        ))) => {
                            CAPTURE_POLLS_METRIC.with_label_values(&["backpressure"]).inc();
                            warn!(depth, capacity, "capture paused until deliveries drain");
                        }
                        Err(e) => {
                            CAPTURE_POLLS_METRIC.with_label_values(&["error"]).inc();
                            error!(?e, "capture cycle failed");
                        }
                    }
                }
            }
        }
    }

    /// One full capture cycle. Returns how many events were appended.
    pub(crate) async fn poll_once(&self) -> Result<usize> {
        let depth = self.change_log.len();
        if depth >= self.soft_capacity {
            return Err(CaptureError::Backpressure {
                depth,
                capacity: self.soft_capacity,
            }
            .into());
        }

        let bookmark = self.change_log.bookmark()?.unwrap_or_default();
        let mut updated_tracker = FrontierTracker::new(
            bookmark.updated_frontier.clone(),
            bookmark.updated_seen.clone(),
        );
        let mut deleted_tracker = FrontierTracker::new(
            bookmark.deleted_frontier.clone(),
            bookmark.deleted_seen.clone(),
        );

        // (observed ts, op rank, event); sorted before append so queue order
        // follows primary mutation order
        let mut staged: Vec<(String, u8, ChangeEvent)> = Vec::new();

        // Updates first, deletions second: an entity deleted while this
        // cycle runs then lands behind its own last update, never before
        for kind in MetadataKind::ALL {
            let source = Arc::clone(&self.source);
            let since = bookmark.updated_frontier.clone();
            let snapshots = task_with_timeout_and_exponential_backoff(
                || {
                    let source = Arc::clone(&source);
                    let since = since.clone();
                    async move { source.fetch_updated(kind, since).await }
                },
                self.retry_policy,
            )
            .await?;

            for snapshot in snapshots {
                let Some(ts) = snapshot.last_updated.clone() else {
                    warn!(id = %snapshot.id, "entity without lastUpdated skipped");
                    continue;
                };
                let key = CaptureBookmark::seen_key(kind, &snapshot.id);
                if updated_tracker.already_seen(&ts, &key) {
                    continue;
                }
                updated_tracker.observe(&ts, key);

                let op = classify_op(&snapshot);
                staged.push((
                    ts,
                    op_rank(op),
                    ChangeEvent {
                        sequence: 0,
                        kind,
                        entity_id: snapshot.id.clone(),
                        op,
                        payload: Some(snapshot),
                        captured_at_ms: get_now_ms(),
                    },
                ));
            }
        }

        for kind in MetadataKind::ALL {
            let source = Arc::clone(&self.source);
            let since = bookmark.deleted_frontier.clone();
            let records = task_with_timeout_and_exponential_backoff(
                || {
                    let source = Arc::clone(&source);
                    let since = since.clone();
                    async move { source.fetch_deleted(kind, since).await }
                },
                self.retry_policy,
            )
            .await?;

            for record in records {
                let key = CaptureBookmark::seen_key(kind, &record.uid);
                if deleted_tracker.already_seen(&record.deleted_at, &key) {
                    continue;
                }
                deleted_tracker.observe(&record.deleted_at, key);

                staged.push((
                    record.deleted_at.clone(),
                    op_rank(ChangeOp::Delete),
                    ChangeEvent {
                        sequence: 0,
                        kind,
                        entity_id: record.uid,
                        op: ChangeOp::Delete,
                        payload: None,
                        captured_at_ms: get_now_ms(),
                    },
                ));
            }
        }

        // Deletes sort after writes on timestamp ties
        staged.sort_by(|a, b| (a.0.as_str(), a.1).cmp(&(b.0.as_str(), b.1)));

        let events: Vec<ChangeEvent> = staged.into_iter().map(|(_, _, event)| event).collect();
        let captured = events.len();

        if captured > 0 {
            for event in &events {
                CAPTURED_EVENTS_METRIC.with_label_values(&[event.op.label()]).inc();
            }
            self.change_log.append_batch(events)?;
        }

        let next_bookmark = CaptureBookmark {
            updated_frontier: updated_tracker.frontier,
            updated_seen: updated_tracker.seen,
            deleted_frontier: deleted_tracker.frontier,
            deleted_seen: deleted_tracker.seen,
        };
        if next_bookmark != bookmark {
            self.change_log.save_bookmark(&next_bookmark)?;
        }

        Ok(captured)
    }
}

/// A snapshot whose created and lastUpdated stamps match has never been
/// modified since birth, so it propagates as a create.
fn classify_op(snapshot: &EntitySnapshot) -> ChangeOp {
    match (&snapshot.created, &snapshot.last_updated) {
        (Some(created), Some(updated)) if created == updated => ChangeOp::Create,
        _ => ChangeOp::Update,
    }
}

fn op_rank(op: ChangeOp) -> u8 {
    match op {
        ChangeOp::Create => 0,
        ChangeOp::Update => 1,
        ChangeOp::Delete => 2,
    }
}

/// Tracks one capture facet's frontier within a poll cycle.
struct FrontierTracker {
    frontier: Option<String>,
    seen: Vec<String>,
}

impl FrontierTracker {
    fn new(
        frontier: Option<String>,
        seen: Vec<String>,
    ) -> Self {
        Self { frontier, seen }
    }

    /// Whether this (timestamp, key) was already emitted by an earlier poll.
    fn already_seen(
        &self,
        ts: &str,
        key: &str,
    ) -> bool {
        self.frontier.as_deref() == Some(ts) && self.seen.iter().any(|s| s == key)
    }

    /// Record an emitted item, advancing the frontier when it moves past.
    fn observe(
        &mut self,
        ts: &str,
        key: String,
    ) {
        match self.frontier.as_deref() {
            Some(front) if ts > front => {
                self.frontier = Some(ts.to_string());
                self.seen = vec![key];
            }
            Some(front) if ts == front => {
                if !self.seen.contains(&key) {
                    self.seen.push(key);
                }
            }
            // Behind the frontier: emitted, but cannot move it
            Some(_) => {}
            None => {
                self.frontier = Some(ts.to_string());
                self.seen = vec![key];
            }
        }
    }
}
