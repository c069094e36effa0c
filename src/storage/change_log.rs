use tokio::sync::watch;

use crate::capture::CaptureBookmark;
use crate::metadata::ChangeEvent;
use crate::storage::DeadLetterRecord;
use crate::Result;

/// Durable, ordered queue of captured change events plus the per-consumer
/// state hanging off it.
///
/// Sequences are assigned at append time, start at 1 and never rewind, not
/// even across [`ChangeLog::reset`]. A delivery cursor records the highest
/// sequence a (target, partition) pair has settled: every event at or below
/// it was either delivered, filtered or dead-lettered.
pub trait ChangeLog: Send + Sync + 'static {
    /// Atomically appends a batch of events, assigning consecutive
    /// sequences. Returns the assigned sequences in order.
    fn append_batch(
        &self,
        events: Vec<ChangeEvent>,
    ) -> Result<Vec<u64>>;

    fn entry(
        &self,
        sequence: u64,
    ) -> Result<Option<ChangeEvent>>;

    /// Events with sequence strictly greater than `after`, oldest first,
    /// at most `limit` of them.
    fn entries_after(
        &self,
        after: u64,
        limit: usize,
    ) -> Result<Vec<ChangeEvent>>;

    /// Highest sequence ever assigned (0 before the first append).
    fn last_sequence(&self) -> u64;

    /// Number of events currently retained (compaction shrinks this,
    /// sequences keep growing).
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the pair's cursor, creating a zero record on first contact so
    /// compaction accounts for the pair from then on.
    fn register_delivery_cursor(
        &self,
        target: &str,
        partition: u32,
    ) -> Result<u64>;

    fn delivery_cursor(
        &self,
        target: &str,
        partition: u32,
    ) -> Result<u64>;

    /// Durably advances a pair's cursor. Never moves backwards.
    fn advance_delivery_cursor(
        &self,
        target: &str,
        partition: u32,
        sequence: u64,
    ) -> Result<()>;

    /// All recorded cursors as ((target, partition), sequence) tuples.
    fn delivery_cursors(&self) -> Result<Vec<((String, u32), u64)>>;

    /// Drops cursor records for pairs no longer configured, so stale
    /// targets cannot hold compaction back forever.
    fn prune_delivery_cursors(
        &self,
        keep: &[(String, u32)],
    ) -> Result<()>;

    /// Slowest recorded cursor; 0 when no pair has registered yet.
    fn min_delivery_cursor(&self) -> Result<u64>;

    fn bookmark(&self) -> Result<Option<CaptureBookmark>>;

    fn save_bookmark(
        &self,
        bookmark: &CaptureBookmark,
    ) -> Result<()>;

    fn append_dead_letter(
        &self,
        record: &DeadLetterRecord,
    ) -> Result<()>;

    fn dead_letters(
        &self,
        limit: usize,
    ) -> Result<Vec<DeadLetterRecord>>;

    fn dead_letter_count(&self) -> u64;

    /// Removes events up to and including `cutoff`. Returns how many were
    /// purged.
    fn purge_up_to(
        &self,
        cutoff: u64,
    ) -> Result<u64>;

    /// Clears events, dead letters, cursors and the capture bookmark.
    /// Sequence allocation continues where it left off.
    fn reset(&self) -> Result<()>;

    fn flush(&self) -> Result<()>;

    /// Watch channel carrying the last appended sequence. Wakes delivery
    /// workers without polling.
    fn subscribe_appends(&self) -> watch::Receiver<u64>;
}
