use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use sled::Batch;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::capture::CaptureBookmark;
use crate::constants::CHANGE_LOG_TREE;
use crate::constants::DEAD_LETTER_TREE;
use crate::constants::META_KEY_CAPTURE_BOOKMARK;
use crate::constants::META_KEY_DELIVERY_CURSOR_PREFIX;
use crate::constants::META_KEY_LAST_SEQUENCE;
use crate::constants::SYNC_META_TREE;
use crate::metadata::ChangeEvent;
use crate::metrics::QUEUE_DEPTH_METRIC;
use crate::storage::ChangeLog;
use crate::storage::DeadLetterRecord;
use crate::utils::convert::safe_kv;
use crate::utils::convert::safe_vk;
use crate::Result;
use crate::StorageError;

/// Sled-backed [`ChangeLog`].
///
/// Three trees in one database: the event log keyed by big-endian sequence
/// (so range scans walk in queue order), a metadata tree for the capture
/// bookmark, delivery cursors and the sequence high-water mark, and a
/// dead-letter tree keyed by sequence plus target.
pub struct SledChangeLog {
    db: sled::Db,
    events_tree: sled::Tree,
    meta_tree: sled::Tree,
    dead_letter_tree: sled::Tree,

    /// Retained event count; sled `Tree::len` walks the whole tree, so the
    /// count is cached here and adjusted on append/purge/reset
    length: AtomicU64,

    /// Next sequence to assign. Survives purge and reset via the persisted
    /// high-water mark, so sequences never rewind.
    next_sequence: AtomicU64,

    /// In-memory copy of the persisted capture bookmark
    bookmark_cache: ArcSwapOption<CaptureBookmark>,

    /// Publishes the last appended sequence to delivery workers
    append_tx: watch::Sender<u64>,
}

impl fmt::Debug for SledChangeLog {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SledChangeLog")
            .field("last_sequence", &self.last_sequence())
            .field("len", &self.length.load(Ordering::SeqCst))
            .finish()
    }
}

impl Drop for SledChangeLog {
    fn drop(&mut self) {
        match self.flush() {
            Ok(_) => info!("Successfully flushed change log"),
            Err(e) => error!(?e, "Failed to flush change log"),
        }
    }
}

impl SledChangeLog {
    pub fn new(db: sled::Db) -> Result<Self> {
        let events_tree = db.open_tree(CHANGE_LOG_TREE)?;
        let meta_tree = db.open_tree(SYNC_META_TREE)?;
        let dead_letter_tree = db.open_tree(DEAD_LETTER_TREE)?;

        let last_event_sequence = match events_tree.last()? {
            Some((key, _)) => safe_vk(&key)?,
            None => 0,
        };
        // The high-water mark can run ahead of the log after a purge; take
        // whichever is larger so reassignment is impossible
        let high_water_mark = match meta_tree.get(META_KEY_LAST_SEQUENCE)? {
            Some(value) => safe_vk(&value)?,
            None => 0,
        };
        let last_sequence = last_event_sequence.max(high_water_mark);

        let bookmark = match meta_tree.get(META_KEY_CAPTURE_BOOKMARK)? {
            Some(bytes) => Some(CaptureBookmark::decode(&bytes)?),
            None => None,
        };

        let length = events_tree.len() as u64;
        let (append_tx, _) = watch::channel(last_sequence);

        info!(last_sequence, retained = length, "sled change log opened");
        QUEUE_DEPTH_METRIC.set(length as i64);

        Ok(Self {
            db,
            events_tree,
            meta_tree,
            dead_letter_tree,
            length: AtomicU64::new(length),
            next_sequence: AtomicU64::new(last_sequence + 1),
            bookmark_cache: ArcSwapOption::from(bookmark.map(Arc::new)),
            append_tx,
        })
    }

    fn cursor_key(
        target: &str,
        partition: u32,
    ) -> Vec<u8> {
        format!("{META_KEY_DELIVERY_CURSOR_PREFIX}/{target}/{partition}").into_bytes()
    }

    fn parse_cursor_key(key: &[u8]) -> Option<(String, u32)> {
        let text = std::str::from_utf8(key).ok()?;
        let rest = text
            .strip_prefix(META_KEY_DELIVERY_CURSOR_PREFIX)?
            .strip_prefix('/')?;
        // Target names reject '/' at config validation, so the last segment
        // is always the partition
        let (target, partition) = rest.rsplit_once('/')?;
        Some((target.to_string(), partition.parse().ok()?))
    }

    fn dead_letter_key(
        sequence: u64,
        target: &str,
    ) -> Vec<u8> {
        let mut key = safe_kv(sequence).to_vec();
        key.push(b'/');
        key.extend_from_slice(target.as_bytes());
        key
    }
}

impl ChangeLog for SledChangeLog {
    fn append_batch(
        &self,
        mut events: Vec<ChangeEvent>,
    ) -> Result<Vec<u64>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut batch = Batch::default();
        let mut assigned = Vec::with_capacity(events.len());
        for event in events.iter_mut() {
            let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
            event.sequence = sequence;
            batch.insert(&safe_kv(sequence), event.encode()?);
            assigned.push(sequence);
        }
        let last = assigned.last().copied().unwrap_or(0);

        self.events_tree.apply_batch(batch)?;
        self.meta_tree.insert(META_KEY_LAST_SEQUENCE, &safe_kv(last))?;
        self.flush()?;

        self.length.fetch_add(assigned.len() as u64, Ordering::SeqCst);
        QUEUE_DEPTH_METRIC.set(self.length.load(Ordering::SeqCst) as i64);

        self.append_tx.send_replace(last);
        Ok(assigned)
    }

    fn entry(
        &self,
        sequence: u64,
    ) -> Result<Option<ChangeEvent>> {
        match self.events_tree.get(safe_kv(sequence))? {
            Some(bytes) => Ok(Some(ChangeEvent::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn entries_after(
        &self,
        after: u64,
        limit: usize,
    ) -> Result<Vec<ChangeEvent>> {
        let Some(start) = after.checked_add(1) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for item in self.events_tree.range(safe_kv(start)..) {
            if entries.len() >= limit {
                break;
            }
            let (_, bytes) = item?;
            entries.push(ChangeEvent::decode(&bytes)?);
        }
        Ok(entries)
    }

    fn last_sequence(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst).saturating_sub(1)
    }

    fn len(&self) -> u64 {
        self.length.load(Ordering::SeqCst)
    }

    fn register_delivery_cursor(
        &self,
        target: &str,
        partition: u32,
    ) -> Result<u64> {
        let key = Self::cursor_key(target, partition);
        match self.meta_tree.get(&key)? {
            Some(value) => safe_vk(&value),
            None => {
                self.meta_tree.insert(key.as_slice(), &safe_kv(0))?;
                Ok(0)
            }
        }
    }

    fn delivery_cursor(
        &self,
        target: &str,
        partition: u32,
    ) -> Result<u64> {
        match self.meta_tree.get(Self::cursor_key(target, partition))? {
            Some(value) => safe_vk(&value),
            None => Ok(0),
        }
    }

    fn advance_delivery_cursor(
        &self,
        target: &str,
        partition: u32,
        sequence: u64,
    ) -> Result<()> {
        let key = Self::cursor_key(target, partition);
        let current = match self.meta_tree.get(&key)? {
            Some(value) => safe_vk(&value)?,
            None => 0,
        };
        if sequence <= current {
            return Ok(());
        }
        self.meta_tree.insert(key.as_slice(), &safe_kv(sequence))?;
        self.flush()?;
        Ok(())
    }

    fn delivery_cursors(&self) -> Result<Vec<((String, u32), u64)>> {
        let mut cursors = Vec::new();
        for item in self.meta_tree.scan_prefix(META_KEY_DELIVERY_CURSOR_PREFIX) {
            let (key, value) = item?;
            if let Some(pair) = Self::parse_cursor_key(&key) {
                cursors.push((pair, safe_vk(&value)?));
            }
        }
        Ok(cursors)
    }

    fn prune_delivery_cursors(
        &self,
        keep: &[(String, u32)],
    ) -> Result<()> {
        for ((target, partition), _) in self.delivery_cursors()? {
            let keep_pair = keep
                .iter()
                .any(|(t, p)| *t == target && *p == partition);
            if !keep_pair {
                warn!(%target, partition, "dropping delivery cursor for unconfigured pair");
                self.meta_tree.remove(Self::cursor_key(&target, partition))?;
            }
        }
        Ok(())
    }

    fn min_delivery_cursor(&self) -> Result<u64> {
        Ok(self
            .delivery_cursors()?
            .into_iter()
            .map(|(_, sequence)| sequence)
            .min()
            .unwrap_or(0))
    }

    fn bookmark(&self) -> Result<Option<CaptureBookmark>> {
        Ok(self.bookmark_cache.load_full().map(|b| (*b).clone()))
    }

    fn save_bookmark(
        &self,
        bookmark: &CaptureBookmark,
    ) -> Result<()> {
        self.meta_tree
            .insert(META_KEY_CAPTURE_BOOKMARK, bookmark.encode()?)?;
        self.flush()?;
        self.bookmark_cache.store(Some(Arc::new(bookmark.clone())));
        Ok(())
    }

    fn append_dead_letter(
        &self,
        record: &DeadLetterRecord,
    ) -> Result<()> {
        let key = Self::dead_letter_key(record.sequence, &record.target);
        self.dead_letter_tree.insert(key, record.encode()?)?;
        self.flush()?;
        Ok(())
    }

    fn dead_letters(
        &self,
        limit: usize,
    ) -> Result<Vec<DeadLetterRecord>> {
        let mut records = Vec::new();
        for item in self.dead_letter_tree.iter() {
            if records.len() >= limit {
                break;
            }
            let (_, bytes) = item?;
            records.push(DeadLetterRecord::decode(&bytes)?);
        }
        Ok(records)
    }

    fn dead_letter_count(&self) -> u64 {
        self.dead_letter_tree.len() as u64
    }

    fn purge_up_to(
        &self,
        cutoff: u64,
    ) -> Result<u64> {
        let mut batch = Batch::default();
        let mut purged: u64 = 0;
        for item in self.events_tree.range(..=safe_kv(cutoff)) {
            let (key, _) = item?;
            batch.remove(key);
            purged += 1;
        }
        if purged == 0 {
            return Ok(0);
        }

        self.events_tree.apply_batch(batch)?;
        self.flush()?;

        self.length.fetch_sub(purged, Ordering::SeqCst);
        QUEUE_DEPTH_METRIC.set(self.length.load(Ordering::SeqCst) as i64);
        debug!(purged, cutoff, "purged delivered events");
        Ok(purged)
    }

    fn reset(&self) -> Result<()> {
        self.events_tree.clear()?;
        self.dead_letter_tree.clear()?;
        self.meta_tree.remove(META_KEY_CAPTURE_BOOKMARK)?;
        for item in self.meta_tree.scan_prefix(META_KEY_DELIVERY_CURSOR_PREFIX) {
            let (key, _) = item?;
            self.meta_tree.remove(key)?;
        }
        self.flush()?;

        self.length.store(0, Ordering::SeqCst);
        self.bookmark_cache.store(None);
        QUEUE_DEPTH_METRIC.set(0);

        // Wake workers so they re-read their (now absent) cursors
        self.append_tx.send_replace(self.last_sequence());
        info!(
            next_sequence = self.next_sequence.load(Ordering::SeqCst),
            "change log reset, sequence allocation continues"
        );
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        match self.db.flush() {
            Ok(bytes) => {
                debug!("flushed change db, bytes written: {}", bytes);
                Ok(())
            }
            Err(e) => {
                error!("DB flush failed: {}", e);
                Err(StorageError::DbError(e.to_string()).into())
            }
        }
    }

    fn subscribe_appends(&self) -> watch::Receiver<u64> {
        self.append_tx.subscribe()
    }
}
