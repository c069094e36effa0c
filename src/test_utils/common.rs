use std::sync::Arc;

use tempfile::TempDir;

use crate::init_sled_change_db;
use crate::metadata::ChangeOp;
use crate::storage::ChangeLog;
use crate::storage::SledChangeLog;
use crate::test_utils::EventBuilder;

/// Opens a throwaway change log backed by a temp directory. Keep the
/// `TempDir` alive as long as the log.
pub(crate) fn setup_change_log() -> (Arc<SledChangeLog>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = init_sled_change_db(dir.path()).expect("open db");
    let change_log = Arc::new(SledChangeLog::new(db).expect("open change log"));
    (change_log, dir)
}

/// Appends one event per (id, op) pair, as if the capture stage had just
/// committed a poll cycle. Returns the assigned sequences.
pub(crate) fn simulate_capture(
    change_log: &Arc<SledChangeLog>,
    specs: Vec<(&str, ChangeOp)>,
) -> Vec<u64> {
    let builder = EventBuilder::new();
    let events = specs.into_iter().map(|(id, op)| builder.op(id, op)).collect();
    match change_log.append_batch(events) {
        Ok(sequences) => sequences,
        Err(e) => panic!("error: {:?}", e),
    }
}

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}
