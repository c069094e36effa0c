mod change_log;
mod compaction;
mod dead_letter;
mod sled_adapter;

use std::path::Path;

#[doc(hidden)]
pub use change_log::*;
#[doc(hidden)]
pub use compaction::*;
#[doc(hidden)]
pub use dead_letter::*;
#[doc(hidden)]
pub use sled_adapter::*;
use tracing::debug;
use tracing::warn;

/// Opens the embedded database backing the durable change queue.
///
/// One database holds the event log, the sync metadata tree (capture
/// bookmark and delivery cursors) and the dead-letter tree, so a single
/// flush covers them all.
pub fn init_sled_change_db(
    sled_db_root_path: impl AsRef<Path> + std::fmt::Debug
) -> std::result::Result<sled::Db, std::io::Error> {
    debug!("init_sled_change_db from path: {:?}", &sled_db_root_path);

    let path = sled_db_root_path.as_ref();
    let change_db_path = path.join("change_queue");

    sled::Config::default()
        .path(&change_db_path)
        .cache_capacity(64 * 1024 * 1024) //64MB
        .use_compression(true)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                change_db_path, e
            );
            std::io::Error::other(e)
        })
}
