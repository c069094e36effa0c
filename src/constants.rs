// -
// Database namespaces

/// Sled database tree namespaces
pub(crate) const CHANGE_LOG_TREE: &str = "_change_log_tree";
pub(crate) const SYNC_META_TREE: &str = "_sync_meta_tree";
pub(crate) const DEAD_LETTER_TREE: &str = "_dead_letter_tree";

/// Sled entry key namespaces
pub(crate) const META_KEY_CAPTURE_BOOKMARK: &str = "_capture_bookmark";
pub(crate) const META_KEY_DELIVERY_CURSOR_PREFIX: &str = "_delivery_cursor";
pub(crate) const META_KEY_LAST_SEQUENCE: &str = "_last_allocated_sequence";

/// Entity identifier length for the "uid" id scheme
pub(crate) const UID_LENGTH: usize = 11;
