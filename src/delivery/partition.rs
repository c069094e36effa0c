use crate::utils::convert::str_to_u64;

/// Routes an entity id to its delivery partition.
///
/// Per-entity FIFO rests on this being a pure function of the id: every
/// event for one entity lands in the same partition, whose scan never
/// reorders. Changing the partition count reshuffles assignments, so only
/// do that against a drained queue.
pub fn partition_for(
    entity_id: &str,
    partitions: u32,
) -> u32 {
    debug_assert!(partitions > 0);
    (str_to_u64(entity_id) % u64::from(partitions)) as u32
}
