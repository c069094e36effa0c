use std::sync::Arc;

use crate::alias::RAOF;
use crate::TypeConfig;

/// The set of configured replica targets, in config order.
///
/// Shared by delivery worker spawning, health probing and the status
/// endpoint so they all agree on names and membership.
pub struct TargetRegistry<T>
where T: TypeConfig
{
    adapters: Vec<(String, Arc<RAOF<T>>)>,
}

impl<T> TargetRegistry<T>
where T: TypeConfig
{
    pub fn new(adapters: Vec<(String, Arc<RAOF<T>>)>) -> Self {
        Self { adapters }
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<Arc<RAOF<T>>> {
        self.adapters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, adapter)| Arc::clone(adapter))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Arc<RAOF<T>>)> {
        self.adapters.iter()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Every (target, partition) pair the current configuration implies.
    /// Cursors outside this set belong to removed targets and are pruned.
    pub fn cursor_pairs(
        &self,
        partitions: u32,
    ) -> Vec<(String, u32)> {
        self.adapters
            .iter()
            .flat_map(|(name, _)| (0..partitions).map(move |p| (name.clone(), p)))
            .collect()
    }
}
