use std::fmt::Debug;

use crate::capture::ChangeSource;
use crate::replica::ReplicaAdapter;
use crate::storage::ChangeLog;

/// One implementation wires the three pluggable pipeline components
/// together at compile time, so every worker and handler is generic over a
/// single parameter instead of three.
pub trait TypeConfig:
    Sync + Send + Sized + Debug + Clone + Copy + Default + Eq + PartialEq + Ord + PartialOrd + 'static
{
    /// Durable change queue implementation
    type CL: ChangeLog;

    /// Where captured changes come from
    type CS: ChangeSource;

    /// How changes are applied to replica targets
    type RA: ReplicaAdapter;
}

pub mod alias {
    use super::TypeConfig;

    pub type CLOF<T> = <T as TypeConfig>::CL;

    pub type CSOF<T> = <T as TypeConfig>::CS;

    pub type RAOF<T> = <T as TypeConfig>::RA;
}
