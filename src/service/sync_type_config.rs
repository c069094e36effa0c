use crate::capture::HttpChangeSource;
use crate::replica::RestAdapter;
use crate::storage::SledChangeLog;
use crate::TypeConfig;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct SyncTypeConfig;

impl TypeConfig for SyncTypeConfig {
    type CL = SledChangeLog;

    type CS = HttpChangeSource;

    type RA = RestAdapter;
}
