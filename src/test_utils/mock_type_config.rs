use crate::capture::MockChangeSource;
use crate::replica::MockReplicaAdapter;
use crate::storage::SledChangeLog;
use crate::TypeConfig;

/// Pipeline wiring for unit tests: a real sled-backed queue (cheap enough
/// on a temp dir) with mocked edges on both sides.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct MockTypeConfig;

impl TypeConfig for MockTypeConfig {
    type CL = SledChangeLog;

    type CS = MockChangeSource;

    type RA = MockReplicaAdapter;
}
