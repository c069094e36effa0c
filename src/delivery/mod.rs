mod convergence;
mod delivery_worker;
mod partition;

pub use convergence::*;
pub use delivery_worker::*;
pub use partition::*;
