mod health_monitor;
mod target_registry;

pub use health_monitor::*;
pub use target_registry::*;
