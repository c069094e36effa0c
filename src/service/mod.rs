mod builder;
mod sync_service;
mod sync_type_config;

pub use builder::*;
pub use sync_service::*;
pub use sync_type_config::*;
