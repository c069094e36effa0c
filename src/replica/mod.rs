mod replica_adapter;
mod rest_adapter;

pub use replica_adapter::*;
pub use rest_adapter::*;
