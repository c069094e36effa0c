mod admin_server;

pub use admin_server::*;
