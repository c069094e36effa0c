//! the test_utils folder here will share utils or test components betwee unit
//! tests and integrations tests
mod common;
mod event_builder;
pub mod mock_type_config;

pub use common::*;
pub use event_builder::*;
pub use mock_type_config::*;
