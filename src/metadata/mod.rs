mod entity;
mod event;
pub use entity::*;
pub use event::*;
