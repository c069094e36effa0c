mod bookmark;
mod capture_handler;
mod change_source;
mod http_source;

pub use bookmark::*;
pub use capture_handler::*;
pub use change_source::*;
pub use http_source::*;
