mod service;
mod sink;
mod ws_handler;

pub use service::*;
pub use sink::*;
pub use ws_handler::*;
