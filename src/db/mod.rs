pub mod dialect;
pub mod engine;
pub mod session;

pub use dialect::Dialect;
pub use engine::{Engine, DEFAULT_MAX_CONNECTIONS};
pub use session::Session;
