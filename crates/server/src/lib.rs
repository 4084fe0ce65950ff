pub mod api;
pub mod config;
pub mod logging;
pub mod proxy;
pub mod sse;

pub use api::router;
pub use config::ServerConfig;
pub use proxy::ChatProxy;
