pub mod config;
mod identity;
mod requests_logging;
pub mod routes;
pub mod state;
pub mod websocket;

pub use config::ServerConfig;
pub use identity::{Identity, IdentityProvider, StaticTokenIdentity};
pub use requests_logging::{log_requests, RequestsLoggingLevel};
pub use routes::{make_app, run_server};
