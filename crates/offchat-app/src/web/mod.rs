// Web frontend module
pub mod protocol;
pub mod routes;
pub mod server;
pub mod session_manager;

pub use routes::{create_router, AppState};
pub use server::{WebServer, WebServerConfig};
pub use session_manager::{SessionRegistry, SessionToken, UserSession};
