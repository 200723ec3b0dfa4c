// Web frontend module
pub mod protocol;
pub mod session_manager;
pub mod routes;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage, SessionConfig, SessionId, SessionInfo};
pub use session_manager::{Session, SessionManager, WebSink};
pub use server::{WebServer, WebServerConfig};
