use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use dstutor_chat::Tutor;
use dstutor_types::UserRole;

use crate::web::{routes, session_manager::SessionManager};

/// Web server configuration
pub struct WebServerConfig {
    pub bind_addr: SocketAddr,
    /// Name and role for sessions created without their own
    pub default_username: String,
    pub default_role: UserRole,
}

/// Web server instance
pub struct WebServer {
    config: WebServerConfig,
    session_manager: Arc<SessionManager>,
}

impl WebServer {
    pub fn new(config: WebServerConfig, tutor: Tutor) -> Self {
        let session_manager = Arc::new(SessionManager::new(
            Arc::new(tutor),
            config.default_username.clone(),
            config.default_role,
        ));

        Self {
            config,
            session_manager,
        }
    }

    /// Router with every route and the CORS layer
    pub fn router(&self) -> Router {
        let app_state = routes::AppState {
            session_manager: self.session_manager.clone(),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        routes::create_router(app_state).layer(cors)
    }

    /// Bind and serve until the process is stopped
    pub async fn start(self) -> Result<()> {
        let app = self.router();

        println!("🌐 Web server starting on http://{}", self.config.bind_addr);
        println!("   WebSocket endpoint: ws://{}/ws/{{session_id}}", self.config.bind_addr);
        println!("   API endpoints: http://{}/api/sessions", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    pub fn session_manager(&self) -> Arc<SessionManager> {
        self.session_manager.clone()
    }
}
