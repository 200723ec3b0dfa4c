use anyhow::Result;
use std::net::SocketAddr;

use crate::cli::Cli;
use crate::web::server::{WebServer, WebServerConfig};

use super::setup::AppConfig;

/// Run the web server
pub async fn run_web_server(cli: &Cli, app_config: &AppConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", cli.web_bind, cli.web_port).parse()?;

    let tutor = app_config.build_tutor()?;
    app_config.print_banner("Web");
    println!("   Address: http://{}", addr);

    let config = WebServerConfig {
        bind_addr: addr,
        default_username: app_config.username.clone(),
        default_role: app_config.role,
    };

    WebServer::new(config, tutor).start().await
}
