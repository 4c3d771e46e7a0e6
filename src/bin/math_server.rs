use std::process;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use math_rpc::config::{DEFAULT_BIND_HOST, DEFAULT_PORT};
use math_rpc::service::Calculator;
use math_rpc::tcp::{MathTcp, MathTcpListener};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let listener =
        match MathTcpListener::bind(&format!("{DEFAULT_BIND_HOST}:{DEFAULT_PORT}"), Calculator)
            .await
        {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind port {}: {}", DEFAULT_PORT, e);
                process::exit(1);
            }
        };
    info!("Server started, port: {}", listener.get_listen_port());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // without a signal handler the server can only be killed
            error!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down server");
    };
    if let Err(e) = listener.handle_until(shutdown).await {
        error!("Server stopped: {}", e);
        process::exit(1);
    }
    info!("Server shut down");
}
