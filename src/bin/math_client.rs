use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use math_rpc::client::MathClient;
use math_rpc::config::{DEFAULT_HOST, DEFAULT_PORT};
use math_rpc::error::MathClientError;
use math_rpc::service::format_float;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let client = MathClient::new(DEFAULT_HOST, DEFAULT_PORT);
    info!("Connecting to {}", client.addr());

    client.add(42, 42).await;

    for (dividend, divisor) in [(42.0, 2.0), (42.0, 0.0)] {
        match client.divide(dividend, divisor).await {
            Ok(result) => debug!("Quotient: {}", format_float(result)),
            Err(MathClientError::InvalidArgument(reason)) => {
                warn!("Invalid division arguments: {}", reason)
            }
            // already logged by the client
            Err(MathClientError::Transport { .. }) => {}
        }
    }

    if !client.shutdown().await {
        warn!("Connection did not shut down cleanly");
    }
}
