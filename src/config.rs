//! Compiled-in defaults shared by the server and client binaries, and the
//! client's tunables.

use std::time::Duration;

/// Port the demo server listens on and the demo client connects to
pub const DEFAULT_PORT: u16 = 44556;
/// Host the demo client connects to
pub const DEFAULT_HOST: &str = "localhost";
/// Address the demo server binds
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
/// How long [`crate::client::MathClient::shutdown`] waits for an outstanding call
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// How long establishing the client connection may take
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`crate::client::MathClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Upper bound on waiting for an outstanding call during shutdown.
    pub shutdown_timeout: Duration,
    /// Upper bound on opening the TCP connection.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}
