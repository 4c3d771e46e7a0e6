//! Per-connection state handed to every MATH procedure handler.

use std::fmt;
use std::sync::Arc;

use crate::service::MathService;

/// Execution context for RPC calls arriving on one TCP connection.
///
/// The server builds one `Context` per accepted connection; each queued call
/// gets a clone of it.
#[derive(Clone)]
pub struct Context {
    /// Peer address (IP:port), used for logging
    pub client_addr: String,

    /// Implementation answering ADD and DIVIDE
    pub service: Arc<dyn MathService + Send + Sync>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("rpc::Context")
            .field("client_addr", &self.client_addr)
            .finish()
    }
}
