//! Command queue for ordered processing of RPC calls
//!
//! Calls read from one connection are answered in the order they arrived,
//! so a client that pipelines requests sees replies in request order.

use anyhow::anyhow;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::protocol::rpc;

/// Outcome of one call: the encoded reply, `None` when nothing is to be
/// sent back, or the error that should close the connection.
pub type CommandResult = Result<Option<Vec<u8>>, anyhow::Error>;

/// Asynchronous processor turning one RPC record into a [`CommandResult`]
pub type AsyncCommandProcessor =
    fn(data: Vec<u8>, context: rpc::Context) -> BoxFuture<'static, CommandResult>;

/// A complete RPC record waiting to be processed
#[derive(Debug)]
struct RpcCommand {
    data: Vec<u8>,
    context: rpc::Context,
}

/// FIFO queue feeding a single worker task
#[derive(Debug, Clone)]
pub struct CommandQueue {
    command_sender: mpsc::UnboundedSender<RpcCommand>,
}

impl CommandQueue {
    /// Spawns the worker that runs `processor` on each submitted record and
    /// forwards results to `result_sender`.
    ///
    /// The worker stops when every `CommandQueue` clone has been dropped or
    /// when nobody is listening for results anymore.
    pub fn new(
        processor: AsyncCommandProcessor,
        result_sender: mpsc::UnboundedSender<CommandResult>,
    ) -> Self {
        let (command_sender, mut command_receiver) = mpsc::unbounded_channel::<RpcCommand>();

        tokio::spawn(async move {
            while let Some(command) = command_receiver.recv().await {
                trace!("Processing {} byte command from queue", command.data.len());
                let result = processor(command.data, command.context).await;
                if result_sender.send(result).is_err() {
                    debug!("Result receiver dropped, stopping command queue");
                    break;
                }
            }
            debug!("Command queue handler finished");
        });

        Self { command_sender }
    }

    /// Queues a record for processing after everything submitted before it.
    pub fn submit_command(
        &self,
        data: Vec<u8>,
        context: rpc::Context,
    ) -> Result<(), anyhow::Error> {
        self.command_sender
            .send(RpcCommand { data, context })
            .map_err(|e| anyhow!("Failed to send command: {}", e))
    }
}
