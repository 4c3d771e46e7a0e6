//! RPC message framing and dispatch (RFC 5531 section 11, Record Marking).
//!
//! TCP is a byte stream, so every RPC message travels as a record made of
//! one or more fragments. Each fragment starts with a 4-byte big-endian
//! header: the high bit marks the last fragment of the record and the low
//! 31 bits hold the fragment length.
//!
//! The framing helpers are shared by the server and the client; the rest of
//! this module is the server side that turns records into replies.

use std::io::{self, Cursor, Read, Write};

use anyhow::anyhow;
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::protocol::rpc::command_queue::{CommandQueue, CommandResult};
use crate::protocol::xdr::{self, deserialize, math, Serialize};
use crate::protocol::{math as math_proto, rpc};

/// Last-fragment flag in a record marking header
const LAST_FRAGMENT: u32 = 1 << 31;
/// Largest fragment a header can describe
const MAX_FRAGMENT_SIZE: usize = (1 << 31) - 1;
/// Initial size of RPC response buffer
const DEFAULT_RESPONSE_BUFFER_CAPACITY: usize = 256;

/// Processes a single RPC call record.
///
/// Decodes the call header, checks the RPC version and routes the call to
/// the MATH program. Every protocol-level problem the caller can be told
/// about is answered with the matching error reply; only a record that is
/// not a call at all is reported as an error.
pub async fn handle_rpc(
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), anyhow::Error> {
    let recv = deserialize::<xdr::rpc::RpcMessage>(input)?;
    let xid = recv.xid;
    let xdr::rpc::MessageBody::Call(call) = recv.body else {
        error!("Unexpectedly received a Reply instead of a Call");
        return Err(anyhow!("Bad RPC Call format"));
    };

    if call.rpcvers != xdr::rpc::RPC_VERSION {
        warn!("Invalid RPC version {} != {}", call.rpcvers, xdr::rpc::RPC_VERSION);
        xdr::rpc::rpc_vers_mismatch(xid).serialize(output)?;
        return Ok(());
    }

    match call.prog {
        math::PROGRAM => math_proto::handle_math(xid, call, input, output, context).await,
        unknown_number => {
            warn!("Unknown RPC Program number {} != {}", unknown_number, math::PROGRAM);
            xdr::rpc::prog_unavail_reply_message(xid).serialize(output)?;
            Ok(())
        }
    }
}

/// Reads one fragment from `socket` and appends its payload to `append_to`.
///
/// Returns true if this was the last fragment of the record. Fails with
/// `InvalidData` once the record would grow past
/// [`rpc::MAX_RPC_RECORD_LENGTH`].
async fn read_fragment<R: AsyncRead + Unpin>(
    socket: &mut R,
    append_to: &mut Vec<u8>,
) -> io::Result<bool> {
    let fragment_header = socket.read_u32().await?;
    let is_last = (fragment_header & LAST_FRAGMENT) != 0;
    let length = (fragment_header & !LAST_FRAGMENT) as usize;
    trace!("Reading fragment length:{}, last:{}", length, is_last);
    if append_to.len().saturating_add(length) > rpc::MAX_RPC_RECORD_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("RPC record length {} exceeds max {}", length, rpc::MAX_RPC_RECORD_LENGTH),
        ));
    }
    let start_offset = append_to.len();
    append_to.resize(start_offset + length, 0);
    socket.read_exact(&mut append_to[start_offset..]).await?;
    Ok(is_last)
}

/// Reads fragments until a whole record has been reassembled.
pub async fn read_record<R: AsyncRead + Unpin>(socket: &mut R) -> io::Result<Vec<u8>> {
    let mut record = Vec::new();
    while !read_fragment(socket, &mut record).await? {}
    Ok(record)
}

/// Writes `buf` as one record, split into as many fragments as needed.
pub async fn write_fragment<W: AsyncWrite + Unpin>(socket: &mut W, buf: &[u8]) -> io::Result<()> {
    let mut chunks = buf.chunks(MAX_FRAGMENT_SIZE).peekable();
    if chunks.peek().is_none() {
        // an empty record is still one (empty) last fragment
        return socket.write_u32(LAST_FRAGMENT).await;
    }
    while let Some(chunk) = chunks.next() {
        let is_last = chunks.peek().is_none();
        let header = if is_last { chunk.len() as u32 | LAST_FRAGMENT } else { chunk.len() as u32 };
        trace!("Writing fragment length:{}, last:{}", chunk.len(), is_last);
        socket.write_u32(header).await?;
        socket.write_all(chunk).await?;
    }
    socket.flush().await
}

pub type SocketMessageType = Result<Vec<u8>, anyhow::Error>;

/// Turns the raw bytes of one TCP connection into RPC replies.
///
/// Bytes read from the socket are pushed into the duplex stream returned by
/// [`SocketMessageHandler::new`]; every complete record is queued for
/// processing and the encoded replies come out of the returned receiver in
/// request order.
#[derive(Debug)]
pub struct SocketMessageHandler {
    /// Record being reassembled
    cur_fragment: Vec<u8>,
    /// Read side of the socket bytes
    socket_receive_channel: DuplexStream,
    /// Context cloned into every queued call
    context: rpc::Context,
    /// Queue preserving call order
    command_queue: CommandQueue,
}

impl SocketMessageHandler {
    /// Creates a handler for one connection.
    ///
    /// Returns the handler, the stream to write socket bytes into, and the
    /// receiver yielding encoded replies (or the error that ended processing).
    pub fn new(
        context: &rpc::Context,
    ) -> (Self, DuplexStream, mpsc::UnboundedReceiver<SocketMessageType>) {
        let (socksend, sockrecv) = tokio::io::duplex(256_000);
        let (msgsend, msgrecv) = mpsc::unbounded_channel();
        let (result_sender, mut result_receiver) = mpsc::unbounded_channel::<CommandResult>();

        let command_queue = CommandQueue::new(process_rpc_command, result_sender);

        tokio::spawn(async move {
            while let Some(result) = result_receiver.recv().await {
                let forwarded = match result {
                    Ok(Some(reply)) => msgsend.send(Ok(reply)),
                    Ok(None) => continue,
                    Err(e) => {
                        error!("RPC error: {:?}", e);
                        msgsend.send(Err(e))
                    }
                };
                if forwarded.is_err() {
                    break;
                }
            }
            debug!("Command result handler finished");
        });

        (
            Self {
                cur_fragment: Vec::new(),
                socket_receive_channel: sockrecv,
                context: context.clone(),
                command_queue,
            },
            socksend,
            msgrecv,
        )
    }

    /// Reads one fragment and, if it completes a record, queues the record.
    ///
    /// Should be called in a loop for as long as the connection is open.
    pub async fn read(&mut self) -> Result<(), anyhow::Error> {
        let is_last =
            read_fragment(&mut self.socket_receive_channel, &mut self.cur_fragment).await?;
        if is_last {
            let record = std::mem::take(&mut self.cur_fragment);
            self.command_queue.submit_command(record, self.context.clone())?;
        }
        Ok(())
    }
}

/// Runs [`handle_rpc`] on one record and returns the encoded reply.
fn process_rpc_command(data: Vec<u8>, context: rpc::Context) -> BoxFuture<'static, CommandResult> {
    Box::pin(async move {
        let mut input = Cursor::new(data);
        let mut output = Vec::with_capacity(DEFAULT_RESPONSE_BUFFER_CAPACITY);
        handle_rpc(&mut input, &mut output, &context).await?;
        Ok((!output.is_empty()).then_some(output))
    })
}
