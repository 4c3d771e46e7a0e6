//! Client side of the MATH program.
//!
//! [`MathClient`] keeps one TCP connection to the server and issues one call
//! at a time over it. The connection is opened on the first call and opened
//! again on the next call after a failure, so a client can be created before
//! the server is up.
//!
//! `add` and `divide` report failures differently: [`MathClient::add`] only
//! logs them, while [`MathClient::divide`] returns them to the caller as a
//! [`MathClientError`]. [`MathClient::try_add`] is the `add` variant that
//! returns its failure as well.

use std::io::{self, Cursor};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{MathClientError, Result, RpcStatus, TransportError};
use crate::protocol::rpc;
use crate::protocol::xdr::math::{
    self, AddRequest, AddResponse, DivideRequest, DivideResponse, MathProgram,
};
use crate::protocol::xdr::rpc::{
    call_message, AcceptBody, MessageBody, RejectedReply, ReplyBody, RpcMessage,
};
use crate::protocol::xdr::{deserialize, Deserialize, Serialize};

/// Connection to a MATH server.
#[derive(Debug)]
pub struct MathClient {
    /// "host:port" of the server
    addr: String,
    config: ClientConfig,
    /// Held for the whole round trip of a call
    connection: Mutex<Option<TcpStream>>,
    next_xid: AtomicU32,
    closed: AtomicBool,
}

impl MathClient {
    /// Creates a client for `host:port` with the default [`ClientConfig`].
    ///
    /// No connection is made until the first call.
    pub fn new(host: &str, port: u16) -> MathClient {
        MathClient::with_config(host, port, ClientConfig::default())
    }

    pub fn with_config(host: &str, port: u16, config: ClientConfig) -> MathClient {
        MathClient {
            addr: format!("{host}:{port}"),
            config,
            connection: Mutex::new(None),
            next_xid: AtomicU32::new(initial_xid()),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a client and opens its connection right away.
    pub async fn connect(
        host: &str,
        port: u16,
        config: ClientConfig,
    ) -> std::result::Result<MathClient, TransportError> {
        let mut client = MathClient::with_config(host, port, config);
        let stream = client.open().await?;
        *client.connection.get_mut() = Some(stream);
        Ok(client)
    }

    /// Returns the "host:port" this client talks to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Calls the NULL procedure, which checks that the server is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.call::<_, ()>(MathProgram::MATHPROC_NULL, &())
            .await
            .map_err(|source| MathClientError::Transport { procedure: "null", source })
    }

    /// Adds two integers on the server and logs the equation.
    ///
    /// A failed call is logged and otherwise ignored; use
    /// [`MathClient::try_add`] to get the result or the failure back.
    pub async fn add(&self, summand1: i32, summand2: i32) {
        // try_add has already logged the outcome
        let _ = self.try_add(summand1, summand2).await;
    }

    /// Adds two integers on the server.
    pub async fn try_add(&self, summand1: i32, summand2: i32) -> Result<AddResponse> {
        let request = AddRequest { summand1, summand2 };
        match self.call::<_, AddResponse>(MathProgram::MATHPROC_ADD, &request).await {
            Ok(response) => {
                info!("RPC add result: {}", response.equation);
                Ok(response)
            }
            Err(source) => {
                error!("RPC add request failed with status: {}", source);
                Err(MathClientError::Transport { procedure: "add", source })
            }
        }
    }

    /// Divides `dividend` by `divisor` on the server.
    ///
    /// A zero divisor yields [`MathClientError::InvalidArgument`] carrying the
    /// server's message, e.g. `"Invalid argument: Division by zero"`.
    pub async fn divide(&self, dividend: f32, divisor: f32) -> Result<f32> {
        let request = DivideRequest { dividend, divisor };
        let response =
            match self.call::<_, DivideResponse>(MathProgram::MATHPROC_DIVIDE, &request).await {
                Ok(response) => response,
                Err(source) => {
                    error!("RPC divide request failed with status: {}", source);
                    return Err(MathClientError::Transport { procedure: "divide", source });
                }
            };

        if !response.error_message.is_ok() {
            debug!(
                "Divide rejected with code {}: {}",
                response.error_message.error_code, response.error_message.error_message
            );
            return Err(MathClientError::InvalidArgument(response.error_message.error_message));
        }
        info!("RPC divide result: {}", response.equation);
        Ok(response.result)
    }

    /// Closes the connection.
    ///
    /// Waits up to [`ClientConfig::shutdown_timeout`] for a call in flight to
    /// finish. Calls made after shutdown fail with [`TransportError::Closed`].
    /// Returns false if the wait timed out; the connection is then dropped as
    /// soon as the outstanding call completes.
    pub async fn shutdown(&self) -> bool {
        self.closed.store(true, Ordering::Release);
        match tokio::time::timeout(self.config.shutdown_timeout, self.connection.lock()).await {
            Ok(mut connection) => {
                if let Some(mut stream) = connection.take() {
                    if let Err(e) = stream.shutdown().await {
                        debug!("Error closing connection to {}: {:?}", self.addr, e);
                    }
                }
                debug!("Client for {} shut down", self.addr);
                true
            }
            Err(_) => {
                warn!(
                    "Outstanding call to {} did not finish within {:?}",
                    self.addr, self.config.shutdown_timeout
                );
                false
            }
        }
    }

    /// Runs one call over the shared connection.
    async fn call<A, R>(
        &self,
        procedure: MathProgram,
        args: &A,
    ) -> std::result::Result<R, TransportError>
    where
        A: Serialize,
        R: Deserialize + Default,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let xid = self.next_xid.fetch_add(1, Ordering::Relaxed);
        let mut request = Vec::new();
        call_message(xid, math::PROGRAM, math::VERSION, procedure as u32)
            .serialize(&mut request)?;
        args.serialize(&mut request)?;

        let mut connection = self.connection.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        // Out of the slot until the reply is decoded: a call dropped midway
        // closes the stream instead of leaving its reply for the next call.
        let mut stream = match connection.take() {
            Some(stream) => stream,
            None => self.open().await?,
        };
        let result = exchange(&mut stream, xid, &request).await;
        if result.is_ok() && !self.closed.load(Ordering::Acquire) {
            *connection = Some(stream);
        }
        result
    }

    /// Opens a new connection to the server.
    async fn open(&self) -> std::result::Result<TcpStream, TransportError> {
        debug!("Connecting to {}", self.addr);
        let stream =
            tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&self.addr))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connecting to {} timed out", self.addr),
                    )
                })??;
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }
}

/// Sends one call record and reads back its reply.
async fn exchange<R>(
    stream: &mut TcpStream,
    xid: u32,
    request: &[u8],
) -> std::result::Result<R, TransportError>
where
    R: Deserialize + Default,
{
    rpc::write_fragment(stream, request).await?;
    let reply = rpc::read_record(stream).await?;
    decode_reply(xid, &reply)
}

/// Checks the reply header against the call and decodes the results.
fn decode_reply<R>(xid: u32, reply: &[u8]) -> std::result::Result<R, TransportError>
where
    R: Deserialize + Default,
{
    let mut input = Cursor::new(reply);
    let message = deserialize::<RpcMessage>(&mut input)?;
    if message.xid != xid {
        return Err(TransportError::XidMismatch { expected: xid, actual: message.xid });
    }
    let reply = match message.body {
        MessageBody::Reply(reply) => reply,
        MessageBody::Call(_) => return Err(TransportError::UnexpectedCall),
    };
    let status = match reply {
        ReplyBody::Accepted(accepted) => match accepted.reply_data {
            AcceptBody::Success => return Ok(deserialize::<R>(&mut input)?),
            AcceptBody::ProgUnavail => RpcStatus::ProgUnavail,
            AcceptBody::ProgMismatch(info) => {
                RpcStatus::ProgMismatch { low: info.low, high: info.high }
            }
            AcceptBody::ProcUnavail => RpcStatus::ProcUnavail,
            AcceptBody::GarbageArgs => RpcStatus::GarbageArgs,
        },
        ReplyBody::Denied(RejectedReply::RpcMismatch(info)) => {
            RpcStatus::RpcMismatch { low: info.low, high: info.high }
        }
        ReplyBody::Denied(RejectedReply::AuthError(stat)) => RpcStatus::AuthError(stat),
    };
    Err(status.into())
}

/// Seeds transaction ids from the clock so two client runs are unlikely to
/// reuse the same ids.
fn initial_xid() -> u32 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::xdr::rpc::{
        garbage_args_reply_message, make_success_reply, prog_mismatch_reply_message,
        rpc_vers_mismatch,
    };

    fn encode(message: RpcMessage, results: &impl Serialize) -> Vec<u8> {
        let mut buf = Vec::new();
        message.serialize(&mut buf).expect("encode header");
        results.serialize(&mut buf).expect("encode results");
        buf
    }

    #[test]
    fn decodes_successful_reply() {
        let response = AddResponse { result: 84, equation: "42 + 42 = 84".to_string() };
        let reply = encode(make_success_reply(7), &response);
        let decoded: AddResponse = decode_reply(7, &reply).expect("decode");
        assert_eq!(decoded, response);
    }

    #[test]
    fn rejects_reply_for_other_call() {
        let reply = encode(make_success_reply(8), &());
        let err = decode_reply::<()>(7, &reply).expect_err("xid mismatch");
        assert!(matches!(err, TransportError::XidMismatch { expected: 7, actual: 8 }));
    }

    #[test]
    fn maps_error_replies_to_status() {
        let reply = encode(garbage_args_reply_message(1), &());
        let err = decode_reply::<()>(1, &reply).expect_err("garbage args");
        assert!(matches!(err, TransportError::Status(RpcStatus::GarbageArgs)));

        let reply = encode(prog_mismatch_reply_message(2, math::VERSION), &());
        let err = decode_reply::<()>(2, &reply).expect_err("prog mismatch");
        assert!(matches!(
            err,
            TransportError::Status(RpcStatus::ProgMismatch { low: 1, high: 1 })
        ));

        let reply = encode(rpc_vers_mismatch(3), &());
        let err = decode_reply::<()>(3, &reply).expect_err("rpc mismatch");
        assert!(matches!(err, TransportError::Status(RpcStatus::RpcMismatch { low: 2, high: 2 })));
    }

    #[test]
    fn rejects_call_in_place_of_reply() {
        let call = encode(call_message(4, math::PROGRAM, math::VERSION, 0), &());
        let err = decode_reply::<()>(4, &call).expect_err("call");
        assert!(matches!(err, TransportError::UnexpectedCall));
    }

    #[test]
    fn truncated_results_are_io_errors() {
        let reply = encode(make_success_reply(5), &7_i32);
        let err = decode_reply::<AddResponse>(5, &reply).expect_err("truncated");
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[tokio::test]
    async fn calls_after_shutdown_fail_fast() {
        let client = MathClient::new("127.0.0.1", 9);
        assert!(client.shutdown().await);
        let err = client.divide(1.0, 2.0).await.expect_err("closed");
        assert!(matches!(
            err,
            MathClientError::Transport { procedure: "divide", source: TransportError::Closed }
        ));
    }
}
