use std::io;

use thiserror::Error;

use crate::protocol::xdr::rpc::AuthStat;

/// Reason the server gave for not running a call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcStatus {
    /// The server does not serve the MATH program
    #[error("PROG_UNAVAIL")]
    ProgUnavail,

    /// The server serves other versions of the MATH program
    #[error("PROG_MISMATCH (supported versions {low}..={high})")]
    ProgMismatch { low: u32, high: u32 },

    /// The server does not know the procedure
    #[error("PROC_UNAVAIL")]
    ProcUnavail,

    /// The server could not decode the arguments
    #[error("GARBAGE_ARGS")]
    GarbageArgs,

    /// The server speaks other ONC RPC versions
    #[error("RPC_MISMATCH (supported versions {low}..={high})")]
    RpcMismatch { low: u32, high: u32 },

    /// The server refused the credentials
    #[error("AUTH_ERROR ({0:?})")]
    AuthError(AuthStat),
}

/// Failure to deliver a call or to receive a usable reply.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connecting, writing or reading failed, or the reply did not decode
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The client was shut down
    #[error("connection is shut down")]
    Closed,

    /// The reply answers some other call
    #[error("reply xid {actual} does not match call xid {expected}")]
    XidMismatch { expected: u32, actual: u32 },

    /// The server sent a call where a reply was expected
    #[error("received a call instead of a reply")]
    UnexpectedCall,

    /// The server answered but did not run the procedure
    #[error("{0}")]
    Status(#[from] RpcStatus),
}

/// Errors returned by [`crate::client::MathClient`] calls.
///
/// `Transport` means the call never produced a result. `InvalidArgument`
/// means the server ran it and rejected the arguments.
#[derive(Error, Debug)]
pub enum MathClientError {
    /// The RPC itself failed
    #[error("RPC {procedure} request failed with status: {source}")]
    Transport {
        procedure: &'static str,
        #[source]
        source: TransportError,
    },

    /// The server rejected the arguments; carries the server's description
    #[error("{0}")]
    InvalidArgument(String),
}

impl MathClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, MathClientError::Transport { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, MathClientError::InvalidArgument(_))
    }
}

/// Result type alias for client calls
pub type Result<T> = std::result::Result<T, MathClientError>;
