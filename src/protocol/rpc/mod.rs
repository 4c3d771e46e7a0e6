//! ONC RPC version 2 (RFC 5531) transport for the MATH program.
//!
//! This module provides:
//!
//! 1. Record marking for carrying RPC messages over TCP
//! 2. Ordered processing of the calls received on one connection
//! 3. Dispatch by program, version and procedure number
//! 4. Protocol-level error replies (version mismatch, unknown program or
//!    procedure, undecodable arguments)

mod command_queue;
mod context;
mod wire;

pub use context::Context;
pub use wire::{handle_rpc, read_record, write_fragment, SocketMessageHandler, SocketMessageType};

/// Upper bound on a reassembled RPC record. MATH messages are a few dozen
/// bytes, so anything near this size is a broken or hostile peer.
pub const MAX_RPC_RECORD_LENGTH: usize = 1024 * 1024;
