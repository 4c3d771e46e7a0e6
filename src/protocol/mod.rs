//! Protocol module implements the MATH program on top of ONC RPC.
//!
//! - `xdr`: External Data Representation (RFC 4506) codec, the ONC RPC
//!   message envelope and the MATH program's message types.
//!
//! - `rpc`: Record marking over TCP, ordered call processing and dispatch
//!   by program number (RFC 5531).
//!
//! - `math`: Handlers for the NULL, ADD and DIVIDE procedures.

pub mod math;
pub mod rpc;
pub mod xdr;
