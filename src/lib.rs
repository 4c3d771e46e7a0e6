//! Math RPC - a small ONC RPC service doing arithmetic over TCP
//!
//! The server exposes a MATH program with two procedures: `add` sums two
//! 32-bit integers and `divide` divides two floats, rejecting a zero divisor
//! with an "Invalid argument" error carried in the response. The client
//! calls them over a single long-lived connection.
//!
//! ## Main Components
//!
//! - `service`: The [`service::MathService`] trait answering calls, and the
//!   stock [`service::Calculator`] implementation.
//!
//! - `tcp`: TCP server accepting connections and dispatching RPC calls to a
//!   `MathService`.
//!
//! - `client`: [`client::MathClient`], the typed client for the MATH program.
//!
//! - `protocol`: ONC RPC message handling, record marking and XDR
//!   (External Data Representation) encoding/decoding.
//!
//! - `config` and `error`: defaults shared by the binaries and the client's
//!   error types.
//!
//! ## Standards Compliance
//!
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2
//! - RFC 4506: XDR: External Data Representation Standard
//!
//! ## Usage
//!
//! Bind a [`tcp::MathTcpListener`] with a [`service::Calculator`] and run it
//! with [`tcp::MathTcp::handle_forever`], or spawn it in the background and
//! keep the returned [`tcp::ServerHandle`]. Point a [`client::MathClient`] at
//! the listener's address to make calls.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod service;
pub mod tcp;

pub use protocol::xdr;
