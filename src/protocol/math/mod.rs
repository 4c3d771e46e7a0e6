//! MATH program version 1 procedure handlers.
//!
//! | proc | name   | arguments       | results          |
//! |------|--------|-----------------|------------------|
//! | 0    | NULL   | void            | void             |
//! | 1    | ADD    | `AddRequest`    | `AddResponse`    |
//! | 2    | DIVIDE | `DivideRequest` | `DivideResponse` |
//!
//! [`handle_math`] validates the program version and routes each call to
//! the handler for its procedure number.

use std::io::{Read, Write};

use num_traits::cast::FromPrimitive;
use tracing::warn;

use crate::protocol::rpc;
use crate::protocol::xdr::{self, math, Serialize};

mod add;
mod divide;
mod null;

use add::mathproc_add;
use divide::mathproc_divide;
use null::mathproc_null;

/// Main handler for the MATH program
///
/// # Arguments
///
/// * `xid` - Transaction ID from the RPC call
/// * `call` - The RPC call header (program, version, procedure)
/// * `input` - Input stream positioned at the procedure arguments
/// * `output` - Output stream for the reply
/// * `context` - Connection context holding the service implementation
pub async fn handle_math(
    xid: u32,
    call: xdr::rpc::CallBody,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), anyhow::Error> {
    if call.vers != math::VERSION {
        warn!("Unsupported MATH program version {} (supported {})", call.vers, math::VERSION);
        xdr::rpc::prog_mismatch_reply_message(xid, math::VERSION).serialize(output)?;
        return Ok(());
    }
    let proc = math::MathProgram::from_u32(call.proc).unwrap_or(math::MathProgram::INVALID);

    match proc {
        math::MathProgram::MATHPROC_NULL => mathproc_null(xid, output)?,
        math::MathProgram::MATHPROC_ADD => mathproc_add(xid, input, output, context).await?,
        math::MathProgram::MATHPROC_DIVIDE => mathproc_divide(xid, input, output, context).await?,
        math::MathProgram::INVALID => {
            warn!("Unimplemented MATH procedure {}", call.proc);
            xdr::rpc::proc_unavail_reply_message(xid).serialize(output)?;
        }
    }
    Ok(())
}
